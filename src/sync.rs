//! Remote sync bookkeeping.
//!
//! Pushes are fire-and-forget: the local document is already persisted
//! when a push starts, and the push outcome only moves the status
//! indicator. Every push gets a version number so that a slow reply to an
//! old push cannot overwrite the status of a newer one.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::aggregator::{NetWorthPolicy, compute_net_worth};
use crate::models::{AppState, SyncAsset, SyncPayload};

/// Connection indicator shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncStatus {
    /// Last push was accepted.
    #[default]
    Synced,
    /// A push is in flight.
    Syncing,
    /// Last push failed or no remote is configured.
    Offline,
}

impl SyncStatus {
    /// Short label.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Syncing => "syncing",
            Self::Offline => "offline",
        }
    }
}

impl core::fmt::Display for SyncStatus {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Monotonic push counter with last-writer-wins completion.
#[derive(Debug, Default)]
pub struct SyncVersions {
    /// Version handed to the most recent push.
    issued: AtomicU64,
    /// Highest version whose completion has been applied.
    applied: AtomicU64,
}

impl SyncVersions {
    /// Creates a counter with nothing issued.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    /// Reserves the version for a new push.
    #[inline]
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records the completion of push `version`.
    ///
    /// Returns `true` when the completion is the newest seen so far and
    /// its outcome should be applied; `false` when a newer push has
    /// already completed.
    #[inline]
    pub fn complete(&self, version: u64) -> bool {
        let previous = self.applied.fetch_max(version, Ordering::AcqRel);
        previous < version
    }

    /// Version of the most recent push.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }
}

/// Flattens `state` into the remote store's push body.
///
/// Accounts come first, then every deposit. The `total` uses `policy`.
#[inline]
#[must_use]
pub fn build_payload(user_id: &str, state: &AppState, policy: NetWorthPolicy) -> SyncPayload {
    let assets = state
        .accounts
        .iter()
        .map(SyncAsset::from_account)
        .chain(state.fixed_deposits.iter().map(SyncAsset::from_deposit))
        .collect();
    SyncPayload {
        user_id: user_id.to_owned(),
        total: compute_net_worth(&state.accounts, &state.fixed_deposits, policy),
        assets,
    }
}
