//! The persisted document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Account, AccountId, DepositId, FixedDeposit, HistoricalDataPoint};

/// Net-worth goal used when a document does not carry one (HKD).
pub const DEFAULT_WEALTH_GOAL: f64 = 2_000_000.0;

/// The whole application document: holdings, history and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Cash and stock accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Fixed deposits.
    #[serde(default)]
    pub fixed_deposits: Vec<FixedDeposit>,
    /// Monthly net-worth snapshots in insertion order.
    #[serde(default)]
    pub history: Vec<HistoricalDataPoint>,
    /// Net-worth goal in HKD.
    #[serde(default = "default_wealth_goal")]
    pub wealth_goal: f64,
    /// Time of the last accepted holdings mutation.
    #[serde(default = "default_last_updated")]
    pub last_updated: DateTime<Utc>,
}

/// Serde default for [`AppState::wealth_goal`].
const fn default_wealth_goal() -> f64 {
    DEFAULT_WEALTH_GOAL
}

/// Serde default for [`AppState::last_updated`].
const fn default_last_updated() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Default for AppState {
    #[inline]
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            fixed_deposits: Vec::new(),
            history: Vec::new(),
            wealth_goal: DEFAULT_WEALTH_GOAL,
            last_updated: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl AppState {
    /// Creates an empty document stamped with `now`.
    #[inline]
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            ..Self::default()
        }
    }

    /// Looks up an account by id.
    #[inline]
    #[must_use]
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.iter().find(|acc| acc.id == *id)
    }

    /// Looks up a fixed deposit by id.
    #[inline]
    #[must_use]
    pub fn deposit(&self, id: &DepositId) -> Option<&FixedDeposit> {
        self.fixed_deposits.iter().find(|fd| fd.id == *id)
    }

    /// Returns the most recent history point, if any.
    #[inline]
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<&HistoricalDataPoint> {
        self.history.last()
    }
}
