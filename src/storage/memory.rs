//! In-memory storage backend for testing.
//!
//! Provides [`InMemoryStorage`], a thread-safe in-memory implementation of
//! the storage traits. Ideal for unit and integration tests where file I/O
//! is undesirable.

use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use crate::error::{Result, WealthError};
use crate::models::AppState;

/// Thread-safe in-memory storage for testing.
///
/// This type implements both [`super::Storage`] (async) and
/// [`super::BlockingStorage`] (blocking) traits, providing a zero-setup
/// storage backend for tests. It also counts writes so tests can assert
/// that a rejected mutation never reached storage.
///
/// # Example
///
/// ```rust
/// use wealth_snapshot::storage::InMemoryStorage;
///
/// let storage = InMemoryStorage::new();
/// assert_eq!(storage.save_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Stored document.
    state: Option<AppState>,
    /// Number of successful saves.
    saves: usize,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage that already holds `state`.
    #[inline]
    #[must_use]
    pub fn with_state(state: AppState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: Some(state),
                saves: 0,
            }),
        }
    }

    /// Number of saves performed so far; 0 if the lock is poisoned.
    #[inline]
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.with_lock(|inner| inner.saves).unwrap_or_default()
    }

    /// Copy of the stored document, if any.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Option<AppState> {
        self.with_lock(|inner| inner.state.clone()).ok().flatten()
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut Inner) -> R>(&self, op: F) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(op(&mut inner))
    }

    /// Stores a copy of `state`.
    fn store(&self, state: &AppState) -> Result<()> {
        self.with_lock(|inner| {
            inner.state = Some(state.clone());
            inner.saves += 1;
        })
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> WealthError {
    WealthError::Storage(err.to_string().into())
}

// ── BlockingStorage implementation ──────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStorage for InMemoryStorage {
    #[inline]
    fn load(&self) -> Result<Option<AppState>> {
        self.with_lock(|inner| inner.state.clone())
    }

    #[inline]
    fn save(&self, state: &AppState) -> Result<()> {
        self.store(state)
    }

    #[inline]
    fn clear(&self) -> Result<()> {
        self.with_lock(|inner| inner.state = None)
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for InMemoryStorage {
    #[inline]
    fn load(&self) -> impl Future<Output = Result<Option<AppState>>> + Send {
        future::ready(self.with_lock(|inner| inner.state.clone()))
    }

    #[inline]
    fn save(&self, state: &AppState) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.store(state))
    }

    #[inline]
    fn clear(&self) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|inner| inner.state = None))
    }
}
