//! JSON-file-based storage backend.
//!
//! Stores the document as a single JSON file under a configurable
//! directory (default: `$XDG_DATA_HOME/wealth-snapshot/`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::STORAGE_KEY;
use crate::error::{Result, WealthError};
use crate::models::AppState;

#[cfg(feature = "async")]
use core::future::Future;

/// Application name used for the XDG data directory.
const APP_NAME: &str = "wealth-snapshot";

/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// File-backed storage that persists the document as JSON.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]).
///
/// Reads acquire a shared lock (allowing concurrent readers), while writes
/// acquire an exclusive lock. Writes go to a temporary file that is then
/// renamed over the document, so a crash never leaves a half-written file.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock             (cross-process lock sentinel)
///   wealth_snapshot_v1.json
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist. Also
    /// opens (or creates) the `storage.lock` sentinel file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/wealth-snapshot/` (typically
    /// `~/.local/share/wealth-snapshot/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                WealthError::Storage("could not determine platform data directory".into())
            })
    }

    /// Directory the document lives in.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the document file.
    #[inline]
    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.dir.join(format!("{STORAGE_KEY}.json"))
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // The operation's own error wins over an unlock failure.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads and parses the document. Missing file means `None`.
    fn read_document(&self) -> Result<Option<AppState>> {
        let path = self.document_path();
        self.with_shared_lock(|| match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(WealthError::from),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_io_error(err)),
        })
    }

    /// Atomically writes the document (write-to-tmp then rename).
    fn write_document(&self, state: &AppState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).map_err(WealthError::from)?;
        let path = self.document_path();
        let tmp_path = self.dir.join(format!("{STORAGE_KEY}.json.tmp"));
        self.with_exclusive_lock(|| {
            fs::write(&tmp_path, &json).map_err(storage_io_error)?;
            fs::rename(&tmp_path, &path).map_err(storage_io_error)
        })
    }

    /// Deletes the document if present.
    fn remove_document(&self) -> Result<()> {
        let path = self.document_path();
        self.with_exclusive_lock(|| match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_io_error(err)),
        })
    }
}

/// Wraps an I/O error into a [`WealthError::Storage`].
fn storage_io_error(err: std::io::Error) -> WealthError {
    WealthError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`WealthError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> WealthError {
    WealthError::Storage(err.to_string().into())
}

// ── BlockingStorage implementation ──────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStorage for FileStorage {
    #[inline]
    fn load(&self) -> Result<Option<AppState>> {
        self.read_document()
    }

    #[inline]
    fn save(&self, state: &AppState) -> Result<()> {
        self.write_document(state)
    }

    #[inline]
    fn clear(&self) -> Result<()> {
        self.remove_document()
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for FileStorage {
    #[inline]
    fn load(&self) -> impl Future<Output = Result<Option<AppState>>> + Send {
        core::future::ready(self.read_document())
    }

    #[inline]
    fn save(&self, state: &AppState) -> impl Future<Output = Result<()>> + Send {
        core::future::ready(self.write_document(state))
    }

    #[inline]
    fn clear(&self) -> impl Future<Output = Result<()>> + Send {
        core::future::ready(self.remove_document())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Currency, HistoricalDataPoint, MonthKey};

    /// Helper to create a [`FileStorage`] in a temporary directory.
    fn temp_storage() -> (FileStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        (storage, dir)
    }

    fn sample() -> AppState {
        AppState {
            accounts: vec![Account::stock("IBKR", "0700.HK", Currency::Hkd, 100.0, 380.0)],
            history: vec![HistoricalDataPoint::new(MonthKey::new("2025-01"), 38_000.0)],
            ..AppState::default()
        }
    }

    #[test]
    fn document_named_after_storage_key() {
        let (storage, dir) = temp_storage();
        assert_eq!(storage.document_path(), dir.path().join("wealth_snapshot_v1.json"));
        assert_eq!(storage.dir(), dir.path());
    }

    #[test]
    fn creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let _storage = FileStorage::new(nested.clone()).unwrap();
        assert!(nested.join(LOCK_FILE).exists());
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::storage::BlockingStorage;

        #[test]
        fn missing_file_loads_none() {
            let (storage, _dir) = temp_storage();
            assert!(storage.load().unwrap().is_none());
        }

        #[test]
        fn save_then_load_round_trips() {
            let (storage, _dir) = temp_storage();
            let state = sample();
            storage.save(&state).unwrap();
            assert_eq!(storage.load().unwrap(), Some(state));
            assert!(!storage.dir().join("wealth_snapshot_v1.json.tmp").exists());
        }

        #[test]
        fn save_overwrites_whole_document() {
            let (storage, _dir) = temp_storage();
            storage.save(&sample()).unwrap();
            storage.save(&AppState::default()).unwrap();
            let loaded = storage.load().unwrap().unwrap();
            assert!(loaded.accounts.is_empty());
        }

        #[test]
        fn clear_removes_file_and_is_idempotent() {
            let (storage, _dir) = temp_storage();
            storage.save(&sample()).unwrap();
            storage.clear().unwrap();
            assert!(!storage.document_path().exists());
            storage.clear().unwrap();
        }

        #[test]
        fn corrupt_file_is_an_error() {
            let (storage, _dir) = temp_storage();
            fs::write(storage.document_path(), "{not json").unwrap();
            let err = storage.load().unwrap_err();
            assert!(matches!(err, WealthError::Serialization(_)));
        }

        #[test]
        fn legacy_document_loads() {
            let (storage, _dir) = temp_storage();
            let legacy = r#"{"accounts":[{"id":"1","name":"HSBC","type":"Cash","currency":"HKD","balance":150000}],"fixedDeposits":[],"history":[{"date":"2024-01","totalValueHKD":150000}],"lastUpdated":"2024-01-15T10:00:00.000Z"}"#;
            fs::write(storage.document_path(), legacy).unwrap();
            let state = storage.load().unwrap().unwrap();
            assert_eq!(state.accounts.len(), 1);
            assert_eq!(state.history.len(), 1);
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::storage::Storage;

        #[tokio::test]
        async fn save_then_load_round_trips() {
            let (storage, _dir) = temp_storage();
            let state = sample();
            storage.save(&state).await.unwrap();
            assert_eq!(storage.load().await.unwrap(), Some(state));
        }

        #[tokio::test]
        async fn clear_on_empty_dir_succeeds() {
            let (storage, _dir) = temp_storage();
            storage.clear().await.unwrap();
            assert!(storage.load().await.unwrap().is_none());
        }
    }
}
