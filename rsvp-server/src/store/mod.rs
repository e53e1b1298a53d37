//! Durable guest store
//!
//! The store is one workbook file, always read fully and replaced fully.
//! Replacement is crash-safe: the new contents go to `<store>.tmp`, are
//! fsynced, then renamed over the destination, so a reader sees either the old
//! file or the new one.
//!
//! All mutation goes through [`GuestStore::lock`], which hands out a
//! [`StoreWriter`] holding the store's write lock. Read-modify-write-append is
//! therefore atomic with respect to other submissions in this process.

mod retry;
mod row;
mod workbook;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

pub use retry::{is_busy, retry_on_busy, RetryFailure, RetryPolicy};
pub use row::{PersistedGuestRow, COLUMNS, MAX_CELL_CHARS};
pub use workbook::{decode_rows, encode_rows, SHEET_NAME};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O operation error (wraps std::io::Error)
    #[error("Store IO error: {0}")]
    Io(#[from] io::Error),

    /// Existing workbook could not be parsed
    #[error("Store read error: {0}")]
    Read(#[from] calamine::XlsxError),

    /// Workbook could not be produced
    #[error("Store write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Destination stayed locked through every retry
    #[error("Store replace failed after {attempts} attempts: {source}")]
    Replace {
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// Sheet row ceiling reached
    #[error("Store full: {0} rows")]
    Full(usize),

    /// Blocking task panicked or was cancelled
    #[error("Store task failed: {0}")]
    Task(String),
}

/// Guest store backed by one workbook file
#[derive(Debug)]
pub struct GuestStore {
    path: PathBuf,
    retry: RetryPolicy,
    write_lock: Mutex<()>,
}

impl GuestStore {
    pub fn new(path: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            path: path.into(),
            retry,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row currently in the store (empty if no file yet)
    pub async fn load(&self) -> Result<Vec<PersistedGuestRow>, StoreError> {
        let path = self.path.clone();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Store {} not found, starting empty", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        tokio::task::spawn_blocking(move || decode_rows(&bytes))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Take the single-writer lock
    ///
    /// Waits for any other writer to finish. The returned writer releases the
    /// lock when dropped.
    pub async fn lock(&self) -> StoreWriter<'_> {
        StoreWriter {
            store: self,
            _guard: self.write_lock.lock().await,
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn replace_all(&self, rows: Vec<PersistedGuestRow>) -> Result<(), StoreError> {
        let bytes = tokio::task::spawn_blocking(move || encode_rows(&rows))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        let tmp = self.tmp_path();
        if let Err(e) = write_synced(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        let result = retry_on_busy("store replace", self.retry, || tokio::fs::rename(&tmp, &self.path)).await;

        if let Err(failure) = result {
            // Leave no stale temp file behind; the destination is untouched
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Replace {
                attempts: failure.attempts,
                source: failure.source,
            });
        }

        Ok(())
    }
}

/// Write `bytes` to `path` and fsync before returning
async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    // tokio buffers writes; flush surfaces a failed write before the fsync
    file.flush().await?;
    file.sync_all().await
}

/// Exclusive write access to a [`GuestStore`]
pub struct StoreWriter<'a> {
    store: &'a GuestStore,
    _guard: MutexGuard<'a, ()>,
}

impl StoreWriter<'_> {
    /// Append rows after every existing row and persist the whole store
    ///
    /// No dedup and no update of existing rows. Returns the total row count
    /// after the append.
    pub async fn append(&mut self, rows: Vec<PersistedGuestRow>) -> Result<usize, StoreError> {
        let mut all = self.store.load().await?;
        let before = all.len();
        let added = rows.len();
        all.extend(rows);
        let total = all.len();

        self.store.replace_all(all).await?;

        info!(
            store = %self.store.path.display(),
            before,
            added,
            total,
            "Guest rows appended"
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn row(email: &str, index: u32) -> PersistedGuestRow {
        PersistedGuestRow {
            guest_id: format!("{}_{}", email, index),
            main_email: email.to_string(),
            guest_index: index,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_missing_store_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = GuestStore::new(temp_dir.path().join("guests.xlsx"), RetryPolicy::default());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_prior_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = GuestStore::new(temp_dir.path().join("guests.xlsx"), RetryPolicy::default());

        let total = store.lock().await.append(vec![row("a@b.com", 1), row("a@b.com", 2)]).await.unwrap();
        assert_eq!(total, 2);

        let total = store.lock().await.append(vec![row("c@d.com", 1)]).await.unwrap();
        assert_eq!(total, 3);

        let rows = store.load().await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.guest_id.as_str()).collect();
        assert_eq!(ids, vec!["a@b.com_1", "a@b.com_2", "c@d.com_1"]);
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(GuestStore::new(
            temp_dir.path().join("guests.xlsx"),
            RetryPolicy::default(),
        ));

        let mut handles = Vec::new();
        for writer in 0..8u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let email = format!("w{}@x.com", writer);
                let rows = (1..=writer + 1).map(|i| row(&email, i)).collect();
                store.lock().await.append(rows).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 1 + 2 + ... + 8
        assert_eq!(store.load().await.unwrap().len(), 36);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("guests.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();

        let store = GuestStore::new(&path, RetryPolicy::default());
        assert!(store.load().await.is_err());

        // A corrupt store is never overwritten by an append
        assert!(store.lock().await.append(vec![row("a@b.com", 1)]).await.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"not a workbook");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_temp_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = GuestStore::new(temp_dir.path().join("guests.xlsx"), RetryPolicy::default());

        // Every write through the temp path hits a full device
        let tmp = store.tmp_path();
        std::os::unix::fs::symlink("/dev/full", &tmp).unwrap();

        assert!(store.lock().await.append(vec![row("a@b.com", 1)]).await.is_err());
        assert!(std::fs::symlink_metadata(&tmp).is_err());
        assert!(!store.path().exists());
    }
}
