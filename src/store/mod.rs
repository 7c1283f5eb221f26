//! Lock-guarded JSON persistence.
//!
//! Every file managed here (the catalog, the scrape checkpoint, the enrichment
//! output and checkpoint) goes through [`JsonStore`]: a scoped advisory lock on
//! a `.lock` sidecar, a whole-file read, a mutation, and a whole-file write that
//! first copies the previous generation to `.bak` and then atomically renames a
//! temporary file into place.

mod catalog;
mod checkpoint;
mod lock;

pub use catalog::{AudioMetadata, Catalog, CatalogEntry, CatalogStore, Enrichment};
pub use checkpoint::{Checkpoint, CheckpointStore, EnrichmentCheckpoint};
pub use lock::FileLock;

use crate::error::{Result, ShelfError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Txn<R> {
    /// Write the mutated value back.
    Commit(R),
    /// Leave the file untouched.
    Abort(R),
}

/// A JSON file holding one value of `T`, guarded by an advisory lock.
#[derive(Debug)]
pub struct JsonStore<T> {
    path: PathBuf,
    lock_path: PathBuf,
    lock_timeout: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        let path = path.into();
        let lock_path = sibling(&path, ".lock");
        Self {
            path,
            lock_path,
            lock_timeout,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Path of the single-generation backup.
    pub fn backup_path(&self) -> PathBuf {
        sibling(&self.path, ".bak")
    }

    /// Read the current value.
    ///
    /// Never fails: a missing or unparsable file, an I/O error, or a lock
    /// timeout all yield `T::default()` with a warning.
    pub fn load(&self) -> T {
        match FileLock::acquire(&self.lock_path, self.lock_timeout) {
            Ok(_guard) => match self.read() {
                Ok(value) => value,
                Err(e) => {
                    warn!("{}; using empty data", e);
                    T::default()
                }
            },
            Err(e) => {
                warn!("{}; using empty data", e);
                T::default()
            }
        }
    }

    /// Replace the stored value.
    ///
    /// Returns `Ok(false)` without writing when the lock cannot be taken in time.
    pub fn save(&self, value: &T) -> Result<bool> {
        let _guard = match FileLock::acquire(&self.lock_path, self.lock_timeout) {
            Ok(guard) => guard,
            Err(ShelfError::LockTimeout(path)) => {
                warn!(
                    "Could not acquire {} for writing; changes to {} not saved",
                    path.display(),
                    self.path.display()
                );
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.write(value)?;
        Ok(true)
    }

    /// Read, mutate and write back under a single lock acquisition.
    ///
    /// Unlike [`load`](Self::load), an unparsable existing file is an error here
    /// so that a transaction can never replace it with a near-empty value.
    /// A lock timeout surfaces as [`ShelfError::LockTimeout`].
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> Txn<R>) -> Result<R> {
        let _guard = FileLock::acquire(&self.lock_path, self.lock_timeout)?;
        let mut value = self.read()?;
        match f(&mut value) {
            Txn::Commit(r) => {
                self.write(&value)?;
                Ok(r)
            }
            Txn::Abort(r) => Ok(r),
        }
    }

    /// Copy the current file to `<file>.backup_<label>_<timestamp>`.
    ///
    /// Returns `None` when there is nothing to snapshot.
    pub fn snapshot(&self, label: &str) -> Result<Option<PathBuf>> {
        let _guard = FileLock::acquire(&self.lock_path, self.lock_timeout)?;
        if !self.path.exists() {
            return Ok(None);
        }

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let suffix = if label.is_empty() {
            format!(".backup_{}", stamp)
        } else {
            format!(".backup_{}_{}", label, stamp)
        };
        let target = sibling(&self.path, &suffix);
        std::fs::copy(&self.path, &target)?;
        debug!("Snapshot written to {}", target.display());
        Ok(Some(target))
    }

    fn read(&self) -> Result<T> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        serde_json::from_slice(&bytes).map_err(|source| ShelfError::CorruptStore {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, value: &T) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        if self.path.exists() {
            if let Err(e) = std::fs::copy(&self.path, self.backup_path()) {
                warn!("Failed to create backup of {}: {}", self.path.display(), e);
            }
        }

        let tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| ShelfError::Io(e.error))?;

        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

/// Run a store operation on the blocking pool.
///
/// Lock acquisition polls and sleeps, so store calls must stay off the async
/// worker threads.
pub async fn run_blocking<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ShelfError::Io(std::io::Error::other(e)))?
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
