use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::{debug, info};

use super::error::{StorageError, StorageResult};

/// File name used when the configured log path is a directory.
pub const DEFAULT_LOG_FILENAME: &str = "embeddings.redb";

const EMBEDDINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("embeddings");

/// Ordered key-value log with individually atomic operations.
pub trait DurableLog {
    /// Inserts or replaces the value stored under `key`.
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Deletes `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Visits every record in forward key order, stopping at the first visitor error.
    fn scan(&self, visitor: &mut dyn FnMut(&str, &[u8]) -> StorageResult<()>)
    -> StorageResult<()>;
}

impl<T: DurableLog + ?Sized> DurableLog for Arc<T> {
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        (**self).delete(key)
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> StorageResult<()>,
    ) -> StorageResult<()> {
        (**self).scan(visitor)
    }
}

/// [`DurableLog`] stored in a single redb file.
///
/// Every `put` / `delete` is its own committed write transaction, so a crash loses at
/// most the in-flight record.
pub struct RedbLog {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLog").field("path", &self.path).finish()
    }
}

impl RedbLog {
    /// Opens the log at `path`, creating the file (and missing parent directories) if needed.
    ///
    /// If `path` is an existing directory, the log lives in [`DEFAULT_LOG_FILENAME`] inside it.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = resolve_log_path(path.as_ref());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| open_failed(&path, e))?;
        }

        let db = Database::create(&path).map_err(|e| open_failed(&path, e))?;

        // Create the table up front so read transactions never see it missing.
        let write_txn = db.begin_write().map_err(|e| open_failed(&path, e))?;
        {
            let _table = write_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(|e| open_failed(&path, e))?;
        }
        write_txn.commit().map_err(|e| open_failed(&path, e))?;

        info!(path = %path.display(), "Durable log opened");

        Ok(Self { db, path })
    }

    /// Returns the resolved file path of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableLog for RedbLog {
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let write_txn = self.db.begin_write().map_err(|e| write_failed(key, e))?;
        {
            let mut table = write_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(|e| write_failed(key, e))?;
            table.insert(key, value).map_err(|e| write_failed(key, e))?;
        }
        write_txn.commit().map_err(|e| write_failed(key, e))?;

        debug!(key, bytes = value.len(), "Record committed");
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let write_txn = self.db.begin_write().map_err(|e| write_failed(key, e))?;
        {
            let mut table = write_txn
                .open_table(EMBEDDINGS_TABLE)
                .map_err(|e| write_failed(key, e))?;
            table.remove(key).map_err(|e| write_failed(key, e))?;
        }
        write_txn.commit().map_err(|e| write_failed(key, e))?;

        debug!(key, "Record deleted");
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let read_txn = self.db.begin_read().map_err(read_failed)?;
        let table = read_txn
            .open_table(EMBEDDINGS_TABLE)
            .map_err(read_failed)?;

        for item in table.iter().map_err(read_failed)? {
            let (key, value) = item.map_err(read_failed)?;
            visitor(key.value(), value.value())?;
        }

        Ok(())
    }
}

fn resolve_log_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_LOG_FILENAME)
    } else {
        path.to_path_buf()
    }
}

fn open_failed(path: &Path, err: impl std::fmt::Display) -> StorageError {
    StorageError::OpenFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn write_failed(key: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::WriteFailed {
        key: key.to_string(),
        reason: err.to_string(),
    }
}

fn read_failed(err: impl std::fmt::Display) -> StorageError {
    StorageError::ReadFailed {
        reason: err.to_string(),
    }
}
