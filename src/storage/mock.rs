use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::error::{StorageError, StorageResult};
use super::log::DurableLog;

/// In-memory [`DurableLog`] with write-failure injection.
#[derive(Default)]
pub struct MockLog {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MockLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `put` / `delete` fail with [`StorageError::WriteFailed`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Inserts a raw record, bypassing failure injection (for seeding corrupt data).
    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.records.lock().insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.records.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check_writable(&self, key: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        Ok(())
    }
}

impl DurableLog for MockLog {
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.check_writable(key)?;
        self.records.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.check_writable(key)?;
        self.records.lock().remove(key);
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> StorageResult<()>,
    ) -> StorageResult<()> {
        let records = self.records.lock().clone();
        for (key, value) in &records {
            visitor(key, value)?;
        }
        Ok(())
    }
}
