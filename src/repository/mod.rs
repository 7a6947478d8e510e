//! Embedding repository: durable keyed store of feature vectors, mirrored in memory.
//!
//! # Consistency
//!
//! Every mutation commits to the [`DurableLog`] first and touches the in-memory mirror only
//! after the commit succeeds. A failed durable write therefore leaves the mirror exactly as
//! it was before the call, and the mirror never holds a record the log does not.
//!
//! # Layout
//!
//! Keys live in `keys[]`, vectors in one contiguous arena with stride `dim`; slot `i` of
//! both always describes the same record. A key-to-slot map makes lookups O(1). Removal
//! moves the last slot into the hole, so slot order is not stable across removals.

pub mod error;
pub mod snapshot;


use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::constants::{DimValidationError, KEY_MAX_LEN, validate_embedding_dim};
use crate::storage::{DurableLog, StorageError, decode_vector, encode_vector};

pub use error::{RepositoryError, RepositoryResult};
pub use snapshot::RepositorySnapshot;

/// Checks that `key` is non-empty, shorter than [`KEY_MAX_LEN`] bytes and NUL-free.
pub fn validate_key(key: &str) -> RepositoryResult<()> {
    let reason = if key.is_empty() {
        "key must not be empty".to_string()
    } else if key.len() >= KEY_MAX_LEN {
        format!("key is {} bytes (max {})", key.len(), KEY_MAX_LEN - 1)
    } else if key.contains('\0') {
        "key must not contain NUL".to_string()
    } else {
        return Ok(());
    };

    Err(RepositoryError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

/// Position of the first NaN or infinite component of `feature`, if any.
pub fn non_finite_index(feature: &[f32]) -> Option<usize> {
    feature.iter().position(|v| !v.is_finite())
}

/// Keyed feature store backed by a [`DurableLog`].
pub struct EmbeddingRepository<L: DurableLog> {
    log: L,
    keys: Vec<String>,
    arena: Vec<f32>,
    slots: HashMap<String, usize>,
    dim: Option<usize>,
}

impl<L: DurableLog> std::fmt::Debug for EmbeddingRepository<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingRepository")
            .field("len", &self.keys.len())
            .field("dim", &self.dim)
            .finish()
    }
}

impl<L: DurableLog> EmbeddingRepository<L> {
    /// Replays `log` into a fresh mirror.
    ///
    /// `dim` pins the feature length up front (normally the encoder's output length);
    /// with `None` the first replayed or added vector fixes it. Records that do not decode
    /// or disagree on length fail with [`RepositoryError::CorruptRecord`].
    pub fn open(log: L, dim: Option<usize>) -> RepositoryResult<Self> {
        if dim == Some(0) {
            return Err(RepositoryError::EmptyVector);
        }

        let started = Instant::now();
        let mut repository = Self {
            log,
            keys: Vec::new(),
            arena: Vec::new(),
            slots: HashMap::new(),
            dim,
        };

        let Self {
            log,
            keys,
            arena,
            slots,
            dim,
        } = &mut repository;

        let replay = log.scan(&mut |key, value| {
            let vector = decode_vector(value)
                .ok_or_else(|| corrupt(key, "length is not a multiple of 4"))?;
            if vector.is_empty() {
                return Err(corrupt(key, "empty feature vector"));
            }
            if let Some(index) = non_finite_index(&vector) {
                return Err(corrupt(key, format!("component {} is not finite", index)));
            }

            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(corrupt(
                    key,
                    format!("feature has {} values, expected {}", vector.len(), expected),
                ));
            }

            slots.insert(key.to_string(), keys.len());
            keys.push(key.to_string());
            arena.extend_from_slice(&vector);
            Ok(())
        });

        match replay {
            Ok(()) => {}
            Err(StorageError::CorruptRecord { key, reason }) => {
                return Err(RepositoryError::CorruptRecord { key, reason });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            records = repository.keys.len(),
            dim = ?repository.dim,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Embedding repository loaded"
        );

        Ok(repository)
    }

    /// Stores `vector` under `key`.
    ///
    /// Without `overwrite`, an existing key fails with [`RepositoryError::KeyExists`] and the
    /// log is not touched. With `overwrite`, the existing record is replaced in place. NaN or
    /// infinite components fail with [`RepositoryError::NonFiniteFeature`].
    pub fn add(&mut self, key: &str, vector: &[f32], overwrite: bool) -> RepositoryResult<()> {
        validate_key(key)?;
        self.check_dim(vector.len())?;
        if let Some(index) = non_finite_index(vector) {
            return Err(RepositoryError::NonFiniteFeature { index });
        }

        let existing = self.slots.get(key).copied();
        if existing.is_some() && !overwrite {
            return Err(RepositoryError::KeyExists {
                key: key.to_string(),
            });
        }

        if let Err(e) = self.log.put(key, &encode_vector(vector)) {
            warn!(key, error = %e, "Durable write failed; mirror unchanged");
            return Err(e.into());
        }

        let dim = *self.dim.get_or_insert(vector.len());
        match existing {
            Some(slot) => {
                self.arena[slot * dim..(slot + 1) * dim].copy_from_slice(vector);
            }
            None => {
                self.slots.insert(key.to_string(), self.keys.len());
                self.keys.push(key.to_string());
                self.arena.extend_from_slice(vector);
            }
        }

        debug!(key, overwrite, replaced = existing.is_some(), "Feature stored");
        Ok(())
    }

    /// Deletes the record for `key`.
    pub fn remove(&mut self, key: &str) -> RepositoryResult<()> {
        validate_key(key)?;

        let slot = self
            .slots
            .get(key)
            .copied()
            .ok_or_else(|| RepositoryError::KeyNotFound {
                key: key.to_string(),
            })?;

        if let Err(e) = self.log.delete(key) {
            warn!(key, error = %e, "Durable delete failed; mirror unchanged");
            return Err(e.into());
        }

        let dim = self.dim.unwrap_or(0);
        let last = self.keys.len() - 1;
        if slot != last {
            self.arena.copy_within(last * dim..(last + 1) * dim, slot * dim);
            self.keys.swap(slot, last);
            self.slots.insert(self.keys[slot].clone(), slot);
        }
        self.keys.truncate(last);
        self.arena.truncate(last * dim);
        self.slots.remove(key);

        debug!(key, "Feature removed");
        Ok(())
    }

    /// Returns `true` if `key` is stored. Invalid keys are simply absent.
    pub fn contains(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.slots.contains_key(key)
    }

    /// Vector stored under `key`.
    pub fn get(&self, key: &str) -> Option<&[f32]> {
        let slot = *self.slots.get(key)?;
        self.snapshot().vector(slot)
    }

    /// Read-only view of the committed state.
    pub fn snapshot(&self) -> RepositorySnapshot<'_> {
        RepositorySnapshot::new(&self.keys, &self.arena, self.dim.unwrap_or(0))
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Feature length, once fixed.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    fn check_dim(&self, actual: usize) -> RepositoryResult<()> {
        validate_embedding_dim(actual, self.dim.unwrap_or(actual)).map_err(|e| match e {
            DimValidationError::ZeroDimension => RepositoryError::EmptyVector,
            DimValidationError::DimensionMismatch { expected, actual } => {
                RepositoryError::DimensionMismatch { expected, actual }
            }
        })
    }
}

fn corrupt(key: &str, reason: impl Into<String>) -> StorageError {
    StorageError::CorruptRecord {
        key: key.to_string(),
        reason: reason.into(),
    }
}
