//! Durable key-value log backing the embedding repository.
//!
//! - [`DurableLog`] is the seam the repository writes through: individually atomic
//!   `put` / `delete` plus a forward `scan` from the first key.
//! - [`RedbLog`] is the on-disk implementation (one redb table, one committed write
//!   transaction per call).
//! - [`codec`] converts vectors to and from the raw little-endian f32 value format.

pub mod codec;
pub mod error;
pub mod log;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use codec::{decode_vector, encode_vector};
pub use error::{StorageError, StorageResult};
pub use log::{DEFAULT_LOG_FILENAME, DurableLog, RedbLog};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockLog;
