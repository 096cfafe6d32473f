//! # Syscoin Wallet Persistence
//!
//! A small, single-file record store used for wallet data. Records are opaque
//! key/value pairs; every key starts with a record type tag so callers can
//! count and scan records of one kind without decoding the rest.
//!
//! ## Architecture
//!
//! - **Backend**: raw byte storage plus an exclusive, non-blocking lock
//!   (`FileBackend` for wallet files, `MemoryBackend` for tests). File images
//!   are replaced by writing a temporary file and renaming it into place.
//! - **Database**: a locked, loaded store; reads come from memory, writes are
//!   staged in a [`WriteBatch`] and committed as one image
//! - **codec**: the on-disk image (magic, format version, records, checksum)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use syswallet_persistence::{Database, FileBackend, RecordKey, WriteBatch};
//!
//! # fn example() -> syswallet_persistence::Result<()> {
//! let backend = FileBackend::new("/tmp/wallets/wallet.dat");
//! let mut db = Database::open(backend, true)?;
//!
//! let mut batch = WriteBatch::new();
//! batch.put(RecordKey::new("name", b"addr".to_vec()), b"label".to_vec());
//! db.commit(batch)?;
//!
//! assert_eq!(db.records().count_tag("name"), 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod codec;
pub mod database;
pub mod records;

pub use backend::{Backend, FileBackend, MemoryBackend, LOCK_FILE_NAME};
pub use codec::{FORMAT_VERSION, MAGIC};
pub use database::Database;
pub use records::{RecordKey, Records};

use std::path::PathBuf;
use thiserror::Error;

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, Error>;

/// Persistence-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The store does not exist and creation was not requested
    #[error("Store not found: {0}")]
    NotFound(PathBuf),

    /// Another handle holds the exclusive lock
    #[error("Store is locked by another process: {0}")]
    Locked(PathBuf),

    /// The store image could not be decoded
    #[error("Corrupt store: {0}")]
    Corrupt(String),

    /// The store was written by a newer format
    #[error("Unsupported store format version {0}")]
    UnsupportedFormat(u32),

    /// A record key or value failed to (de)serialize
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

/// Single operation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Insert or replace a record
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Remove a record
    Delete { key: Vec<u8> },
}

/// Ordered set of writes applied atomically by [`Database::commit`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    operations: Vec<BatchOperation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a write of `value` under `key`.
    pub fn put(&mut self, key: RecordKey, value: Vec<u8>) {
        self.operations.push(BatchOperation::Put {
            key: key.encode(),
            value,
        });
    }

    /// Stages removal of `key`.
    pub fn delete(&mut self, key: RecordKey) {
        self.operations.push(BatchOperation::Delete { key: key.encode() });
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[BatchOperation] {
        &self.operations
    }
}
