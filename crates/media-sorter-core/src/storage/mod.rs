pub mod models;
pub mod queries;
pub mod sqlite;

use thiserror::Error;

pub use models::{bytes_to_mb, IndexEntry};
pub use sqlite::{HashIndex, JournalMode};

use crate::hasher::Fingerprint;

#[derive(Error, Debug)]
pub enum IndexError {
    /// The store is locked by another writer; the operation may succeed if retried.
    #[error("index is busy: {0}")]
    Contention(#[source] rusqlite::Error),

    #[error("index store error: {0}")]
    Store(#[source] rusqlite::Error),
}

impl IndexError {
    pub fn is_contention(&self) -> bool {
        matches!(self, IndexError::Contention(_))
    }
}

impl From<rusqlite::Error> for IndexError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                IndexError::Contention(e)
            }
            _ => IndexError::Store(e),
        }
    }
}

/// Persistent fingerprint → metadata store shared by every run (and possibly
/// several processes at once).
pub trait DuplicateIndex {
    fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<IndexEntry>, IndexError>;

    /// Insert and commit. Returns `false` when another writer already holds
    /// the fingerprint.
    fn insert(&self, entry: &IndexEntry) -> Result<bool, IndexError>;
}
