use super::models::IndexEntry;
use super::sqlite::HashIndex;
use super::{DuplicateIndex, IndexError};
use crate::hasher::Fingerprint;
use rusqlite::{params, OptionalExtension, Result};
use tracing::{debug, trace};

impl HashIndex {
    pub fn find_entry(&self, fingerprint: &Fingerprint) -> Result<Option<IndexEntry>> {
        self.connection()
            .query_row(
                "SELECT size_mb, extension FROM hashes WHERE hash = ?1",
                params![fingerprint.to_hex()],
                |row| {
                    Ok(IndexEntry {
                        fingerprint: *fingerprint,
                        size_mb: row.get(0)?,
                        extension: row.get(1)?,
                    })
                },
            )
            .optional()
    }

    /// Insert inside its own transaction and commit before returning.
    pub fn insert_entry(&self, entry: &IndexEntry) -> Result<bool> {
        let tx = self.connection().unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO hashes (hash, size_mb, extension) VALUES (?1, ?2, ?3)",
            params![entry.fingerprint.to_hex(), entry.size_mb, entry.extension],
        )?;
        tx.commit()?;

        if inserted == 0 {
            debug!("Fingerprint {} already indexed by another writer", entry.fingerprint);
        } else {
            trace!("Indexed {} ({:.3} MB)", entry.fingerprint, entry.size_mb);
        }
        Ok(inserted > 0)
    }

    pub fn count_entries(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM hashes", [], |row| row.get(0))
    }

    pub fn total_size_mb(&self) -> Result<f64> {
        self.connection().query_row(
            "SELECT COALESCE(SUM(size_mb), 0.0) FROM hashes",
            [],
            |row| row.get(0),
        )
    }
}

impl DuplicateIndex for HashIndex {
    fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<IndexEntry>, IndexError> {
        Ok(self.find_entry(fingerprint)?)
    }

    fn insert(&self, entry: &IndexEntry) -> Result<bool, IndexError> {
        Ok(self.insert_entry(entry)?)
    }
}
