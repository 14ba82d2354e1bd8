use rusqlite::{Connection, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// How long SQLite itself waits on a locked database before reporting
/// `SQLITE_BUSY`. Kept short: the processor owns the retry policy.
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// SQLite journal mode for the index file.
///
/// WAL needs shared memory between every process opening the database, which
/// network filesystems (SMB, NFS) do not provide. Use `Delete` when the index
/// lives on such a share and more than one machine writes to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    fn pragma_value(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// SQLite-backed duplicate index.
pub struct HashIndex {
    conn: Connection,
}

impl HashIndex {
    pub fn open(path: &str) -> Result<Self> {
        Self::open_with_journal(path, JournalMode::Wal)
    }

    pub fn open_with_journal(path: &str, journal_mode: JournalMode) -> Result<Self> {
        let conn = Connection::open(path)?;
        let index = HashIndex { conn };
        index.configure_pragmas(journal_mode)?;
        index.migrate_schema()?;
        Ok(index)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let index = HashIndex { conn };
        index.configure_pragmas(JournalMode::Wal)?;
        index.migrate_schema()?;
        Ok(index)
    }

    fn configure_pragmas(&self, journal_mode: JournalMode) -> Result<()> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        // journal_mode returns a row, so it cannot go through execute_batch
        let mode: String = self.conn.query_row(
            &format!("PRAGMA journal_mode = {}", journal_mode.pragma_value()),
            [],
            |row| row.get(0),
        )?;
        self.conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        debug!("SQLite pragmas configured (journal_mode={})", mode);
        Ok(())
    }

    /// The `hashes` table is append-only, so migrations only ever add to it.
    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS hashes (
                 hash TEXT PRIMARY KEY NOT NULL,
                 size_mb REAL NOT NULL,
                 extension TEXT NOT NULL
             );",
        )?;

        if version < SCHEMA_VERSION {
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
            debug!("Index schema migrated from version {} to {}", version, SCHEMA_VERSION);
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
