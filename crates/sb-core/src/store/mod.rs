//! SQLite-backed state store
//!
//! A [`Store`] only remembers where the database file lives. Every operation
//! opens its own connection, runs to completion (one statement or one
//! transaction), and drops the connection again. No locks are held between
//! calls, so the store assumes a single writer process.

mod file;
mod knowledge;
mod memory;
mod schema;
mod session;
mod types;
mod user;

pub use memory::MEMORY_RECALL_LIMIT;
pub use session::{DEFAULT_HISTORY_LIMIT, DEFAULT_SESSION_TITLE};
pub use types::{
    HistoryEntry, KnowledgeEntry, MemoryFact, Message, NewUser, Role, Session, StoredFile, User,
};

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Connection;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use tracing::{debug, error, info};

use crate::Result;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the on-disk state store
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Open (and provision if needed) the store at the given path
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening state store at: {}", db_path.display());
        let store = Self { db_path };
        store.init_schema()?;
        info!("Store initialized at {}", store.db_path.display());
        Ok(store)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Referential integrity is advisory; the bundled build enables it by default
        conn.pragma_update(None, "foreign_keys", false)?;
        Ok(conn)
    }

    /// Run one operation on a fresh connection, logging storage failures
    fn with_conn<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let result = self.connect().and_then(|mut conn| f(&mut conn));
        if let Err(e) = &result {
            error!("Store operation '{}' failed: {}", operation, e);
        }
        result
    }
}

/// Current instant at the precision persisted by the store
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so lexical order matches chronological order
pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Store;
    use tempfile::TempDir;

    /// A store in a throwaway directory; keep the `TempDir` alive for the test
    pub(crate) fn temp_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("silentbot.db")).unwrap();
        (dir, store)
    }
}
