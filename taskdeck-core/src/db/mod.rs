pub mod schema;

mod activity;
mod assignments;
pub(crate) mod categories;
pub(crate) mod projects;
mod roles;
mod settings;
pub(crate) mod tasks;
mod users;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use rusqlite::Connection;
use uuid::Uuid;

/// Shared handle to the SQLite store. Cloned freely across transports; the
/// underlying connection is serialized behind a mutex.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).with_context(|| {
            format!("failed to open database at {}", path.as_ref().display())
        })?;
        Self::from_connection(conn)
    }

    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("failed to enable foreign keys")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "taskdeck", "taskdeck")
            .context("could not determine data directory")?;
        Ok(dirs.data_dir().join("taskdeck.db"))
    }

    pub fn migrate(&self) -> Result<()> {
        tracing::debug!("applying schema");
        self.conn()
            .execute_batch(schema::SCHEMA)
            .context("schema migration failed")?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

/// Map a TEXT id column to a `Uuid`, surfacing bad rows as conversion errors.
pub(crate) fn parse_uuid(idx: usize, value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_uuid_opt(idx: usize, value: Option<String>) -> rusqlite::Result<Option<Uuid>> {
    value.map(|s| parse_uuid(idx, s)).transpose()
}

/// Map a TEXT enum column through one of the model `from_str` parsers.
pub(crate) fn parse_enum<T>(
    idx: usize,
    value: String,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value: {value}").into(),
        )
    })
}
