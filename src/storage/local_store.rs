//! SQLite-backed key/value store for preferences and cached routes

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Prefix of the per-app key holding the cached mock route list
pub const MOCK_ROUTE_LIST_KEY: &str = "__NETWORK_CACHED_MOCK_ROUTE_LIST";
/// Key holding the selected body view format
pub const RESPONSE_BODY_FORMAT_KEY: &str = "__NETWORK_CACHED_RESPONSE_BODY_FORMAT";

pub fn mock_route_list_key(app_id: &str) -> String {
    format!("{}{}", MOCK_ROUTE_LIST_KEY, app_id)
}

/// Small string key/value store backed by SQLite, used for preferences and
/// cached routes.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    pub fn open(base_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = base_path.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating storage directory {:?}", dir))?;
        }
        let db_path = dir.join("network_inspector.sqlite");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("opening database at {:?}", db_path))?;
        Self::from_connection(conn, Some(db_path))
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> anyhow::Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    fn conn(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| anyhow::anyhow!("lock poisoned: {}", e))
    }

    pub fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM local_storage WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("reading {}", key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO local_storage (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .with_context(|| format!("writing {}", key))?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM local_storage WHERE key = ?1", params![key])
            .with_context(|| format!("removing {}", key))?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}
