use std::path::Path;
use std::sync::{Arc, Mutex};

use burnish_changebus::StoreChangeBus;
use burnish_protocol::records::{StoreKey, StoreRecord};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::StoreError;
use crate::store::SharedStore;

/// SQLite-backed [`SharedStore`]: one `records` table keyed by record kind,
/// values JSON-encoded. The file is the only state with a lifetime spanning
/// both processes.
pub struct SqliteSharedStore {
    conn: Mutex<Connection>,
    bus: Arc<StoreChangeBus>,
}

impl SqliteSharedStore {
    pub fn open(path: impl AsRef<Path>, bus: Arc<StoreChangeBus>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|err| StoreError::Persistence(err.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            bus,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory(bus: Arc<StoreChangeBus>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|err| StoreError::Persistence(err.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            bus,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.lock_conn()
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS records (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                ",
            )
            .map_err(|err| StoreError::Persistence(err.to_string()))
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("shared store connection lock poisoned")
    }

    fn read_locked(
        conn: &Connection,
        key: StoreKey,
    ) -> Result<Option<StoreRecord>, StoreError> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::Persistence(err.to_string()))?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let record: StoreRecord =
            serde_json::from_str(&raw).map_err(|err| StoreError::Codec(err.to_string()))?;
        if record.key() != key {
            return Err(StoreError::Codec(format!(
                "record under key '{}' carries tag '{}'",
                key.as_str(),
                record.key().as_str()
            )));
        }
        Ok(Some(record))
    }
}

impl SharedStore for SqliteSharedStore {
    fn read(&self, key: StoreKey) -> Result<Option<StoreRecord>, StoreError> {
        let conn = self.lock_conn();
        Self::read_locked(&conn, key)
    }

    fn write(&self, record: StoreRecord) -> Result<(), StoreError> {
        let key = record.key();
        let encoded =
            serde_json::to_string(&record).map_err(|err| StoreError::Codec(err.to_string()))?;

        let old = {
            let conn = self.lock_conn();
            let old = Self::read_locked(&conn, key)?;
            conn.execute(
                "INSERT INTO records (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key.as_str(), encoded],
            )
            .map_err(|err| StoreError::Persistence(err.to_string()))?;
            old
        };

        debug!(key = key.as_str(), "store record written");
        self.bus.publish_change(key, old, Some(record));
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<Option<StoreRecord>, StoreError> {
        let old = {
            let conn = self.lock_conn();
            let old = Self::read_locked(&conn, key)?;
            conn.execute(
                "DELETE FROM records WHERE key = ?1",
                params![key.as_str()],
            )
            .map_err(|err| StoreError::Persistence(err.to_string()))?;
            old
        };

        if old.is_some() {
            debug!(key = key.as_str(), "store record removed");
            self.bus.publish_change(key, old.clone(), None);
        }
        Ok(old)
    }

    fn change_bus(&self) -> Arc<StoreChangeBus> {
        Arc::clone(&self.bus)
    }
}
