use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A durable slot store holding one serialized value per key.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn set_raw(&self, key: &str, value: &str) -> Result<(), InfraError>;

    fn get_json<T>(&self, key: &str) -> Result<Option<T>, InfraError>
    where
        Self: Sized,
        T: DeserializeOwned,
    {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T>(&self, key: &str, value: &T) -> Result<(), InfraError>
    where
        Self: Sized,
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Creates the schema if needed before handing out the store.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, InfraError> {
        let store = Self::new(db_path);
        initialize_database(&store.db_path)?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_slots (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    slots: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn keys(&self) -> Result<Vec<String>, InfraError> {
        let slots = self
            .slots
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("kv store lock poisoned: {error}")))?;
        let mut keys = slots.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, InfraError> {
        let slots = self
            .slots
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("kv store lock poisoned: {error}")))?;
        Ok(slots.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("kv store lock poisoned: {error}")))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
