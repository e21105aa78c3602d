//! Key/value storage abstraction used by persisted stores
//!
//! - `Database`: SQLite `local_storage` table
//! - `MemoryStorage`: process-local map, for tests and ephemeral runs

use dashmap::DashMap;

use super::Database;

pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, String>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), String>;

    fn remove_item(&self, key: &str) -> Result<(), String>;
}

impl KeyValueStorage for Database {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Database::get_item(self, key).map_err(|e| e.to_string())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        Database::set_item(self, key, value).map_err(|e| e.to_string())
    }

    fn remove_item(&self, key: &str) -> Result<(), String> {
        Database::remove_item(self, key)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    items: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.items.get(key).map(|v| v.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), String> {
        self.items.remove(key);
        Ok(())
    }
}
