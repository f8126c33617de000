//! Storage and persistence layer
//!
//! - Scoped key-value store abstraction (JSON values)
//! - In-memory and file-backed stores
//! - Keyspace used by the account cache

mod file_system;
pub mod keys;
mod memory;

pub use file_system::FileStore;
pub use memory::MemoryStore;

use serde_json::Value;

use crate::error::StorageError;

/// Persistent keyed store backing all cached account and network state.
///
/// Writes are synchronous and not transactional across keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Vec<String>;
}

/// Typed accessors over [`KeyValueStore`]
pub trait StoreExt: KeyValueStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.as_u64())
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    fn get_array(&self, key: &str) -> Vec<Value> {
        match self.get(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }

    /// Write `value` unless the stored value is already equal. Returns whether a write happened.
    fn set_if_changed(&self, key: &str, value: Value) -> Result<bool, StorageError> {
        if self.get(key).as_ref() == Some(&value) {
            return Ok(false);
        }
        self.set(key, value)?;
        Ok(true)
    }
}

impl<T: KeyValueStore + ?Sized> StoreExt for T {}
