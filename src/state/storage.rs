//! Key-value blob storage.
//!
//! The editor persists three JSON blobs under string keys. Backends only
//! need get/set; there are no transactions and no schema.

use std::collections::HashMap;
use std::fmt;

/// Default key for the slot sequence.
pub const SLOTS_KEY: &str = "EquipmentSlots";

/// Default key for the enabled slot indices.
pub const ENABLED_KEY: &str = "EnabledEquipment";

/// Default key for the rune tier mapping.
pub const RUNES_KEY: &str = "SelectedRunes";

/// Storage keys used by one editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub slots: String,
    pub enabled: String,
    pub runes: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            slots: SLOTS_KEY.to_string(),
            enabled: ENABLED_KEY.to_string(),
            runes: RUNES_KEY.to_string(),
        }
    }
}

impl StorageKeys {
    /// Keys with `prefix` prepended, for several editors sharing one store.
    pub fn prefixed(prefix: &str) -> Self {
        Self {
            slots: format!("{}{}", prefix, SLOTS_KEY),
            enabled: format!("{}{}", prefix, ENABLED_KEY),
            runes: format!("{}{}", prefix, RUNES_KEY),
        }
    }
}

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend could not be reached (e.g. storage disabled by the browser)
    Unavailable,
    Read(String),
    Write(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Storage is unavailable"),
            Self::Read(key) => write!(f, "Failed to read key {}", key),
            Self::Write(key) => write!(f, "Failed to write key {}", key),
        }
    }
}

impl std::error::Error for StorageError {}

/// Blob store with get/set semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory store for tests and native hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    writes: usize,
    fail_writes: bool,
    fail_key: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Raw stored value for `key`.
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Make every subsequent `set` fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Make subsequent writes to `key` fail while other keys still succeed.
    pub fn set_fail_key(&mut self, key: Option<&str>) {
        self.fail_key = key.map(str::to_string);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes || self.fail_key.as_deref() == Some(key) {
            return Err(StorageError::Write(key.to_string()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// Browser `localStorage` backend.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    /// Open `window.localStorage`.
    pub fn open() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|_| StorageError::Read(key.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|_| StorageError::Write(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new().with_entry("seed", "1");
        assert_eq!(store.get("seed").unwrap(), Some("1".to_string()));
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(store.writes(), 0);

        store.set("k", "v").unwrap();
        assert_eq!(store.get_raw("k"), Some("v"));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_memory_store_failing_writes() {
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);

        assert_eq!(store.set("k", "v"), Err(StorageError::Write("k".to_string())));
        assert!(!store.contains_key("k"));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_memory_store_failing_key() {
        let mut store = MemoryStore::new();
        store.set_fail_key(Some("bad"));

        assert_eq!(store.set("bad", "v"), Err(StorageError::Write("bad".to_string())));
        assert_eq!(store.set("good", "v"), Ok(()));
        assert_eq!(store.writes(), 1);

        store.set_fail_key(None);
        assert_eq!(store.set("bad", "v"), Ok(()));
    }

    #[test]
    fn test_prefixed_keys() {
        let keys = StorageKeys::prefixed("alt:");
        assert_eq!(keys.slots, "alt:EquipmentSlots");
        assert_eq!(keys.enabled, "alt:EnabledEquipment");
        assert_eq!(keys.runes, "alt:SelectedRunes");
        assert_eq!(StorageKeys::default().runes, RUNES_KEY);
    }
}
