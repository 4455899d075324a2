//! # Settings Store
//!
//! Small typed key-value store for preferences, entitlement flags and usage
//! counters.
//!
//! ## Implementations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SettingsStore                                    │
//! │                                                                         │
//! │  typed getters / setters (provided methods)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_value / set_value / remove   (serde_json::Value per key)          │
//! │       │                                                                 │
//! │       ├──► MemorySettings    Mutex<Map>, nothing persisted             │
//! │       │                                                                 │
//! │       └──► JsonFileSettings  Mutex<Map> + settings.json                │
//! │                               every mutation: write temp → rename      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Getters take a default and never fail: a missing key or a value of the
//! wrong type yields the default.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::AppResult;

/// Well-known settings keys.
pub mod keys {
    // Entitlement
    pub const TRIAL_STARTED_AT: &str = "entitlement.trial_started_at";
    pub const IS_PURCHASED: &str = "entitlement.is_purchased";
    pub const PURCHASE_PRODUCT_ID: &str = "entitlement.product_id";
    pub const PURCHASE_TYPE: &str = "entitlement.purchase_type";
    pub const PURCHASED_AT: &str = "entitlement.purchased_at";
    pub const PURCHASE_EXPIRES_AT: &str = "entitlement.expires_at";
    /// Set on the first recorded purchase and never cleared.
    pub const HAS_EVER_PURCHASED: &str = "entitlement.has_ever_purchased";

    // Usage prompts
    pub const HYMNS_READ: &str = "usage.hymns_read";
    pub const NEXT_PROMPT_THRESHOLD: &str = "usage.next_prompt_threshold";
    pub const LAST_PROMPT_AT: &str = "usage.last_prompt_at";
    pub const PROMPT_COUNT: &str = "usage.prompt_count";

    // Reader preferences
    pub const FONT_SIZE: &str = "reader.font_size";
    pub const FONT_FAMILY: &str = "reader.font_family";
    pub const ONBOARDING_SEEN: &str = "onboarding.seen";
}

// =============================================================================
// Trait
// =============================================================================

/// Typed key-value persistence.
pub trait SettingsStore: Send + Sync {
    /// Raw value for `key`.
    fn get_value(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`.
    fn set_value(&self, key: &str, value: Value) -> AppResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> AppResult<()>;

    /// Stores `f(current)` under `key` while holding the store's lock, so
    /// concurrent updates of the same key are never lost. Returns the value
    /// written.
    fn update_value(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&Value>) -> Value,
    ) -> AppResult<Value>;

    fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        match self.get_value(key) {
            Some(Value::String(s)) => s,
            _ => default.to_string(),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> AppResult<()> {
        self.set_value(key, Value::String(value.to_string()))
    }

    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get_value(key)
            .and_then(|v| v.as_i64())
            .unwrap_or(default)
    }

    fn set_i64(&self, key: &str, value: i64) -> AppResult<()> {
        self.set_value(key, Value::from(value))
    }

    /// Adds one to the integer under `key` (`default` if missing) and
    /// returns the new value.
    fn increment_i64(&self, key: &str, default: i64) -> AppResult<i64> {
        let next = self
            .update_value(key, &mut |current| {
                let value = current.and_then(Value::as_i64).unwrap_or(default);
                Value::from(value.saturating_add(1))
            })?
            .as_i64()
            .unwrap_or(default);
        Ok(next)
    }

    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get_value(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(default)
    }

    /// Non-finite values cannot be represented and are stored as `null`.
    fn set_f64(&self, key: &str, value: f64) -> AppResult<()> {
        self.set_value(key, Value::from(value))
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_value(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) -> AppResult<()> {
        self.set_value(key, Value::Bool(value))
    }

    /// Timestamp stored as RFC 3339. `None` if missing or unparsable.
    fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.get_value(key) {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }

    fn set_timestamp(&self, key: &str, value: DateTime<Utc>) -> AppResult<()> {
        self.set_value(key, Value::String(value.to_rfc3339()))
    }
}

fn lock(map: &Mutex<Map<String, Value>>) -> MutexGuard<'_, Map<String, Value>> {
    // A panicking writer cannot leave the map half-updated.
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Non-persistent store for tests and previews.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<Map<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get_value(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> AppResult<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        lock(&self.values).remove(key);
        Ok(())
    }

    fn update_value(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&Value>) -> Value,
    ) -> AppResult<Value> {
        let mut values = lock(&self.values);
        let next = f(values.get(key));
        values.insert(key.to_string(), next.clone());
        Ok(next)
    }
}

// =============================================================================
// JSON File Store
// =============================================================================

/// Store backed by a single JSON object on disk.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileSettings {
    /// Opens the store at `path`. A missing or empty file starts empty.
    ///
    /// ## Errors
    /// * `AppError::SettingsIo` - the file exists but cannot be read
    /// * `AppError::Serialization` - the file is not a JSON object
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = values.len(), "Opened settings file");

        Ok(JsonFileSettings {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the whole map to a sibling temp file, then renames it over
    /// the real one.
    fn persist(&self, values: &Map<String, Value>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(values)?;
        std::fs::write(&tmp, contents)?;

        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to replace settings file");
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        Ok(())
    }

    /// Inserts under the held lock and persists. Memory and disk stay in
    /// agreement when the write fails.
    fn replace(&self, values: &mut Map<String, Value>, key: &str, value: Value) -> AppResult<()> {
        let previous = values.insert(key.to_string(), value);

        if let Err(e) = self.persist(values) {
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get_value(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> AppResult<()> {
        let mut values = lock(&self.values);
        self.replace(&mut values, key, value)
    }

    fn update_value(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&Value>) -> Value,
    ) -> AppResult<Value> {
        let mut values = lock(&self.values);
        let next = f(values.get(key));
        self.replace(&mut values, key, next.clone())?;
        Ok(next)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut values = lock(&self.values);
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&values) {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Arc;

    #[test]
    fn test_typed_defaults_and_round_trip() {
        let store = MemorySettings::new();

        assert_eq!(store.get_string(keys::FONT_FAMILY, "serif"), "serif");
        assert_eq!(store.get_i64(keys::HYMNS_READ, 0), 0);
        assert_eq!(store.get_f64(keys::FONT_SIZE, 18.0), 18.0);
        assert!(!store.get_bool(keys::ONBOARDING_SEEN, false));
        assert!(!store.contains(keys::ONBOARDING_SEEN));

        store.set_string(keys::FONT_FAMILY, "sans").unwrap();
        store.set_i64(keys::HYMNS_READ, 12).unwrap();
        store.set_f64(keys::FONT_SIZE, 21.5).unwrap();
        store.set_bool(keys::ONBOARDING_SEEN, true).unwrap();

        assert_eq!(store.get_string(keys::FONT_FAMILY, "serif"), "sans");
        assert_eq!(store.get_i64(keys::HYMNS_READ, 0), 12);
        assert_eq!(store.get_f64(keys::FONT_SIZE, 18.0), 21.5);
        assert!(store.get_bool(keys::ONBOARDING_SEEN, false));

        store.remove(keys::ONBOARDING_SEEN).unwrap();
        store.remove(keys::ONBOARDING_SEEN).unwrap();
        assert!(!store.contains(keys::ONBOARDING_SEEN));
    }

    #[test]
    fn test_wrong_type_yields_default() {
        let store = MemorySettings::new();
        store.set_string(keys::HYMNS_READ, "twelve").unwrap();
        assert_eq!(store.get_i64(keys::HYMNS_READ, 3), 3);
        assert!(store.get_timestamp(keys::HYMNS_READ).is_none());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let store = MemorySettings::new();
        let now = Utc::now();
        store.set_timestamp(keys::TRIAL_STARTED_AT, now).unwrap();
        assert_eq!(store.get_timestamp(keys::TRIAL_STARTED_AT), Some(now));
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("settings.json");

        {
            let store = JsonFileSettings::open(&path).unwrap();
            store.set_i64(keys::PROMPT_COUNT, 2).unwrap();
            store.set_bool(keys::IS_PURCHASED, true).unwrap();
            store.remove(keys::IS_PURCHASED).unwrap();
        }

        let store = JsonFileSettings::open(&path).unwrap();
        assert_eq!(store.get_i64(keys::PROMPT_COUNT, 0), 2);
        assert!(!store.contains(keys::IS_PURCHASED));
        assert!(!path.with_extension("json.tmp").exists());
    }

    fn hammer_increments(store: Arc<dyn SettingsStore>) {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.increment_i64(keys::HYMNS_READ, 0).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
        hammer_increments(store.clone());
        assert_eq!(store.get_i64(keys::HYMNS_READ, 0), 200);
    }

    #[test]
    fn test_file_store_increment_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store: Arc<dyn SettingsStore> = Arc::new(JsonFileSettings::open(&path).unwrap());
        store.set_string(keys::PROMPT_COUNT, "garbled").unwrap();
        assert_eq!(store.increment_i64(keys::PROMPT_COUNT, 4).unwrap(), 5);

        hammer_increments(store.clone());
        drop(store);

        let reopened = JsonFileSettings::open(&path).unwrap();
        assert_eq!(reopened.get_i64(keys::HYMNS_READ, 0), 200);
        assert_eq!(reopened.get_i64(keys::PROMPT_COUNT, 0), 5);
    }

    #[test]
    fn test_file_store_empty_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        std::fs::write(&path, "").unwrap();
        assert!(!JsonFileSettings::open(&path).unwrap().contains(keys::HYMNS_READ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileSettings::open(&path),
            Err(AppError::Serialization(_))
        ));
    }
}
