//! Config schema types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default file stem of the subscriber store inside the data dir.
pub const DEFAULT_STORAGE_NAME: &str = "subscriber-storage";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertcastConfig {
    /// Telegram account settings, deserialized by the telegram crate.
    pub telegram: serde_json::Value,
    pub storage: StorageConfig,
}

impl Default for AlertcastConfig {
    fn default() -> Self {
        Self {
            telegram: serde_json::Value::Object(serde_json::Map::new()),
            storage: StorageConfig::default(),
        }
    }
}

impl AlertcastConfig {
    /// String value of a `[telegram]` key, if present.
    pub fn telegram_str(&self, key: &str) -> Option<&str> {
        self.telegram.get(key).and_then(serde_json::Value::as_str)
    }

    /// Set a `[telegram]` key, turning a non-table section into a table.
    pub fn set_telegram(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        if !self.telegram.is_object() {
            self.telegram = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(table) = self.telegram.as_object_mut() {
            table.insert(key.to_string(), value.into());
        }
    }

    /// Directory holding the subscriber store.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(crate::loader::default_data_dir)
            .unwrap_or_else(|| PathBuf::from(".alertcast"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// File stem of the store; the file is `<data_dir>/<storage_name>.json`.
    pub storage_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_name: DEFAULT_STORAGE_NAME.into(),
        }
    }
}
