use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Settings key holding the file-extension allow-list applied to drops.
pub const FILE_FILTERS_KEY: &str = "FileFilters";

/// Flat key-value settings store provided by the shell.
pub trait SettingsProvider {
    fn value(&self, key: &str) -> Option<Value>;

    /// Reads `key` as a list of strings. A single string is treated as a
    /// one-element list; anything else yields an empty list.
    fn string_list(&self, key: &str) -> Vec<String> {
        match self.value(key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
            Some(Value::String(text)) => vec![text],
            _ => Vec::new(),
        }
    }
}

/// Settings backed by a flat JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonSettings {
    values: BTreeMap<String, Value>,
}

impl JsonSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }
}

impl SettingsProvider for JsonSettings {
    fn value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_string_lists() {
        let mut settings = JsonSettings::new();
        settings.set(FILE_FILTERS_KEY, vec!["*.mp3", "*.flac"]);
        settings.set("Single", "*.ogg");
        settings.set("Number", 3);

        assert_eq!(settings.string_list(FILE_FILTERS_KEY), ["*.mp3", "*.flac"]);
        assert_eq!(settings.string_list("Single"), ["*.ogg"]);
        assert!(settings.string_list("Number").is_empty());
        assert!(settings.string_list("Missing").is_empty());
    }

    #[test]
    fn loads_flat_json_objects() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "FileFilters": ["mp3"], "Volume": 0.5 }"#).unwrap();

        let settings = JsonSettings::load(&path).unwrap();
        assert_eq!(settings.string_list(FILE_FILTERS_KEY), ["mp3"]);
        assert_eq!(settings.value("Volume"), Some(Value::from(0.5)));
    }
}
