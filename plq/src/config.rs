//! Persisted settings for plq
//!
//! Settings are stored as a flat JSON object, one key per setting, using the
//! same key names a launcher host would use. Keys that are absent take their
//! defaults.

use anyhow::{Context, Result};
use paperless_search::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingsFile {
    values: BTreeMap<String, SettingValue>,
}

impl SettingsFile {
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("plq").join("settings.json")
    }

    /// Reads the file at `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let values = serde_json::from_str(&data)
            .with_context(|| format!("parse settings file {}", path.display()))?;
        Ok(Self { values })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(&self.values).context("serialize settings")?;
        fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn reset(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
        }
        Ok(())
    }

    pub fn is_set(&self, key: SettingKey) -> bool {
        self.values.contains_key(<&str>::from(key))
    }

    pub fn remove(&mut self, key: SettingKey) -> bool {
        self.values.remove(<&str>::from(key)).is_some()
    }
}

impl ConfigSource for SettingsFile {
    fn read_string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            SettingValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn read_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn read_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl ConfigSink for SettingsFile {
    fn write(&mut self, key: &str, value: &SettingValue) {
        self.values.insert(key.to_string(), value.clone());
    }
}

/// Settings as shown by `config show`: every key with its effective value,
/// credentials masked.
pub fn display_settings(settings: &Settings, file: &SettingsFile) -> Vec<SettingRow> {
    use strum::IntoEnumIterator;

    SettingKey::iter()
        .map(|key| {
            let value = settings.get(key);
            let value = if key.is_secret() && value != SettingValue::String(String::new()) {
                SettingValue::String("********".to_string())
            } else {
                value
            };
            SettingRow {
                key: key.to_string(),
                value,
                source: if file.is_set(key) { "file" } else { "default" },
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SettingRow {
    pub key: String,
    pub value: SettingValue,
    pub source: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let file = SettingsFile::load(&tmp.path().join("settings.json"))?;
        assert_eq!(file, SettingsFile::default());
        assert_eq!(Settings::load(&file), Settings::default());
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.instance_url = "https://paperless.example.com".to_string();
        settings.filters.body = true;
        settings.cache_results = false;
        settings.query_delay = 0;
        let mut file = SettingsFile::default();
        settings.save(&mut file);
        file.save(&path)?;

        let loaded = SettingsFile::load(&path)?;
        assert_eq!(Settings::load(&loaded), settings);
        // falsy values are kept, not replaced by defaults
        assert_eq!(loaded.read_bool("cache_results"), Some(false));
        assert_eq!(loaded.read_int("query_delay"), Some(0));

        SettingsFile::reset(&path)?;
        assert!(!path.exists());
        SettingsFile::reset(&path)?;
        Ok(())
    }

    #[test]
    fn test_wrong_kind_is_ignored() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{"page_size": "many", "auto_cache": true}"#)?;
        let file = SettingsFile::load(&path)?;
        let settings = Settings::load(&file);
        assert_eq!(settings.page_size, Settings::default().page_size);
        assert!(settings.auto_cache);
        Ok(())
    }

    #[test]
    fn test_display_masks_secrets() {
        let mut file = SettingsFile::default();
        file.write("api_token", &SettingValue::String("abc".into()));
        let settings = Settings {
            api_token: Secret::new("abc"),
            ..Settings::default()
        };
        let rows = display_settings(&settings, &file);
        let token = rows.iter().find(|r| r.key == "api_token").expect("api_token row");
        assert_eq!(token.value, SettingValue::String("********".into()));
        assert_eq!(token.source, "file");
        let password = rows.iter().find(|r| r.key == "password").expect("password row");
        assert_eq!(password.value, SettingValue::String(String::new()));
        assert_eq!(password.source, "default");
    }
}
