use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::BaseSettings;
use crate::selection::ConstraintSets;

const BASE_KEY: &str = "base";
const CONSTRAINTS_KEY: &str = "constraints";
const API_KEY_KEY: &str = "api_key";

/// User-chosen defaults carried across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudioDefaults {
    pub base: BaseSettings,
    pub constraints: ConstraintSets,
    pub api_key: Option<String>,
}

/// Durable key/value store backed by one JSON object on disk.
///
/// Writes merge only the keys this instance touched onto whatever is on disk,
/// so two stores sharing a file do not clobber each other's keys.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    payload: Option<Map<String, Value>>,
    dirty_keys: Vec<String>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payload: None,
            dirty_keys: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable values come back as `None`.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let payload = self.ensure_loaded();
        payload
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        let snapshot = serde_json::to_value(value)?;
        let payload = self.ensure_loaded();
        if payload.get(key) == Some(&snapshot) {
            return Ok(());
        }
        payload.insert(key.to_string(), snapshot);
        if !self.dirty_keys.iter().any(|existing| existing == key) {
            self.dirty_keys.push(key.to_string());
        }
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        if on_disk.remove(key).is_some() {
            write_json_object(&self.path, &on_disk)?;
        }
        self.payload = Some(on_disk);
        self.dirty_keys.retain(|existing| existing != key);
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        if self.dirty_keys.is_empty() {
            return Ok(());
        }
        let Some(payload) = &self.payload else {
            return Ok(());
        };

        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        for key in &self.dirty_keys {
            if let Some(value) = payload.get(key) {
                on_disk.insert(key.clone(), value.clone());
            }
        }
        write_json_object(&self.path, &on_disk)?;
        self.payload = Some(on_disk);
        self.dirty_keys.clear();
        Ok(())
    }

    pub fn load_defaults(&mut self) -> StudioDefaults {
        StudioDefaults {
            base: self.get(BASE_KEY).unwrap_or_default(),
            constraints: self.get(CONSTRAINTS_KEY).unwrap_or_default(),
            api_key: self
                .get::<String>(API_KEY_KEY)
                .filter(|value| !value.trim().is_empty()),
        }
    }

    pub fn save_defaults(&mut self, defaults: &StudioDefaults) -> anyhow::Result<()> {
        self.set(BASE_KEY, &defaults.base)?;
        self.set(CONSTRAINTS_KEY, &defaults.constraints)?;
        match defaults.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => self.set(API_KEY_KEY, &key),
            _ => self.remove(API_KEY_KEY),
        }
    }

    fn ensure_loaded(&mut self) -> &mut Map<String, Value> {
        self.payload
            .get_or_insert_with(|| read_json_object(&self.path).unwrap_or_default())
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )?;
    Ok(())
}
