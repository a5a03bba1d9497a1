//! Access to the persisted display-layer state.
//!
//! The store itself belongs to the surrounding UI and holds opaque string
//! blobs. This module only knows the handful of keys it reads and writes;
//! a blob that fails to parse reads as absent.

use crate::units::UnitPreferences;
use common::errors::AppError;
use common::models::SavedCity;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LAST_CITY_KEY: &str = "lastCity";
pub const FAVORITES_KEY: &str = "favorites";
pub const UNITS_KEY: &str = "units";
pub const THEME_KEY: &str = "theme";

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

/// Preferences kept in a single JSON object on disk, so they outlive the
/// process. Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Load `path` if it exists. A missing or unreadable-as-JSON file starts
    /// an empty store; any other I/O failure is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring malformed preferences file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(AppError::internal(format!(
                    "Failed to read preferences from {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        debug!(path = %path.display(), entries = values.len(), "Opened preferences file");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(dir)
        {
            warn!(path = %dir.display(), error = %e, "Failed to create preferences directory");
            return;
        }

        let result = serde_json::to_string_pretty(values)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&self.path, json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to write preferences file");
        }
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut values = self.values.write();
        values.insert(key.to_string(), value);
        self.persist(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.write();
        if values.remove(key).is_some() {
            self.persist(&values);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

fn read_json<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Ignoring malformed stored preference");
            None
        }
    }
}

fn write_json<T: Serialize>(store: &dyn PreferenceStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, raw),
        Err(e) => warn!(key, error = %e, "Failed to serialize preference"),
    }
}

pub fn last_city(store: &dyn PreferenceStore) -> Option<SavedCity> {
    read_json(store, LAST_CITY_KEY)
}

pub fn save_last_city(store: &dyn PreferenceStore, city: &SavedCity) {
    write_json(store, LAST_CITY_KEY, city);
}

pub fn favorites(store: &dyn PreferenceStore) -> Vec<SavedCity> {
    read_json(store, FAVORITES_KEY).unwrap_or_default()
}

fn same_place(a: &SavedCity, b: &SavedCity) -> bool {
    a.lat == b.lat && a.lon == b.lon
}

/// Returns `false` if a city at the same coordinates is already a favorite.
pub fn add_favorite(store: &dyn PreferenceStore, city: SavedCity) -> bool {
    let mut list = favorites(store);
    if list.iter().any(|f| same_place(f, &city)) {
        return false;
    }
    list.push(city);
    write_json(store, FAVORITES_KEY, &list);
    true
}

pub fn remove_favorite(store: &dyn PreferenceStore, city: &SavedCity) -> bool {
    let mut list = favorites(store);
    let before = list.len();
    list.retain(|f| !same_place(f, city));
    if list.len() == before {
        return false;
    }
    write_json(store, FAVORITES_KEY, &list);
    true
}

pub fn unit_preferences(store: &dyn PreferenceStore) -> UnitPreferences {
    read_json(store, UNITS_KEY).unwrap_or_default()
}

pub fn save_unit_preferences(store: &dyn PreferenceStore, units: &UnitPreferences) {
    write_json(store, UNITS_KEY, units);
}

pub fn theme(store: &dyn PreferenceStore) -> Theme {
    read_json(store, THEME_KEY).unwrap_or_default()
}

pub fn save_theme(store: &dyn PreferenceStore, theme: Theme) {
    write_json(store, THEME_KEY, &theme);
}
