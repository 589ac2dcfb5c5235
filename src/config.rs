//! Persisted dock configuration
//!
//! A single JSON document holding per-application preferences (display name,
//! sort priority) plus global feature toggles. Loaded once at startup and
//! rewritten in full on every mutation; a missing or malformed file is never
//! fatal and simply yields the default document.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

/// Per-application preferences, keyed by application key in [`DockConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Last observed owner name, kept fresh so preference editors stay legible
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_priority: Option<i32>,
}

/// Root persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockConfig {
    #[serde(default)]
    pub applications: HashMap<String, AppConfig>,

    /// Suppress titleless helper windows when a titled sibling exists
    /// (default true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_ghost_windows: Option<bool>,

    /// Treat off-workspace windows as minimized instead of dropping them
    /// (default false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_aware_minimized: Option<bool>,
}

impl DockConfig {
    pub fn hide_ghost_windows(&self) -> bool {
        self.hide_ghost_windows.unwrap_or(true)
    }

    pub fn space_aware_minimized(&self) -> bool {
        self.space_aware_minimized.unwrap_or(false)
    }
}

/// Owns the in-memory document and its on-disk location.
///
/// Constructed once in `main` and shared by `Arc`; the in-memory copy stays
/// authoritative for the process lifetime even if a write fails.
pub struct ConfigStore {
    path: PathBuf,
    config: Mutex<DockConfig>,
}

impl ConfigStore {
    fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Open the store at the default per-user location.
    pub fn open_default() -> Self {
        Self::open(Self::default_path())
    }

    /// Open the store at an explicit path (used by `--config` and tests).
    pub fn open(path: PathBuf) -> Self {
        let config = Self::read_document(&path);
        info!(path = %path.display(), applications = config.applications.len(), "loaded dock config");
        Self {
            path,
            config: Mutex::new(config),
        }
    }

    fn read_document(path: &PathBuf) -> DockConfig {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(_) => return DockConfig::default(),
        };
        match serde_json::from_slice(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed config file, using defaults");
                DockConfig::default()
            }
        }
    }

    /// Snapshot of the current document.
    pub fn load(&self) -> DockConfig {
        self.config.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the document and write it through to disk.
    pub fn save(&self, config: DockConfig) {
        {
            let mut guard = self.config.lock().unwrap_or_else(|e| e.into_inner());
            *guard = config.clone();
        }
        self.persist(&config);
    }

    /// Mutate the document in place, then write it through to disk.
    pub fn update(&self, modify: impl FnOnce(&mut DockConfig)) {
        let config = {
            let mut guard = self.config.lock().unwrap_or_else(|e| e.into_inner());
            modify(&mut guard);
            guard.clone()
        };
        self.persist(&config);
    }

    fn persist(&self, config: &DockConfig) {
        // Write failures are absorbed: the in-memory document stays
        // authoritative and the next successful write catches up.
        if let Some(parent) = self.path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "failed to create config directory");
            return;
        }
        let json = match serde_json::to_vec_pretty(config) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize config");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %e, "failed to write config");
        }
    }

    /// Persisted sort priority for an application key; `i32::MAX` when unset.
    pub fn order_priority(&self, app_key: &str) -> i32 {
        let guard = self.config.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .applications
            .get(app_key)
            .and_then(|app| app.order_priority)
            .unwrap_or(i32::MAX)
    }

    /// Persist a priority override for an application, refreshing its stored
    /// display name; `None` removes the entry entirely.
    pub fn set_order_priority(&self, app_key: &str, owner_name: &str, priority: Option<i32>) {
        self.update(|config| match priority {
            Some(p) => {
                let app = config
                    .applications
                    .entry(app_key.to_string())
                    .or_insert_with(|| AppConfig {
                        display_name: owner_name.to_string(),
                        order_priority: None,
                    });
                app.display_name = owner_name.to_string();
                app.order_priority = Some(p);
            }
            None => {
                config.applications.remove(app_key);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("taskdock-test-{}-{}.json", std::process::id(), name));
        path
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let store = ConfigStore::open(temp_config_path("missing"));
        let config = store.load();
        assert!(config.applications.is_empty());
        assert!(config.hide_ghost_windows());
        assert!(!config.space_aware_minimized());
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let path = temp_config_path("malformed");
        fs::write(&path, b"{ not json").unwrap();
        let store = ConfigStore::open(path.clone());
        assert_eq!(store.load(), DockConfig::default());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_order_priority_defaults_to_max() {
        let store = ConfigStore::open(temp_config_path("unset-priority"));
        assert_eq!(store.order_priority("com.example.mail"), i32::MAX);
    }

    #[test]
    fn test_set_then_clear_priority_leaves_no_override() {
        let path = temp_config_path("set-clear");
        let store = ConfigStore::open(path.clone());

        store.set_order_priority("com.example.mail", "Mail", Some(5));
        assert_eq!(store.order_priority("com.example.mail"), 5);

        store.set_order_priority("com.example.mail", "Mail", None);
        assert_eq!(store.order_priority("com.example.mail"), i32::MAX);
        assert!(store.load().applications.is_empty());

        // The persisted document must not retain the entry either
        let reloaded = ConfigStore::open(path.clone());
        assert!(reloaded.load().applications.is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_set_priority_refreshes_display_name() {
        let path = temp_config_path("display-name");
        let store = ConfigStore::open(path.clone());

        store.set_order_priority("com.example.mail", "Mail", Some(1));
        store.set_order_priority("com.example.mail", "Mail 2.0", Some(1));

        let config = store.load();
        assert_eq!(
            config.applications.get("com.example.mail").unwrap().display_name,
            "Mail 2.0"
        );
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_write_through_survives_reload() {
        let path = temp_config_path("write-through");
        {
            let store = ConfigStore::open(path.clone());
            store.set_order_priority("org.gnome.Terminal", "Terminal", Some(2));
            store.update(|c| c.hide_ghost_windows = Some(false));
        }
        let reloaded = ConfigStore::open(path.clone());
        let config = reloaded.load();
        assert_eq!(reloaded.order_priority("org.gnome.Terminal"), 2);
        assert!(!config.hide_ghost_windows());
        let _ = fs::remove_file(path);
    }
}
