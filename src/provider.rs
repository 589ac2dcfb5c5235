//! Window Provider
//!
//! Turns raw OS window records into per-cycle [`WindowSnapshot`]s: applies
//! the inclusion rules (normal layer, not our own process, on the current
//! workspace or genuinely minimized), derives the minimized flag, resolves
//! the stable application key, and attaches the persisted sort priority.

use anyhow::Result;
use std::sync::Arc;
use tracing::trace;

use crate::config::ConfigStore;
use crate::types::WindowSnapshot;
use crate::window_system::{RawWindow, WindowSystem};

pub struct WindowProvider {
    system: Arc<dyn WindowSystem>,
    config: Arc<ConfigStore>,
}

impl WindowProvider {
    pub fn new(system: Arc<dyn WindowSystem>, config: Arc<ConfigStore>) -> Self {
        Self { system, config }
    }

    /// Build the snapshot set for one refresh cycle. Read-only against the
    /// OS; per-window query failures degrade to defaults instead of failing
    /// the cycle.
    pub fn get_windows(&self) -> Result<Vec<WindowSnapshot>> {
        let space_aware = self.config.load().space_aware_minimized();
        let own_pid = self.system.own_pid();
        let raw = self.system.list_windows()?;

        let mut snapshots = Vec::with_capacity(raw.len());
        for win in raw {
            if win.layer != 0 || win.pid == own_pid {
                continue;
            }
            if let Some(snapshot) = self.build_snapshot(win, space_aware) {
                snapshots.push(snapshot);
            }
        }
        trace!(count = snapshots.len(), "provider snapshot set built");
        Ok(snapshots)
    }

    /// All derived fields are computed up front; the snapshot is never
    /// patched after construction.
    fn build_snapshot(&self, win: RawWindow, space_aware: bool) -> Option<WindowSnapshot> {
        let is_minimized = if win.on_current_workspace {
            false
        } else if space_aware {
            // Off-workspace windows count as minimized without a per-window
            // query when space-aware mode is on
            true
        } else {
            self.system.is_window_minimized(win.pid, win.id)
        };

        // Neither here nor minimized: a window parked on another workspace
        // does not belong on this bar
        if !win.on_current_workspace && !is_minimized {
            return None;
        }

        let app_key = win.app_key.unwrap_or_else(|| win.owner_name.clone());
        let order_priority = self.config.order_priority(&app_key);
        let has_title = !win.title.is_empty();

        Some(WindowSnapshot {
            id: win.id,
            pid: win.pid,
            owner_name: win.owner_name,
            title: win.title,
            has_title,
            app_key,
            is_minimized,
            order_priority,
            rect: win.bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window_system::testing::{raw_window, FakeWindowSystem};
    use std::path::PathBuf;

    fn temp_store(name: &str) -> Arc<ConfigStore> {
        let mut path = std::env::temp_dir();
        path.push(format!("taskdock-provider-{}-{}.json", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        Arc::new(ConfigStore::open(PathBuf::from(path)))
    }

    fn provider_with(system: FakeWindowSystem, config: Arc<ConfigStore>) -> WindowProvider {
        WindowProvider::new(Arc::new(system), config)
    }

    #[test]
    fn test_includes_on_workspace_windows() {
        let system = FakeWindowSystem::with_windows(vec![raw_window(1, 100, "Mail", "Inbox")]);
        let out = provider_with(system, temp_store("basic")).get_windows().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
        assert!(!out[0].is_minimized);
        assert!(out[0].has_title);
    }

    #[test]
    fn test_drops_non_normal_layer() {
        let mut chrome = raw_window(1, 100, "Desktop", "wallpaper");
        chrome.layer = 1;
        let system = FakeWindowSystem::with_windows(vec![chrome]);
        let out = provider_with(system, temp_store("layer")).get_windows().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_drops_own_process_windows() {
        // FakeWindowSystem reports own_pid = 1
        let system = FakeWindowSystem::with_windows(vec![raw_window(1, 1, "taskdock", "bar")]);
        let out = provider_with(system, temp_store("own-pid")).get_windows().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_off_workspace_unminimized_window_is_dropped() {
        let mut ghost = raw_window(5, 100, "Mail", "Inbox");
        ghost.on_current_workspace = false;
        let system = FakeWindowSystem::with_windows(vec![ghost]);
        let out = provider_with(system, temp_store("ghost")).get_windows().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_off_workspace_minimized_window_is_included() {
        let mut hidden = raw_window(5, 100, "Mail", "Inbox");
        hidden.on_current_workspace = false;
        let system = FakeWindowSystem::with_windows(vec![hidden]);
        system.minimized.lock().unwrap().insert(5);
        let out = provider_with(system, temp_store("minimized")).get_windows().unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_minimized);
    }

    #[test]
    fn test_on_workspace_window_is_never_minimized() {
        let system = FakeWindowSystem::with_windows(vec![raw_window(5, 100, "Mail", "Inbox")]);
        // Stale minimized state must not override on-workspace presence
        system.minimized.lock().unwrap().insert(5);
        let out = provider_with(system, temp_store("on-ws")).get_windows().unwrap();
        assert!(!out[0].is_minimized);
    }

    #[test]
    fn test_space_aware_treats_off_workspace_as_minimized() {
        let mut away = raw_window(5, 100, "Mail", "Inbox");
        away.on_current_workspace = false;
        let system = FakeWindowSystem::with_windows(vec![away]);
        let store = temp_store("space-aware");
        store.update(|c| c.space_aware_minimized = Some(true));
        let out = provider_with(system, store).get_windows().unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_minimized);
    }

    #[test]
    fn test_app_key_falls_back_to_owner_name() {
        let mut win = raw_window(1, 100, "Mail", "Inbox");
        win.app_key = None;
        let system = FakeWindowSystem::with_windows(vec![win]);
        let out = provider_with(system, temp_store("key-fallback")).get_windows().unwrap();
        assert_eq!(out[0].app_key, "Mail");
    }

    #[test]
    fn test_priority_looked_up_by_app_key() {
        let store = temp_store("priority");
        store.set_order_priority("key.mail", "Mail", Some(3));
        let system = FakeWindowSystem::with_windows(vec![
            raw_window(1, 100, "Mail", "Inbox"),
            raw_window(2, 200, "Files", "Home"),
        ]);
        let out = provider_with(system, store).get_windows().unwrap();
        assert_eq!(out[0].order_priority, 3);
        assert_eq!(out[1].order_priority, i32::MAX);
    }

    #[test]
    fn test_empty_title_keeps_raw_title() {
        let system = FakeWindowSystem::with_windows(vec![raw_window(1, 100, "Mail", "")]);
        let out = provider_with(system, temp_store("empty-title")).get_windows().unwrap();
        assert_eq!(out[0].title, "");
        assert!(!out[0].has_title);
    }

    #[test]
    fn test_enumeration_failure_propagates() {
        let mut system = FakeWindowSystem::new();
        system.fail_enumeration = true;
        assert!(provider_with(system, temp_store("fail")).get_windows().is_err());
    }
}
