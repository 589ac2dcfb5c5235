//! Dock Service orchestrator
//!
//! Owns the per-cycle refresh pipeline: provider → filter → constraint scan
//! → display diff. User actions come back through [`DockService::handle_action`],
//! and a reorder forces an immediate re-run so the new ordering shows without
//! waiting for the next timer tick. Refresh cycles are synchronous on the
//! control thread and never overlap; only constrain resizes and their
//! cooldown clears run on background threads.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::actions::ActionHandler;
use crate::config::ConfigStore;
use crate::constants::timing::CONSTRAIN_COOLDOWN_MS;
use crate::filter::filter_and_sort;
use crate::provider::WindowProvider;
use crate::types::{WindowAction, WindowRect, WindowSnapshot};
use crate::window_system::WindowSystem;

/// Screen and bar measurements fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct BarGeometry {
    pub screen_width: f64,
    pub screen_height: f64,
    pub bar_height: f64,
}

impl BarGeometry {
    /// The horizontal line windows must stay above
    pub fn limit_y(&self) -> f64 {
        self.screen_height - self.bar_height
    }

    /// The bar's reserved region at the bottom of the screen
    pub fn bar_rect(&self) -> WindowRect {
        WindowRect::new(0.0, self.limit_y(), self.screen_width, self.bar_height)
    }
}

pub struct DockService {
    provider: WindowProvider,
    actions: ActionHandler,
    config: Arc<ConfigStore>,
    geometry: BarGeometry,
    cooldown: Duration,
    hovered_pids: HashSet<i32>,
    manually_hidden: bool,
    /// Window ids with a constrain resize in flight or cooling down. Written
    /// from the control thread and from cooldown timer threads.
    pending_resizes: Arc<Mutex<HashSet<u32>>>,
    /// Displayed list from the previous cycle, for the redraw diff
    last_visible: Option<Vec<WindowSnapshot>>,
}

impl DockService {
    pub fn new(
        system: Arc<dyn WindowSystem>,
        config: Arc<ConfigStore>,
        geometry: BarGeometry,
    ) -> Self {
        Self::with_cooldown(
            system,
            config,
            geometry,
            Duration::from_millis(CONSTRAIN_COOLDOWN_MS),
        )
    }

    pub fn with_cooldown(
        system: Arc<dyn WindowSystem>,
        config: Arc<ConfigStore>,
        geometry: BarGeometry,
        cooldown: Duration,
    ) -> Self {
        Self {
            provider: WindowProvider::new(Arc::clone(&system), Arc::clone(&config)),
            actions: ActionHandler::new(system, Arc::clone(&config)),
            config,
            geometry,
            cooldown,
            hovered_pids: HashSet::new(),
            manually_hidden: false,
            pending_resizes: Arc::new(Mutex::new(HashSet::new())),
            last_visible: None,
        }
    }

    /// Run one refresh cycle. Returns the list the bar should display, or
    /// `None` when the bar is hidden or nothing display-affecting changed.
    pub fn refresh(&mut self) -> Option<Vec<WindowSnapshot>> {
        if self.manually_hidden {
            return None;
        }

        let windows = match self.provider.get_windows() {
            Ok(windows) => windows,
            Err(e) => {
                // Degrade to an empty bar; the next cycle self-corrects
                warn!(error = %e, "window enumeration failed");
                Vec::new()
            }
        };

        let config = self.config.load();
        let visible = filter_and_sort(windows, &config, &self.hovered_pids);

        self.constrain_overlapping(&visible);

        if self.last_visible.as_deref() == Some(visible.as_slice()) {
            return None;
        }
        debug!(count = visible.len(), "visible window set changed");
        self.last_visible = Some(visible.clone());
        Some(visible)
    }

    /// Dispatch constrain resizes for visible windows overlapping the bar.
    fn constrain_overlapping(&self, visible: &[WindowSnapshot]) {
        let limit_y = self.geometry.limit_y();
        let bar_rect = self.geometry.bar_rect();

        for win in visible {
            if win.is_minimized {
                continue;
            }
            let Some(rect) = win.rect else { continue };
            if !(rect.intersects(&bar_rect) && rect.min_y() < limit_y) {
                continue;
            }

            // Insert-if-absent under a single lock acquisition, so a
            // concurrent cooldown clear cannot slip between check and insert
            let newly_pending = self
                .pending_resizes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(win.id);
            if !newly_pending {
                continue;
            }

            self.actions.constrain_window(win.pid, win.id, limit_y);

            // Cooldown, not a completion signal: clear the mark after a fixed
            // delay regardless of how the resize went. Removal is idempotent,
            // so a stale clear is harmless.
            let pending = Arc::clone(&self.pending_resizes);
            let cooldown = self.cooldown;
            let id = win.id;
            thread::spawn(move || {
                thread::sleep(cooldown);
                pending.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
            });
        }
    }

    /// Forward a user action; a reorder re-runs the refresh cycle immediately
    /// and returns the updated list.
    pub fn handle_action(
        &mut self,
        action: WindowAction,
        window: &WindowSnapshot,
    ) -> Option<Vec<WindowSnapshot>> {
        self.actions.perform(action, window);
        if matches!(action, WindowAction::Reorder(_)) {
            // Reflect the new ordering without waiting for the next tick
            self.last_visible = None;
            self.refresh()
        } else {
            None
        }
    }

    /// Hover state reported by the bar UI; affects ghost-window filtering.
    pub fn hover_changed(&mut self, pid: i32, hovering: bool) {
        if hovering {
            self.hovered_pids.insert(pid);
        } else {
            self.hovered_pids.remove(&pid);
        }
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        info!(hidden = hidden, "bar visibility toggled");
        self.manually_hidden = hidden;
        if !hidden {
            // Force the next refresh to emit even if nothing changed while
            // the bar was away
            self.last_visible = None;
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.manually_hidden
    }
}
