//! Action Handler
//!
//! Translates a user intent from the bar into OS-level effects. Nothing here
//! returns an error to the caller: OS call failures are absorbed inside the
//! [`WindowSystem`] implementation and the next refresh cycle reconciles
//! whatever actually happened. Toggle decisions query live OS state at
//! action time, never the snapshot the user clicked on.

use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

use crate::config::ConfigStore;
use crate::constants::bar::MIN_CONSTRAIN_HEIGHT;
use crate::types::{WindowAction, WindowSnapshot};
use crate::window_system::WindowSystem;

pub struct ActionHandler {
    system: Arc<dyn WindowSystem>,
    config: Arc<ConfigStore>,
}

impl ActionHandler {
    pub fn new(system: Arc<dyn WindowSystem>, config: Arc<ConfigStore>) -> Self {
        Self { system, config }
    }

    pub fn perform(&self, action: WindowAction, window: &WindowSnapshot) {
        info!(action = ?action, window = window.id, pid = window.pid, "performing action");
        match action {
            WindowAction::Reorder(priority) => {
                // Pure persistence; never touches OS window state
                self.config
                    .set_order_priority(&window.app_key, &window.owner_name, priority);
            }
            WindowAction::Quit => {
                // Fire and forget; the window disappears from a later cycle
                self.system.terminate_application(window.pid);
            }
            WindowAction::Minimize => {
                self.system.set_minimized(window.pid, window.id, true);
            }
            WindowAction::Open => {
                self.open(window);
            }
            WindowAction::Toggle => {
                self.toggle(window);
            }
        }
    }

    fn open(&self, window: &WindowSnapshot) {
        self.system.set_minimized(window.pid, window.id, false);
        self.system.raise(window.pid, window.id);
        self.system.activate(window.pid, window.id);
    }

    fn toggle(&self, window: &WindowSnapshot) {
        if self.system.is_window_minimized(window.pid, window.id) {
            self.open(window);
            return;
        }

        let focused = self.system.focused_window(window.pid);
        let app_active = self.system.is_application_active(window.pid);
        if app_active && focused == Some(window.id) {
            // Clicking the frontmost focused window puts it away
            self.system.set_minimized(window.pid, window.id, true);
        } else {
            // Visible but in the background: bring it forward instead
            self.system.raise(window.pid, window.id);
            self.system.activate(window.pid, window.id);
        }
    }

    /// Shrink the window so its bottom edge clears `limit_y`, off the control
    /// thread since the underlying call can block.
    pub fn constrain_window(&self, pid: i32, id: u32, limit_y: f64) {
        let system = Arc::clone(&self.system);
        thread::spawn(move || {
            apply_constraint(system.as_ref(), pid, id, limit_y);
        });
    }
}

/// Synchronous constrain step: resize only when the window genuinely
/// straddles the limit line, and refuse rather than crush it below the
/// minimum height. Width and position are preserved.
pub fn apply_constraint(system: &dyn WindowSystem, pid: i32, id: u32, limit_y: f64) {
    let Some(frame) = system.window_frame(pid, id) else {
        return;
    };
    if frame.max_y() > limit_y && frame.min_y() < limit_y {
        let new_height = limit_y - frame.min_y();
        if new_height < MIN_CONSTRAIN_HEIGHT {
            debug!(window = id, new_height = new_height, "constrain refused, window would be too small");
            return;
        }
        debug!(window = id, new_height = new_height, "constraining window above bar");
        system.resize_window(pid, id, frame.width, new_height);
    }
}
