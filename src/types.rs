//! Core value types: window geometry, per-cycle window snapshots, and the
//! user action variants the bar can dispatch.

/// A window's frame in screen coordinates (origin top-left, y grows down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WindowRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Top edge
    pub fn min_y(&self) -> f64 {
        self.y
    }

    /// Bottom edge
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &WindowRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// One OS window as seen by the core for a single refresh cycle.
///
/// Snapshots are immutable once built; the next cycle produces entirely new
/// values. Nothing holds one across cycles except the orchestrator's
/// last-displayed list (for diffing) and the pending-constraint id set.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    /// OS-assigned window id, unique among currently-existing windows
    pub id: u32,
    /// Process id of the owning application
    pub pid: i32,
    /// Display name of the owning application (not guaranteed unique)
    pub owner_name: String,
    /// Window's own title; empty when the OS reported none
    pub title: String,
    /// True iff the OS reported a non-empty title. A titleless window is a
    /// helper/ghost candidate.
    pub has_title: bool,
    /// Stable identifier for the owning application, used to key persisted
    /// preferences across process restarts
    pub app_key: String,
    pub is_minimized: bool,
    /// Persisted sort position; lower sorts first, `i32::MAX` = unset
    pub order_priority: i32,
    /// Frame in screen coordinates; absent for some minimized windows
    pub rect: Option<WindowRect>,
}

/// Equality covers only the fields that affect what the bar displays, so the
/// orchestrator can diff two cycles to decide whether a redraw is needed.
impl PartialEq for WindowSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.is_minimized == other.is_minimized
            && self.title == other.title
            && self.order_priority == other.order_priority
            && self.rect == other.rect
    }
}

/// A user intent reported by the bar UI for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    /// Minimize if focused and frontmost, otherwise bring forward
    Toggle,
    /// Unminimize, raise, and activate the owning application
    Open,
    Minimize,
    /// Request termination of the owning process
    Quit,
    /// Persist (or with `None`, remove) the per-application order priority
    Reorder(Option<i32>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: u32, title: &str) -> WindowSnapshot {
        WindowSnapshot {
            id,
            pid: 100,
            owner_name: "Mail".to_string(),
            title: title.to_string(),
            has_title: !title.is_empty(),
            app_key: "com.example.mail".to_string(),
            is_minimized: false,
            order_priority: i32::MAX,
            rect: None,
        }
    }

    #[test]
    fn test_rect_intersects_overlapping() {
        let a = WindowRect::new(0.0, 0.0, 100.0, 100.0);
        let b = WindowRect::new(50.0, 50.0, 100.0, 100.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_rect_intersects_touching_edges_is_not_overlap() {
        let a = WindowRect::new(0.0, 0.0, 100.0, 100.0);
        let b = WindowRect::new(0.0, 100.0, 100.0, 50.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_rect_edges() {
        let r = WindowRect::new(10.0, 20.0, 300.0, 400.0);
        assert_eq!(r.min_y(), 20.0);
        assert_eq!(r.max_y(), 420.0);
    }

    #[test]
    fn test_snapshot_equality_ignores_non_display_fields() {
        let a = snapshot(1, "Inbox");
        let mut b = snapshot(1, "Inbox");
        b.pid = 999;
        b.owner_name = "Other".to_string();
        b.app_key = "other".to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_equality_detects_display_changes() {
        let a = snapshot(1, "Inbox");

        let mut minimized = snapshot(1, "Inbox");
        minimized.is_minimized = true;
        assert_ne!(a, minimized);

        let retitled = snapshot(1, "Drafts");
        assert_ne!(a, retitled);

        let mut moved = snapshot(1, "Inbox");
        moved.rect = Some(WindowRect::new(0.0, 0.0, 1.0, 1.0));
        assert_ne!(a, moved);

        let mut reordered = snapshot(1, "Inbox");
        reordered.order_priority = 3;
        assert_ne!(a, reordered);
    }
}
