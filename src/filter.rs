//! Window filtering and ordering
//!
//! Pure logic: given the per-cycle snapshots, the persisted config, and the
//! set of processes the pointer is hovering over, decide which windows the
//! bar displays and in what order. No OS calls; deterministic for identical
//! inputs.

use std::collections::{HashMap, HashSet};

use crate::config::DockConfig;
use crate::types::WindowSnapshot;

/// Filter and order the windows the bar should display.
///
/// Ghost-hiding is a per-application decision: a titleless helper window is
/// suppressed only while a titled sibling from the same process exists to
/// represent the app. Hovering a process reveals all of its windows.
///
/// Sort is a stable three-key lexicographic order: priority ascending, then
/// owner name case-insensitive, then title case-insensitive. The empty
/// string sorts before any non-empty title, so at equal priority and owner a
/// titleless window comes first.
pub fn filter_and_sort(
    windows: Vec<WindowSnapshot>,
    config: &DockConfig,
    hovered_pids: &HashSet<i32>,
) -> Vec<WindowSnapshot> {
    let hide_ghost = config.hide_ghost_windows();

    let mut grouped: HashMap<i32, Vec<&WindowSnapshot>> = HashMap::new();
    for win in &windows {
        grouped.entry(win.pid).or_default().push(win);
    }

    let mut visible_ids: HashSet<u32> = HashSet::new();
    for (pid, group) in &grouped {
        let is_hovered = hovered_pids.contains(pid);
        let has_titled_sibling = group.iter().any(|w| w.has_title);

        for win in group {
            let include = if is_hovered {
                true
            } else if hide_ghost {
                win.has_title || !has_titled_sibling
            } else {
                true
            };
            if include {
                visible_ids.insert(win.id);
            }
        }
    }

    let mut filtered: Vec<WindowSnapshot> = windows
        .into_iter()
        .filter(|w| visible_ids.contains(&w.id))
        .collect();

    filtered.sort_by(|a, b| {
        a.order_priority
            .cmp(&b.order_priority)
            .then_with(|| a.owner_name.to_lowercase().cmp(&b.owner_name.to_lowercase()))
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });

    filtered
}
