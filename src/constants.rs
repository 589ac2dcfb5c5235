//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Bar geometry constants
pub mod bar {
    /// Visible height of the bar's reserved region at the bottom of the screen
    pub const BAR_HEIGHT: f64 = 64.0;

    /// Minimum height a window may be shrunk to by the constrain pass.
    /// Resizes that would go below this are refused outright.
    pub const MIN_CONSTRAIN_HEIGHT: f64 = 50.0;
}

/// Timing constants
pub mod timing {
    /// Interval between periodic refresh cycles, in milliseconds
    pub const REFRESH_INTERVAL_MS: u64 = 500;

    /// Cooldown before a window id becomes eligible for another constrain
    /// resize, in milliseconds. This is a settle window, not a completion
    /// signal: the clear fires regardless of whether the resize landed.
    pub const CONSTRAIN_COOLDOWN_MS: u64 = 1500;
}

/// Config file location constants
pub mod config {
    /// Subdirectory under the user config dir
    pub const APP_DIR: &str = "taskdock";

    /// Config filename
    pub const FILENAME: &str = "config.json";
}

/// X11 protocol constants
pub mod x11 {
    /// Source indication for _NET_ACTIVE_WINDOW (2 = pager/direct user action)
    pub const ACTIVE_WINDOW_SOURCE_PAGER: u32 = 2;

    /// ICCCM IconicState value for WM_CHANGE_STATE
    pub const ICONIC_STATE: u32 = 3;

    /// _NET_WM_DESKTOP value meaning "sticky, on all desktops"
    pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

    /// Size of a CARDINAL property value in bytes
    pub const CARDINAL_SIZE: usize = 4;
}
