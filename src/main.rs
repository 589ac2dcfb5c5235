#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;
use x11rb::connection::Connection;

use taskdock::config::ConfigStore;
use taskdock::service::{BarGeometry, DockService};
use taskdock::types::WindowSnapshot;
use taskdock::window_system::{WindowSystem, X11WindowSystem};
use taskdock::constants;

/// Taskbar window-reconciliation daemon: polls the X11 window list, keeps a
/// filtered ordered view of other applications' windows, and shrinks windows
/// that would overlap the bar's reserved screen region. SIGUSR1 toggles the
/// bar's manual-hide state.
#[derive(Parser, Debug)]
#[command(name = "taskdock", version)]
struct Cli {
    /// Config file path (default: user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Height of the bar's reserved region in pixels
    #[arg(long, default_value_t = constants::bar::BAR_HEIGHT)]
    bar_height: f64,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = constants::timing::REFRESH_INTERVAL_MS)]
    interval_ms: u64,

    /// Start with the bar hidden
    #[arg(long)]
    hidden: bool,
}

/// Stand-in for the out-of-scope bar UI: report the new display list.
fn report_windows(visible: &[WindowSnapshot]) {
    info!(count = visible.len(), "visible windows updated");
    for win in visible {
        debug!(
            id = win.id,
            pid = win.pid,
            owner = %win.owner_name,
            title = %win.title,
            minimized = win.is_minimized,
            priority = win.order_priority,
            "window"
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let (conn, screen_num) = x11rb::connect(None)?;
    let screen = &conn.setup().roots[screen_num];
    let geometry = BarGeometry {
        screen_width: screen.width_in_pixels as f64,
        screen_height: screen.height_in_pixels as f64,
        bar_height: cli.bar_height,
    };
    info!(
        screen = screen_num,
        width = screen.width_in_pixels,
        height = screen.height_in_pixels,
        bar_height = cli.bar_height,
        "connected to x11"
    );

    let config = Arc::new(match cli.config {
        Some(path) => ConfigStore::open(path),
        None => ConfigStore::open_default(),
    });

    let system = Arc::new(X11WindowSystem::new(conn, screen_num)?);
    let mut service = DockService::new(
        Arc::clone(&system) as Arc<dyn WindowSystem>,
        Arc::clone(&config),
        geometry,
    );
    if cli.hidden {
        service.set_hidden(true);
    }

    // SIGUSR1 toggles manual hide (the tray/menu wiring lives outside the core)
    let hide_toggle = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&hide_toggle))?;

    let interval = Duration::from_millis(cli.interval_ms);
    let poll_slice = Duration::from_millis(50);
    let mut last_refresh: Option<Instant> = None;

    info!("taskdock running");
    loop {
        if hide_toggle.swap(false, Ordering::Relaxed) {
            let hidden = !service.is_hidden();
            service.set_hidden(hidden);
        }

        // Workspace switches refresh immediately; otherwise wait out the tick
        let workspace_changed = system.poll_workspace_change();
        let due = last_refresh.is_none_or(|t| t.elapsed() >= interval);
        if workspace_changed || due {
            if workspace_changed {
                debug!("workspace changed, refreshing");
            }
            if let Some(visible) = service.refresh() {
                report_windows(&visible);
            }
            last_refresh = Some(Instant::now());
        }

        std::thread::sleep(poll_slice);
    }
}
