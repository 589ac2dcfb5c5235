//! Platform seam for window enumeration and manipulation
//!
//! The core talks to the OS exclusively through the [`WindowSystem`] trait so
//! the reconciliation logic can be driven by a fake in tests. The production
//! implementation is X11/EWMH via `x11rb`.

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;
use crate::types::WindowRect;

/// One raw window record from OS enumeration, before provider filtering.
#[derive(Debug, Clone)]
pub struct RawWindow {
    pub id: u32,
    pub pid: i32,
    /// Human-readable owning application name
    pub owner_name: String,
    /// Window title; empty when the OS reported none
    pub title: String,
    /// 0 = normal application window; anything else is chrome the bar skips
    pub layer: i32,
    /// Viewable on the active workspace right now
    pub on_current_workspace: bool,
    pub bounds: Option<WindowRect>,
    /// Stable application identifier, when the OS exposes one
    pub app_key: Option<String>,
}

/// OS window queries and mutations the core depends on.
///
/// Query methods degrade to defaults on failure; mutation methods absorb OS
/// errors entirely (the next refresh cycle reconciles whatever actually
/// happened).
pub trait WindowSystem: Send + Sync {
    /// Enumerate every top-level window known to the OS.
    fn list_windows(&self) -> Result<Vec<RawWindow>>;

    /// Whether the window is currently minimized; false when unknown.
    fn is_window_minimized(&self, pid: i32, id: u32) -> bool;

    /// Set or clear the window's minimized state.
    fn set_minimized(&self, pid: i32, id: u32, minimized: bool);

    /// Raise the window to the top of the stacking order.
    fn raise(&self, pid: i32, id: u32);

    /// Make the window's application the active (frontmost) one, focusing
    /// the window, regardless of which application is currently active.
    fn activate(&self, pid: i32, id: u32);

    /// The window currently focused within the given application, if any.
    fn focused_window(&self, pid: i32) -> Option<u32>;

    /// Whether the given application is the active (frontmost) one.
    fn is_application_active(&self, pid: i32) -> bool;

    /// Request termination of the owning process. Does not wait.
    fn terminate_application(&self, pid: i32);

    /// Current frame of the window in screen coordinates.
    fn window_frame(&self, pid: i32, id: u32) -> Option<WindowRect>;

    /// Resize the window in place; position is untouched.
    fn resize_window(&self, pid: i32, id: u32, width: f64, height: f64);

    /// Our own process id, so the bar never lists itself.
    fn own_pid(&self) -> i32;
}

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub net_client_list: Atom,
    pub net_wm_pid: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub net_wm_desktop: Atom,
    pub net_current_desktop: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_normal: Atom,
    pub net_active_window: Atom,
    pub wm_change_state: Atom,
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .context(format!("Failed to intern {name} atom"))?
        .reply()
        .context(format!("Failed to get reply for {name} atom"))?
        .atom)
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        // Do all intern_atom roundtrips once at startup
        Ok(Self {
            net_client_list: intern(conn, "_NET_CLIENT_LIST")?,
            net_wm_pid: intern(conn, "_NET_WM_PID")?,
            net_wm_name: intern(conn, "_NET_WM_NAME")?,
            utf8_string: intern(conn, "UTF8_STRING")?,
            net_wm_desktop: intern(conn, "_NET_WM_DESKTOP")?,
            net_current_desktop: intern(conn, "_NET_CURRENT_DESKTOP")?,
            net_wm_state: intern(conn, "_NET_WM_STATE")?,
            net_wm_state_hidden: intern(conn, "_NET_WM_STATE_HIDDEN")?,
            net_wm_window_type: intern(conn, "_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_normal: intern(conn, "_NET_WM_WINDOW_TYPE_NORMAL")?,
            net_active_window: intern(conn, "_NET_ACTIVE_WINDOW")?,
            wm_change_state: intern(conn, "WM_CHANGE_STATE")?,
        })
    }
}

/// EWMH-based [`WindowSystem`] implementation.
pub struct X11WindowSystem {
    conn: RustConnection,
    root: Window,
    atoms: CachedAtoms,
    own_pid: i32,
}

impl X11WindowSystem {
    pub fn new(conn: RustConnection, screen_num: usize) -> Result<Self> {
        let root = conn.setup().roots[screen_num].root;
        let atoms = CachedAtoms::new(&conn)?;

        // Watch the root for _NET_CURRENT_DESKTOP changes so workspace
        // switches trigger an immediate refresh
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )
        .context("Failed to subscribe to root property changes")?;
        conn.flush().context("Failed to flush X11 connection")?;

        Ok(Self {
            conn,
            root,
            atoms,
            own_pid: std::process::id() as i32,
        })
    }

    /// Drain pending X events, reporting whether the active workspace changed.
    pub fn poll_workspace_change(&self) -> bool {
        let mut changed = false;
        while let Ok(Some(event)) = self.conn.poll_for_event() {
            if let Event::PropertyNotify(notify) = event
                && notify.atom == self.atoms.net_current_desktop
            {
                changed = true;
            }
        }
        changed
    }

    fn read_cardinal(&self, window: Window, atom: Atom) -> Result<Option<u32>> {
        let prop = self
            .conn
            .get_property(false, window, atom, AtomEnum::CARDINAL, 0, 1)
            .context("Failed to query CARDINAL property")?
            .reply()
            .context("Failed to get CARDINAL property reply")?;
        if prop.value.len() < x11::CARDINAL_SIZE {
            return Ok(None);
        }
        Ok(Some(u32::from_ne_bytes(prop.value[0..4].try_into()?)))
    }

    fn read_window_prop(&self, window: Window, atom: Atom) -> Result<Option<u32>> {
        let prop = self
            .conn
            .get_property(false, window, atom, AtomEnum::WINDOW, 0, 1)
            .context("Failed to query WINDOW property")?
            .reply()
            .context("Failed to get WINDOW property reply")?;
        if prop.value.len() < x11::CARDINAL_SIZE {
            return Ok(None);
        }
        Ok(Some(u32::from_ne_bytes(prop.value[0..4].try_into()?)))
    }

    fn read_atom_prop(&self, window: Window, atom: Atom) -> Result<Option<Atom>> {
        let prop = self
            .conn
            .get_property(false, window, atom, AtomEnum::ATOM, 0, 1)
            .context("Failed to query ATOM property")?
            .reply()
            .context("Failed to get ATOM property reply")?;
        if prop.value.len() < x11::CARDINAL_SIZE {
            return Ok(None);
        }
        Ok(Some(u32::from_ne_bytes(prop.value[0..4].try_into()?)))
    }

    /// Window title: _NET_WM_NAME (UTF-8), falling back to legacy WM_NAME.
    fn read_title(&self, window: Window) -> Result<String> {
        let prop = self
            .conn
            .get_property(false, window, self.atoms.net_wm_name, self.atoms.utf8_string, 0, 1024)
            .context("Failed to query _NET_WM_NAME")?
            .reply()
            .context("Failed to get _NET_WM_NAME reply")?;
        if !prop.value.is_empty() {
            return Ok(String::from_utf8_lossy(&prop.value).into_owned());
        }
        let prop = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::STRING, 0, 1024)
            .context("Failed to query WM_NAME")?
            .reply()
            .context("Failed to get WM_NAME reply")?;
        Ok(String::from_utf8_lossy(&prop.value).into_owned())
    }

    /// WM_CLASS as (instance, class). The class half is the application's
    /// display name; the instance half is stable across restarts and serves
    /// as the application key.
    fn read_wm_class(&self, window: Window) -> Result<Option<(String, String)>> {
        let prop = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)
            .context("Failed to query WM_CLASS")?
            .reply()
            .context("Failed to get WM_CLASS reply")?;
        if prop.value.is_empty() {
            return Ok(None);
        }
        let mut parts = prop.value.split(|&b| b == 0);
        let instance = String::from_utf8_lossy(parts.next().unwrap_or(&[])).into_owned();
        let class = String::from_utf8_lossy(parts.next().unwrap_or(&[])).into_owned();
        if instance.is_empty() && class.is_empty() {
            return Ok(None);
        }
        Ok(Some((instance, class)))
    }

    fn window_has_hidden_state(&self, window: Window) -> Result<bool> {
        let prop = self
            .conn
            .get_property(false, window, self.atoms.net_wm_state, AtomEnum::ATOM, 0, 1024)
            .context("Failed to query _NET_WM_STATE")?
            .reply()
            .context("Failed to get _NET_WM_STATE reply")?;
        Ok(prop
            .value32()
            .map(|mut states| states.any(|s| s == self.atoms.net_wm_state_hidden))
            .unwrap_or(false))
    }

    fn read_frame(&self, window: Window) -> Result<WindowRect> {
        let geom = self
            .conn
            .get_geometry(window)
            .context("Failed to query window geometry")?
            .reply()
            .context("Failed to get geometry reply")?;
        let translated = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)
            .context("Failed to translate window coordinates")?
            .reply()
            .context("Failed to get coordinate translation reply")?;
        Ok(WindowRect::new(
            translated.dst_x as f64,
            translated.dst_y as f64,
            geom.width as f64,
            geom.height as f64,
        ))
    }

    /// One raw record for a client-list window. `None` when a mandatory
    /// field (pid, owner name) cannot be read.
    fn read_raw_window(&self, window: Window, current_desktop: u32) -> Result<Option<RawWindow>> {
        let Some(pid) = self.read_cardinal(window, self.atoms.net_wm_pid)? else {
            return Ok(None);
        };
        let Some((instance, class)) = self.read_wm_class(window)? else {
            return Ok(None);
        };
        let owner_name = if class.is_empty() { instance.clone() } else { class };

        let title = self.read_title(window).unwrap_or_default();

        let window_type = self
            .read_atom_prop(window, self.atoms.net_wm_window_type)
            .unwrap_or(None);
        let layer = match window_type {
            None => 0,
            Some(t) if t == self.atoms.net_wm_window_type_normal => 0,
            Some(_) => 1,
        };

        let desktop = self
            .read_cardinal(window, self.atoms.net_wm_desktop)
            .unwrap_or(None)
            .unwrap_or(current_desktop);
        let hidden = self.window_has_hidden_state(window).unwrap_or(false);
        let on_current_workspace =
            (desktop == current_desktop || desktop == x11::ALL_DESKTOPS) && !hidden;

        let bounds = self.read_frame(window).ok();
        let app_key = if instance.is_empty() { None } else { Some(instance) };

        Ok(Some(RawWindow {
            id: window,
            pid: pid as i32,
            owner_name,
            title,
            layer,
            on_current_workspace,
            bounds,
            app_key,
        }))
    }

    fn send_root_message(&self, window: Window, type_: Atom, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window,
            type_,
            data: ClientMessageData::from(data),
        };
        self.conn
            .send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                &event,
            )
            .context("Failed to send client message to root")?;
        self.conn.flush().context("Failed to flush X11 connection")?;
        Ok(())
    }

    fn try_activate(&self, window: Window) -> Result<()> {
        self.send_root_message(
            window,
            self.atoms.net_active_window,
            [x11::ACTIVE_WINDOW_SOURCE_PAGER, x11rb::CURRENT_TIME, 0, 0, 0],
        )
    }

    fn try_raise(&self, window: Window) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .context(format!("Failed to raise window {window}"))?;
        self.conn.flush().context("Failed to flush X11 connection")?;
        Ok(())
    }

    /// Pid of the application owning the currently active window, if any.
    fn active_window_pid(&self) -> Result<Option<(u32, i32)>> {
        let Some(active) = self.read_window_prop(self.root, self.atoms.net_active_window)? else {
            return Ok(None);
        };
        if active == 0 {
            return Ok(None);
        }
        let Some(pid) = self.read_cardinal(active, self.atoms.net_wm_pid)? else {
            return Ok(None);
        };
        Ok(Some((active, pid as i32)))
    }
}

impl WindowSystem for X11WindowSystem {
    fn list_windows(&self) -> Result<Vec<RawWindow>> {
        let current_desktop = self
            .read_cardinal(self.root, self.atoms.net_current_desktop)?
            .unwrap_or(0);
        let prop = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms.net_client_list,
                AtomEnum::WINDOW,
                0,
                u32::MAX,
            )
            .context("Failed to query _NET_CLIENT_LIST")?
            .reply()
            .context("Failed to get _NET_CLIENT_LIST reply")?;
        let ids: Vec<u32> = prop
            .value32()
            .ok_or_else(|| anyhow::anyhow!("Invalid return from _NET_CLIENT_LIST"))?
            .collect();

        let mut windows = Vec::with_capacity(ids.len());
        for id in ids {
            // A window may vanish between the list query and the per-window
            // reads; skip it rather than failing the whole enumeration
            match self.read_raw_window(id, current_desktop) {
                Ok(Some(raw)) => windows.push(raw),
                Ok(None) => {}
                Err(e) => debug!(window = id, error = %e, "skipping unreadable window"),
            }
        }
        Ok(windows)
    }

    fn is_window_minimized(&self, _pid: i32, id: u32) -> bool {
        self.window_has_hidden_state(id).unwrap_or(false)
    }

    fn set_minimized(&self, _pid: i32, id: u32, minimized: bool) {
        let result = if minimized {
            self.send_root_message(id, self.atoms.wm_change_state, [x11::ICONIC_STATE, 0, 0, 0, 0])
        } else {
            self.conn
                .map_window(id)
                .context(format!("Failed to map window {id}"))
                .and_then(|_| self.conn.flush().context("Failed to flush X11 connection"))
                .map(|_| ())
        };
        if let Err(e) = result {
            debug!(window = id, minimized = minimized, error = %e, "set_minimized failed");
        }
    }

    fn raise(&self, _pid: i32, id: u32) {
        if let Err(e) = self.try_raise(id) {
            debug!(window = id, error = %e, "raise failed");
        }
    }

    fn activate(&self, _pid: i32, id: u32) {
        if let Err(e) = self.try_activate(id) {
            debug!(window = id, error = %e, "activate failed");
        }
    }

    fn focused_window(&self, pid: i32) -> Option<u32> {
        match self.active_window_pid() {
            Ok(Some((active, active_pid))) if active_pid == pid => Some(active),
            Ok(_) => None,
            Err(e) => {
                debug!(pid = pid, error = %e, "focused_window query failed");
                None
            }
        }
    }

    fn is_application_active(&self, pid: i32) -> bool {
        match self.active_window_pid() {
            Ok(Some((_, active_pid))) => active_pid == pid,
            Ok(None) => false,
            Err(e) => {
                debug!(pid = pid, error = %e, "active application query failed");
                false
            }
        }
    }

    fn terminate_application(&self, pid: i32) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            debug!(pid = pid, error = %e, "terminate failed");
        }
    }

    fn window_frame(&self, _pid: i32, id: u32) -> Option<WindowRect> {
        match self.read_frame(id) {
            Ok(rect) => Some(rect),
            Err(e) => {
                debug!(window = id, error = %e, "frame query failed");
                None
            }
        }
    }

    fn resize_window(&self, _pid: i32, id: u32, width: f64, height: f64) {
        let aux = ConfigureWindowAux::new()
            .width(width.round().max(1.0) as u32)
            .height(height.round().max(1.0) as u32);
        let result = self
            .conn
            .configure_window(id, &aux)
            .context(format!("Failed to resize window {id}"))
            .and_then(|_| self.conn.flush().context("Failed to flush X11 connection"));
        if let Err(e) = result {
            debug!(window = id, error = %e, "resize failed");
        }
    }

    fn own_pid(&self) -> i32 {
        self.own_pid
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted [`WindowSystem`] double used by provider/action/service tests.

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Mutations recorded by [`FakeWindowSystem`], in call order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        SetMinimized { id: u32, minimized: bool },
        Raise { id: u32 },
        Activate { id: u32 },
        Terminate { pid: i32 },
        Resize { id: u32, width: f64, height: f64 },
    }

    #[derive(Default)]
    pub struct FakeWindowSystem {
        pub windows: Vec<RawWindow>,
        pub minimized: Mutex<HashSet<u32>>,
        pub frames: Mutex<HashMap<u32, WindowRect>>,
        pub focused: Mutex<HashMap<i32, u32>>,
        pub active_pid: Mutex<Option<i32>>,
        pub calls: Mutex<Vec<Call>>,
        pub fail_enumeration: bool,
    }

    impl FakeWindowSystem {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_windows(windows: Vec<RawWindow>) -> Self {
            Self {
                windows,
                ..Self::default()
            }
        }

        pub fn recorded(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl WindowSystem for FakeWindowSystem {
        fn list_windows(&self) -> Result<Vec<RawWindow>> {
            if self.fail_enumeration {
                anyhow::bail!("enumeration failure");
            }
            Ok(self.windows.clone())
        }

        fn is_window_minimized(&self, _pid: i32, id: u32) -> bool {
            self.minimized.lock().unwrap().contains(&id)
        }

        fn set_minimized(&self, _pid: i32, id: u32, minimized: bool) {
            self.record(Call::SetMinimized { id, minimized });
        }

        fn raise(&self, _pid: i32, id: u32) {
            self.record(Call::Raise { id });
        }

        fn activate(&self, _pid: i32, id: u32) {
            self.record(Call::Activate { id });
        }

        fn focused_window(&self, pid: i32) -> Option<u32> {
            self.focused.lock().unwrap().get(&pid).copied()
        }

        fn is_application_active(&self, pid: i32) -> bool {
            *self.active_pid.lock().unwrap() == Some(pid)
        }

        fn terminate_application(&self, pid: i32) {
            self.record(Call::Terminate { pid });
        }

        fn window_frame(&self, _pid: i32, id: u32) -> Option<WindowRect> {
            self.frames.lock().unwrap().get(&id).copied()
        }

        fn resize_window(&self, _pid: i32, id: u32, width: f64, height: f64) {
            self.record(Call::Resize { id, width, height });
        }

        fn own_pid(&self) -> i32 {
            1
        }
    }

    /// Raw-window builder with sensible defaults for tests.
    pub fn raw_window(id: u32, pid: i32, owner: &str, title: &str) -> RawWindow {
        RawWindow {
            id,
            pid,
            owner_name: owner.to_string(),
            title: title.to_string(),
            layer: 0,
            on_current_workspace: true,
            bounds: None,
            app_key: Some(format!("key.{}", owner.to_lowercase())),
        }
    }
}
