//! Finds and manipulates windows through the X Window System, and injects
//! synthetic key events into whichever window currently has focus.
//!
//! Window property lookups and activation follow the EWMH conventions
//! (`_NET_ACTIVE_WINDOW`, `_NET_CURRENT_DESKTOP`, `_NET_WM_DESKTOP`,
//! `_NET_WM_PID`); key synthesis uses the XTEST extension instead of
//! shelling out to an external tool.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use x11rb::connection::Connection;
pub use x11rb::protocol::xproto::Window;
use x11rb::protocol::xproto::{
    Atom, ChangeWindowAttributesAux, ClientMessageData, ClientMessageEvent, ConfigureWindowAux,
    ConnectionExt as _, EventMask, GetPropertyReply, MapState, StackMode,
};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;

// X protocol event-type codes used by XTEST's fake_input; not exposed as
// named constants by x11rb.
const KEY_PRESS_EVENT: u8 = 2;
const KEY_RELEASE_EVENT: u8 = 3;
const CLIENT_MESSAGE_EVENT: u8 = 33;

/// EWMH feature names the adapter probes for and may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetFeature {
    ActiveWindow,
    CurrentDesktop,
    WindowDesktop,
    WindowPid,
}

impl NetFeature {
    fn atom_name(self) -> &'static str {
        match self {
            NetFeature::ActiveWindow => "_NET_ACTIVE_WINDOW",
            NetFeature::CurrentDesktop => "_NET_CURRENT_DESKTOP",
            NetFeature::WindowDesktop => "_NET_WM_DESKTOP",
            NetFeature::WindowPid => "_NET_WM_PID",
        }
    }
}

/// Window query, activation, and synthetic key injection, abstracted away
/// from the concrete windowing system so the rest of the crate never
/// touches X11 types directly.
pub trait Platform {
    fn active_window(&self) -> Option<Window>;
    fn window_name(&self, window: Window) -> String;
    fn window_class(&self, window: Window) -> String;
    fn window_class_name(&self, window: Window) -> String;
    fn window_pid(&self, window: Window) -> Option<i64>;
    fn window_children(&self, parent: Window) -> Vec<Window>;
    fn window_ancestry(&self, window: Window) -> Vec<Window>;
    fn window_siblings(&self, window: Window) -> Vec<Window>;
    fn window_parent(&self, window: Window) -> Option<Window>;
    fn is_active_window(&self, window: Window) -> bool;
    fn activate_window(&self, window: Window);
    fn current_desktop(&self) -> i64;
    fn set_current_desktop(&self, index: i64);
    fn window_desktop(&self, window: Window) -> i64;
    fn supports(&self, feature: NetFeature) -> bool;
    /// Injects one synthetic key event for `key_string`, optionally prefixed
    /// by `"control+alt+shift+super+"` subsets in that order.
    fn send_synthetic_key(&self, key_string: &str) -> Result<()>;
}

/// X11-backed [`Platform`] implementation, grounded in EWMH window queries
/// and XTEST key injection.
pub struct X11Platform {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
    feature_atoms: HashMap<NetFeature, Atom>,
    supported_cache: std::cell::RefCell<HashMap<NetFeature, bool>>,
    /// A keycode reserved for remapping to whichever keysym doesn't already
    /// have one, mirroring the "unused keycode" trick xdotool uses.
    scratch_keycode: u8,
}

impl X11Platform {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11 display")?;
        let root = conn.setup().roots[screen_num].root;
        let max_keycode = conn.setup().max_keycode;

        let mut feature_atoms = HashMap::new();
        for feature in [
            NetFeature::ActiveWindow,
            NetFeature::CurrentDesktop,
            NetFeature::WindowDesktop,
            NetFeature::WindowPid,
        ] {
            let atom = conn.intern_atom(false, feature.atom_name().as_bytes())?.reply()?.atom;
            feature_atoms.insert(feature, atom);
        }

        Ok(X11Platform {
            conn,
            screen_num,
            root,
            feature_atoms,
            supported_cache: std::cell::RefCell::new(HashMap::new()),
            scratch_keycode: max_keycode,
        })
    }

    fn get_property(&self, window: Window, property: Atom) -> Result<GetPropertyReply> {
        Ok(self
            .conn
            .get_property(false, window, property, x11rb::protocol::xproto::AtomEnum::ANY, 0, u32::MAX)?
            .reply()?)
    }

    fn property_u32(&self, window: Window, feature: NetFeature) -> Option<u32> {
        let atom = *self.feature_atoms.get(&feature)?;
        let reply = self.get_property(window, atom).ok()?;
        reply.value32()?.next()
    }
}

impl Platform for X11Platform {
    fn active_window(&self) -> Option<Window> {
        self.property_u32(self.root, NetFeature::ActiveWindow).map(|w| w as Window)
    }

    fn window_name(&self, window: Window) -> String {
        let atom = self.conn.intern_atom(false, b"_NET_WM_NAME").ok().and_then(|c| c.reply().ok());
        if let Some(reply) = atom.and_then(|a| self.get_property(window, a.atom).ok()) {
            if let Ok(name) = String::from_utf8(reply.value) {
                if !name.is_empty() {
                    return name;
                }
            }
        }
        String::new()
    }

    fn window_class(&self, window: Window) -> String {
        self.class_hint(window).map(|(instance, _)| instance).unwrap_or_default()
    }

    fn window_class_name(&self, window: Window) -> String {
        self.class_hint(window).map(|(_, class)| class).unwrap_or_default()
    }

    fn window_pid(&self, window: Window) -> Option<i64> {
        self.property_u32(window, NetFeature::WindowPid).map(|v| v as i64)
    }

    fn window_children(&self, parent: Window) -> Vec<Window> {
        self.conn
            .query_tree(parent)
            .and_then(|c| c.reply())
            .map(|reply| reply.children)
            .unwrap_or_default()
    }

    fn window_ancestry(&self, window: Window) -> Vec<Window> {
        fn search(platform: &X11Platform, parents: &mut Vec<Window>, target: Window) -> bool {
            let last = *parents.last().unwrap();
            for child in platform.window_children(last) {
                parents.push(child);
                if child == target || search(platform, parents, target) {
                    return true;
                }
                parents.pop();
            }
            false
        }

        if window == self.root {
            return vec![self.root];
        }
        let mut ancestry = vec![self.root];
        if search(self, &mut ancestry, window) {
            ancestry
        } else {
            Vec::new()
        }
    }

    fn window_siblings(&self, window: Window) -> Vec<Window> {
        match self.window_parent(window) {
            Some(parent) => self.window_children(parent),
            None => Vec::new(),
        }
    }

    fn window_parent(&self, window: Window) -> Option<Window> {
        let ancestry = self.window_ancestry(window);
        if ancestry.len() < 2 {
            None
        } else {
            Some(ancestry[ancestry.len() - 2])
        }
    }

    fn is_active_window(&self, window: Window) -> bool {
        let attr = match self.conn.get_window_attributes(window).and_then(|c| c.reply()) {
            Ok(attr) => attr,
            Err(_) => return false,
        };
        if attr.map_state != MapState::VIEWABLE {
            return false;
        }
        let geometry = match self.conn.get_geometry(window).and_then(|c| c.reply()) {
            Ok(g) => g,
            Err(_) => return false,
        };
        if geometry.width == 0 || geometry.height == 0 {
            return false;
        }
        if self.current_desktop() != self.window_desktop(window) {
            return false;
        }
        if self.active_window() != Some(window) {
            return false;
        }
        let siblings = self.window_siblings(window);
        match siblings.iter().position(|&w| w == window) {
            Some(idx) => idx == siblings.len() - 1,
            None => false,
        }
    }

    fn activate_window(&self, window: Window) {
        if self.supports(NetFeature::CurrentDesktop) && self.supports(NetFeature::WindowDesktop) {
            self.set_current_desktop(self.window_desktop(window));
        }

        for ancestor in self.window_ancestry(window) {
            let siblings = self.window_siblings(ancestor);
            if siblings.len() < 2 {
                continue;
            }
            let was_override_redirect = self
                .conn
                .get_window_attributes(ancestor)
                .and_then(|c| c.reply())
                .map(|a| a.override_redirect)
                .unwrap_or(false);
            if !was_override_redirect {
                let _ = self.conn.change_window_attributes(
                    ancestor,
                    &ChangeWindowAttributesAux::new().override_redirect(1),
                );
            }
            let _ = self
                .conn
                .configure_window(ancestor, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE));
            let _ = self.conn.flush();
            if !was_override_redirect {
                let _ = self.conn.change_window_attributes(
                    ancestor,
                    &ChangeWindowAttributesAux::new().override_redirect(0),
                );
            }
        }

        if let Some(&active_window_atom) = self.feature_atoms.get(&NetFeature::ActiveWindow) {
            let event = ClientMessageEvent {
                response_type: CLIENT_MESSAGE_EVENT,
                format: 32,
                sequence: 0,
                window,
                type_: active_window_atom,
                data: ClientMessageData::from([2u32, CURRENT_TIME, 0, 0, 0]),
            };
            let _ = self.conn.send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                event,
            );
            let _ = self.conn.flush();
        }
    }

    fn current_desktop(&self) -> i64 {
        if !self.supports(NetFeature::CurrentDesktop) {
            return -1;
        }
        self.property_u32(self.root, NetFeature::CurrentDesktop).map(|v| v as i64).unwrap_or(-1)
    }

    fn set_current_desktop(&self, index: i64) {
        if !self.supports(NetFeature::CurrentDesktop) || index == self.current_desktop() {
            return;
        }
        if let Some(&atom) = self.feature_atoms.get(&NetFeature::CurrentDesktop) {
            let event = ClientMessageEvent {
                response_type: CLIENT_MESSAGE_EVENT,
                format: 32,
                sequence: 0,
                window: self.root,
                type_: atom,
                data: ClientMessageData::from([index as u32, CURRENT_TIME, 0, 0, 0]),
            };
            let _ = self.conn.send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
                event,
            );
            let _ = self.conn.flush();
        }
    }

    fn window_desktop(&self, window: Window) -> i64 {
        if !self.supports(NetFeature::WindowDesktop) {
            return -1;
        }
        self.property_u32(window, NetFeature::WindowDesktop).map(|v| v as i64).unwrap_or(-1)
    }

    fn supports(&self, feature: NetFeature) -> bool {
        if let Some(&cached) = self.supported_cache.borrow().get(&feature) {
            return cached;
        }
        let supported = self.query_supports(feature);
        self.supported_cache.borrow_mut().insert(feature, supported);
        supported
    }

    fn send_synthetic_key(&self, key_string: &str) -> Result<()> {
        let (modifier_keycodes, base) = self.split_modifiers(key_string)?;
        let keysym = xkbcommon::xkb::keysym_from_name(base, xkbcommon::xkb::KEYSYM_NO_FLAGS);
        if keysym == xkbcommon::xkb::keysyms::KEY_NoSymbol {
            return Err(anyhow!("unrecognized key name {base:?}"));
        }
        let keycode = self.resolve_keycode(keysym)?;

        for &mod_code in &modifier_keycodes {
            self.conn.xtest_fake_input(
                KEY_PRESS_EVENT,
                mod_code,
                CURRENT_TIME,
                self.root,
                0,
                0,
                0,
            )?;
        }
        self.conn.xtest_fake_input(
            KEY_PRESS_EVENT,
            keycode,
            CURRENT_TIME,
            self.root,
            0,
            0,
            0,
        )?;
        self.conn.xtest_fake_input(
            KEY_RELEASE_EVENT,
            keycode,
            CURRENT_TIME,
            self.root,
            0,
            0,
            0,
        )?;
        for &mod_code in modifier_keycodes.iter().rev() {
            self.conn.xtest_fake_input(
                KEY_RELEASE_EVENT,
                mod_code,
                CURRENT_TIME,
                self.root,
                0,
                0,
                0,
            )?;
        }
        self.conn.flush()?;
        Ok(())
    }
}

impl X11Platform {
    fn query_supports(&self, feature: NetFeature) -> bool {
        let Ok(supported_atom) = self.conn.intern_atom(false, b"_NET_SUPPORTED") else {
            return false;
        };
        let Ok(supported_atom) = supported_atom.reply() else {
            return false;
        };
        let Ok(reply) = self.get_property(self.root, supported_atom.atom) else {
            return false;
        };
        let Some(values) = reply.value32() else {
            return false;
        };
        let needed = self.feature_atoms.get(&feature).copied();
        values.into_iter().any(|atom| Some(atom) == needed)
    }

    fn class_hint(&self, window: Window) -> Option<(String, String)> {
        let atom = self.conn.intern_atom(false, b"WM_CLASS").ok()?.reply().ok()?;
        let reply = self.get_property(window, atom.atom).ok()?;
        let raw = String::from_utf8_lossy(&reply.value);
        let mut parts = raw.split('\u{0}').filter(|s| !s.is_empty());
        let instance = parts.next()?.to_string();
        let class = parts.next().unwrap_or_default().to_string();
        Some((instance, class))
    }

    /// Maps modifier name prefixes (`"control+alt+"`, etc.) to X keycodes,
    /// returning the remaining key name.
    fn split_modifiers<'a>(&self, key_string: &'a str) -> Result<(Vec<u8>, &'a str)> {
        let mapping = self.conn.get_modifier_mapping()?.reply()?;
        let keycodes_per_modifier = mapping.keycodes_per_modifier() as usize;
        // Modifier mapping rows are Shift, Lock, Control, Mod1..Mod5 in that
        // order; Mod1 is conventionally Alt and Mod4 is conventionally Super.
        let row = |index: usize| -> u8 {
            mapping.keycodes[index * keycodes_per_modifier..][0]
        };
        let control_code = row(2);
        let alt_code = row(3);
        let shift_code = row(0);
        let super_code = row(6);

        let mut codes = Vec::new();
        let mut rest = key_string;
        loop {
            if let Some(stripped) = rest.strip_prefix("control+") {
                codes.push(control_code);
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("alt+") {
                codes.push(alt_code);
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("shift+") {
                codes.push(shift_code);
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("super+") {
                codes.push(super_code);
                rest = stripped;
            } else {
                break;
            }
        }
        Ok((codes, rest))
    }

    /// Finds an existing keycode mapped to `keysym`, or temporarily remaps
    /// the reserved scratch keycode to it.
    fn resolve_keycode(&self, keysym: u32) -> Result<u8> {
        let setup = self.conn.setup();
        let count = setup.max_keycode - setup.min_keycode + 1;
        let mapping = self.conn.get_keyboard_mapping(setup.min_keycode, count)?.reply()?;
        let per_keycode = mapping.keysyms_per_keycode as usize;
        for (offset, syms) in mapping.keysyms.chunks(per_keycode).enumerate() {
            if syms.contains(&keysym) {
                return Ok(setup.min_keycode + offset as u8);
            }
        }

        let keysyms = vec![keysym; per_keycode.max(1)];
        self.conn.change_keyboard_mapping(1, self.scratch_keycode, per_keycode as u8, &keysyms)?;
        self.conn.flush()?;
        Ok(self.scratch_keycode)
    }
}
