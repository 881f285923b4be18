//! Sends a single key, or an entire buffered sequence, to the window that
//! was focused before the user started entering chord input.

use anyhow::{bail, Result};

use crate::charset::values::{self, CharValue};
use crate::output::buffer::Buffer;
use crate::output::modifiers::mod_string;
use crate::window::adapter::{Platform, Window};
use crate::window::focus::FocusControl;

/// The string representation of `value` the platform's key-synthesis
/// facility expects, or an error if `value` doesn't denote a sendable key.
pub fn key_sym_string(value: CharValue) -> Result<String> {
    if values::is_printable(value) {
        return Ok(format!("0x{value:x}"));
    }
    let name = match value {
        values::BACKSPACE => "BackSpace",
        values::ENTER => "Return",
        values::TAB => "Tab",
        values::UP => "Up",
        values::DOWN => "Down",
        values::LEFT => "Left",
        values::RIGHT => "Right",
        values::F1 => "F1",
        values::F2 => "F2",
        values::F3 => "F3",
        values::F4 => "F4",
        values::F5 => "F5",
        values::F6 => "F6",
        values::F7 => "F7",
        values::F8 => "F8",
        values::F9 => "F9",
        values::F10 => "F10",
        values::F11 => "F11",
        values::F12 => "F12",
        values::ESCAPE => "Escape",
        values::DELETE => "Delete",
        _ => bail!("character value {value:#x} has no key-sym representation"),
    };
    Ok(name.to_string())
}

/// Sends keys to whatever window is currently focused, focusing it first in
/// case it lost focus since it was last observed active.
pub struct Dispatcher {
    focus: FocusControl,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher { focus: FocusControl::new() }
    }

    /// Sends one key with `modifier_flags` to `target`.
    pub fn dispatch_key(&self, platform: &dyn Platform, target: Window, value: CharValue, modifier_flags: i32) {
        if self.focus.focus_window(platform, target) {
            match key_sym_string(value) {
                Ok(sym) => {
                    let key_string = format!("{}{sym}", mod_string(modifier_flags));
                    if let Err(err) = platform.send_synthetic_key(&key_string) {
                        log::warn!("failed to send key {key_string:?}: {err}");
                    }
                }
                Err(err) => log::warn!("skipping key: {err}"),
            }
        } else {
            log::warn!("failed to focus target window {target}; key dropped");
        }
    }

    /// Sends every value in `buffer` to `target` in order, using the
    /// buffer's modifier flags, then clears the buffer whether or not
    /// every key was sent successfully.
    pub fn dispatch_buffer(&self, platform: &dyn Platform, target: Window, buffer: &mut Buffer) {
        let focused_target = self.focus.focus_window(platform, target);
        if focused_target {
            let modifiers = mod_string(buffer.modifier_flags());
            for &value in buffer.text() {
                match key_sym_string(value) {
                    Ok(sym) => {
                        let key_string = format!("{modifiers}{sym}");
                        if let Err(err) = platform.send_synthetic_key(&key_string) {
                            log::warn!("failed to send key {key_string:?}: {err}");
                        }
                    }
                    Err(err) => log::warn!("skipping buffered key: {err}"),
                }
            }
        } else {
            log::warn!("failed to focus target window {target}; buffer dropped");
        }
        buffer.clear(true);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_ascii_is_hex_encoded() {
        assert_eq!(key_sym_string('A' as CharValue).unwrap(), "0x41");
    }

    #[test]
    fn semantic_tokens_map_to_fixed_names() {
        assert_eq!(key_sym_string(values::BACKSPACE).unwrap(), "BackSpace");
        assert_eq!(key_sym_string(values::F12).unwrap(), "F12");
        assert_eq!(key_sym_string(values::ESCAPE).unwrap(), "Escape");
    }

    #[test]
    fn unmapped_value_is_an_error() {
        assert!(key_sym_string(0x00).is_err());
    }
}
