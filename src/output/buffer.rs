//! Caches chorded input until the input controller chooses to forward it to
//! the target window.

use crate::charset::values::CharValue;

/// Unless immediate mode is enabled, committed characters accumulate here
/// instead of being dispatched one at a time.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    text: Vec<CharValue>,
    modifier_flags: i32,
}

impl Buffer {
    pub fn new() -> Self {
        Buffer::default()
    }

    /// Restores a buffer from a previously cached sequence of values, for
    /// example the `cachedBuffer` persisted across a restart.
    pub fn from_cached(text: Vec<CharValue>) -> Self {
        Buffer { text, modifier_flags: 0 }
    }

    pub fn text(&self) -> &[CharValue] {
        &self.text
    }

    pub fn modifier_flags(&self) -> i32 {
        self.modifier_flags
    }

    pub fn append(&mut self, value: CharValue) {
        self.text.push(value);
    }

    pub fn delete_last(&mut self) {
        self.text.pop();
    }

    pub fn set_modifiers(&mut self, modifier_flags: i32) {
        self.modifier_flags = modifier_flags;
    }

    /// Flips `flag` in the modifier set, leaving every other bit untouched.
    pub fn toggle_modifier(&mut self, flag: i32) {
        self.modifier_flags ^= flag;
    }

    pub fn clear(&mut self, clear_modifiers: bool) {
        self.text.clear();
        if clear_modifiers {
            self.modifier_flags = 0;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
