//! Top-level coordinator: wires chord-recognizer events to the character-set
//! registry, the output buffer, and the dispatcher, and runs the
//! key-binding-driven actions bound to non-chord keys.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use xkbcommon::xkb;

use crate::charset::registry::{CharSetKind, CharSetRegistry};
use crate::charset::values::{self, CharValue};
use crate::config::keybindings::Bindings;
use crate::output::buffer::Buffer;
use crate::output::dispatch::Dispatcher;
use crate::output::modifiers;
use crate::recognizer::ChordEvent;
use crate::window::adapter::{Platform, Window};

fn modifier_flag_for(value: CharValue) -> Option<i32> {
    match value {
        values::CTRL => Some(modifiers::CONTROL),
        values::ALT => Some(modifiers::ALT),
        values::SHIFT => Some(modifiers::SHIFT),
        values::SUPER => Some(modifiers::SUPER),
        _ => None,
    }
}

/// Owns every piece of mutable daemon state the recognizer's events drive:
/// the active character set, the output buffer, and the window dispatcher.
pub struct InputController {
    platform: Box<dyn Platform>,
    registry: CharSetRegistry,
    buffer: Buffer,
    dispatcher: Dispatcher,
    bindings: Bindings,
    immediate_mode: bool,
    minimized: bool,
    snap_to_bottom: bool,
    help_overlay: bool,
    keep_running: Arc<AtomicBool>,
}

impl InputController {
    pub fn new(
        platform: Box<dyn Platform>,
        registry: CharSetRegistry,
        bindings: Bindings,
        immediate_mode: bool,
        keep_running: Arc<AtomicBool>,
    ) -> Self {
        InputController {
            platform,
            registry,
            buffer: Buffer::new(),
            dispatcher: Dispatcher::new(),
            bindings,
            immediate_mode,
            minimized: false,
            snap_to_bottom: false,
            help_overlay: false,
            keep_running,
        }
    }

    /// The window that should receive dispatched output: whichever window
    /// currently holds focus. This daemon never takes focus for itself, so
    /// the window active right before a chord commits is still active when
    /// dispatch runs.
    fn target_window(&self) -> Option<Window> {
        self.platform.active_window()
    }

    fn dispatch_key(&mut self, value: CharValue, modifier_flags: i32) {
        match self.target_window() {
            Some(target) => self.dispatcher.dispatch_key(self.platform.as_ref(), target, value, modifier_flags),
            None => log::warn!("no active window to dispatch to; key dropped"),
        }
    }

    fn dispatch_buffer(&mut self) {
        match self.target_window() {
            Some(target) => self.dispatcher.dispatch_buffer(self.platform.as_ref(), target, &mut self.buffer),
            None => {
                log::warn!("no active window to dispatch to; buffer dropped");
                self.buffer.clear(true);
            }
        }
    }

    /// Seeds the output buffer from a restart-cached sequence, per the
    /// persisted-state rule: consumed once, before the event loop starts.
    pub fn restore_cached_buffer(&mut self, cached: Vec<CharValue>) {
        self.buffer = Buffer::from_cached(cached);
    }

    pub fn immediate_mode(&self) -> bool {
        self.immediate_mode
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Handles one event from the chord recognizer. No side effect on
    /// `SelectionChanged` beyond internal bookkeeping: redraw state has no
    /// externally visible effect for this daemon.
    pub fn handle_chord_event(&mut self, event: ChordEvent) {
        match event {
            ChordEvent::SelectionChanged(_) | ChordEvent::KeyReleased => {}
            ChordEvent::ChordCommitted(chord) => {
                if self.help_overlay {
                    self.help_overlay = false;
                    return;
                }
                self.commit_chord(chord);
            }
            ChordEvent::UnrelatedKeyPressed(key) => self.handle_unrelated_key(key),
        }
    }

    fn commit_chord(&mut self, chord: crate::chord::Chord) {
        let Some(value) = self.registry.active_cache().chord_character(chord, self.registry.shifted()) else {
            return;
        };
        if let Some(flag) = modifier_flag_for(value) {
            self.buffer.toggle_modifier(flag);
        } else if self.immediate_mode {
            let mods = self.buffer.modifier_flags();
            self.dispatch_key(value, mods);
        } else {
            self.buffer.append(value);
        }
    }

    fn handle_unrelated_key(&mut self, key: u32) {
        let Some(action) = self.resolve_action(key) else {
            return;
        };
        if self.help_overlay {
            self.help_overlay = false;
            return;
        }
        self.run_action(&action);
    }

    fn resolve_action(&self, key: u32) -> Option<String> {
        let bindings = self.bindings.read().expect("key-binding lock poisoned");
        bindings.iter().find_map(|(action, binding)| {
            let keysym = xkb::keysym_from_name(&binding.key, xkb::KEYSYM_NO_FLAGS);
            (keysym == key).then(|| action.clone())
        })
    }

    fn run_action(&mut self, action: &str) {
        match action {
            "select_main" => self.registry.set_active(CharSetKind::Main),
            "select_alt" => self.registry.set_active(CharSetKind::Alt),
            "select_special" => self.registry.set_active(CharSetKind::Special),
            "select_modifier" => self.registry.set_active(CharSetKind::Modifier),
            "select_next_set" => self.registry.select_next(),
            "toggle_shift" => self.registry.toggle_shift(),
            "backspace" => {
                if self.immediate_mode {
                    let mods = self.buffer.modifier_flags();
                    self.dispatch_key(values::BACKSPACE, mods);
                } else {
                    self.buffer.delete_last();
                }
            }
            "clear_all" => self.buffer.clear(true),
            "send_text" => {
                if self.immediate_mode {
                    let mods = self.buffer.modifier_flags();
                    self.dispatch_key(values::ENTER, mods);
                } else {
                    self.dispatch_buffer();
                }
            }
            "close_and_send" => {
                self.dispatch_buffer();
                self.keep_running.store(false, Ordering::SeqCst);
            }
            "close" => self.keep_running.store(false, Ordering::SeqCst),
            "toggle_immediate_mode" => {
                if !self.immediate_mode && !self.buffer.is_empty() {
                    self.dispatch_buffer();
                }
                self.immediate_mode = !self.immediate_mode;
            }
            "toggle_window_edge" => self.snap_to_bottom = !self.snap_to_bottom,
            "toggle_minimize" => self.minimized = !self.minimized,
            "show_help" => self.help_overlay = !self.help_overlay,
            other => log::debug!("unrecognized bound action {other:?}; ignoring"),
        }
    }
}

/// Registers `controller` as a recognizer listener, guarding against
/// re-entrant dispatch with a non-blocking borrow: an event that arrives
/// while a prior event's handler is still running is logged and dropped
/// rather than queued.
pub fn attach(controller: Rc<RefCell<InputController>>) -> impl FnMut(ChordEvent) {
    move |event| match controller.try_borrow_mut() {
        Ok(mut controller) => controller.handle_chord_event(event),
        Err(_) => log::debug!("dropped {event:?}: a handler is already running"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::cache::{CharPair, CharSetCache, CharSetEntry};
    use crate::chord::Chord;
    use crate::window::adapter::Platform;
    use anyhow::Result;
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct NullPlatform;

    impl Platform for NullPlatform {
        fn active_window(&self) -> Option<Window> {
            Some(1)
        }
        fn window_name(&self, _window: Window) -> String {
            String::new()
        }
        fn window_class(&self, _window: Window) -> String {
            String::new()
        }
        fn window_class_name(&self, _window: Window) -> String {
            String::new()
        }
        fn window_pid(&self, _window: Window) -> Option<i64> {
            None
        }
        fn window_children(&self, _window: Window) -> Vec<Window> {
            Vec::new()
        }
        fn window_ancestry(&self, _window: Window) -> Vec<Window> {
            Vec::new()
        }
        fn window_siblings(&self, _window: Window) -> Vec<Window> {
            Vec::new()
        }
        fn window_parent(&self, _window: Window) -> Option<Window> {
            None
        }
        fn is_active_window(&self, _window: Window) -> bool {
            true
        }
        fn activate_window(&self, _window: Window) {}
        fn current_desktop(&self) -> i64 {
            -1
        }
        fn set_current_desktop(&self, _desktop: i64) {}
        fn window_desktop(&self, _window: Window) -> i64 {
            -1
        }
        fn supports(&self, _feature: crate::window::adapter::NetFeature) -> bool {
            false
        }
        fn send_synthetic_key(&self, _key_string: &str) -> Result<()> {
            Ok(())
        }
    }

    fn single_entry_cache(ch: char) -> CharSetCache {
        CharSetCache::build(vec![CharSetEntry { pair: CharPair::new(ch as u32, None), explicit_chord: None, priority: 0 }]).0
    }

    fn modifier_cache() -> CharSetCache {
        CharSetCache::modifier_set()
    }

    fn test_controller(immediate_mode: bool) -> InputController {
        let registry = CharSetRegistry::new(single_entry_cache('a'), single_entry_cache('b'), single_entry_cache('c'));
        let bindings: Bindings = Arc::new(RwLock::new(HashMap::new()));
        InputController::new(
            Box::new(NullPlatform),
            registry,
            bindings,
            immediate_mode,
            Arc::new(AtomicBool::new(true)),
        )
    }

    #[test]
    fn committing_a_non_modifier_chord_appends_to_the_buffer_when_not_immediate() {
        let mut controller = test_controller(false);
        controller.handle_chord_event(ChordEvent::ChordCommitted(Chord::from_bits(1)));
        assert_eq!(controller.buffer().text().to_vec(), vec!['a' as CharValue]);
    }

    #[test]
    fn immediate_mode_never_lets_a_non_modifier_commit_touch_the_buffer() {
        let mut controller = test_controller(true);
        controller.handle_chord_event(ChordEvent::ChordCommitted(Chord::from_bits(1)));
        assert!(controller.buffer().is_empty());
    }

    #[test]
    fn committing_the_same_modifier_twice_leaves_flags_unchanged() {
        let mut registry_controller = test_controller(false);
        registry_controller.registry.set_active(CharSetKind::Modifier);
        registry_controller.registry = CharSetRegistry::new(modifier_cache(), modifier_cache(), modifier_cache());
        registry_controller.registry.set_active(CharSetKind::Modifier);
        let before = registry_controller.buffer.modifier_flags();
        registry_controller.handle_chord_event(ChordEvent::ChordCommitted(Chord::from_bits(1)));
        registry_controller.handle_chord_event(ChordEvent::ChordCommitted(Chord::from_bits(1)));
        assert_eq!(registry_controller.buffer.modifier_flags(), before);
    }

    #[test]
    fn help_overlay_swallows_the_next_chord_commit_instead_of_running_it() {
        let mut controller = test_controller(false);
        controller.help_overlay = true;
        controller.handle_chord_event(ChordEvent::ChordCommitted(Chord::from_bits(1)));
        assert!(controller.buffer().is_empty());
        assert!(!controller.help_overlay);
    }

    #[test]
    fn toggling_immediate_mode_on_flushes_a_nonempty_buffer_first() {
        let mut controller = test_controller(false);
        controller.buffer.append('a' as CharValue);
        controller.run_action("toggle_immediate_mode");
        assert!(controller.buffer().is_empty());
        assert!(controller.immediate_mode());
    }
}
