//! Converts raw keyboard input events to chord input events.
//!
//! [`ChordRecognizer`] tracks which chord keys are held, distinguishes the
//! user's settled *selection* from the raw *held* bitmap, and pushes a single
//! tagged [`ChordEvent`] to every registered listener in registration order.

use std::time::{Duration, Instant};

use crate::chord::{Chord, NUM_CHORD_KEYS};

/// Milliseconds to wait after a partial release before assuming the user
/// meant to reduce the selection rather than release the rest of the chord
/// a moment late.
pub const SETTLE_MS: u64 = 300;

/// A single event the recognizer can report. Listeners pattern-match on this
/// instead of implementing a multi-method listener interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordEvent {
    /// The chord that would be entered if all keys were released right now
    /// has changed.
    SelectionChanged(Chord),
    /// All chord keys were released; this is the chord the user entered.
    ChordCommitted(Chord),
    /// A key that isn't one of the five chord keys was pressed.
    UnrelatedKeyPressed(u32),
    /// A key-up edge arrived that didn't change which chord keys are held.
    KeyReleased,
}

/// Translates a stream of raw key-down/key-up events into chord selection
/// updates and commits, tolerating non-simultaneous release of chord keys.
pub struct ChordRecognizer {
    held: Chord,
    selected: Chord,
    settle_deadline: Option<Instant>,
    listeners: Vec<Box<dyn FnMut(ChordEvent)>>,
}

impl Default for ChordRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordRecognizer {
    pub fn new() -> Self {
        ChordRecognizer {
            held: Chord::invalid(),
            selected: Chord::invalid(),
            settle_deadline: None,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener, notified in registration order.
    pub fn add_listener(&mut self, listener: impl FnMut(ChordEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, event: ChordEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    /// The chord that would commit if all chord keys were released now.
    pub fn selected(&self) -> Chord {
        self.selected
    }

    /// The exact bitmap of currently-held chord keys.
    pub fn held(&self) -> Chord {
        self.held
    }

    /// Call when chord key `index` (`0..NUM_CHORD_KEYS`) is pressed down.
    /// Key-repeat on an already-held key is a no-op (guarded by the
    /// `held != selected` test), so it never re-fires a selection change.
    pub fn chord_key_down(&mut self, index: u8) {
        self.held = self.held.with_key_held(index);
        if self.held != self.selected {
            self.selected = self.held;
            self.notify(ChordEvent::SelectionChanged(self.selected));
        }
    }

    /// Call for any key press that isn't one of the five chord keys.
    pub fn other_key_pressed(&mut self, key: u32) {
        self.notify(ChordEvent::UnrelatedKeyPressed(key));
    }

    /// Call on a key-up edge. `currently_down(i)` must report whether chord
    /// key `i` is still held; `now` is used to arm the settle timer.
    pub fn key_state_changed(&mut self, currently_down: impl Fn(u8) -> bool, now: Instant) {
        let mut updated = self.held;
        for i in 0..NUM_CHORD_KEYS {
            if self.held.uses_key(i) && !currently_down(i) {
                updated = updated.with_key_released(i);
            }
        }

        if updated == self.held {
            self.notify(ChordEvent::KeyReleased);
            return;
        }

        // A real release happened; cancel any pending settle timer and
        // recompute from the new held state.
        self.settle_deadline = None;
        self.held = updated;

        if !self.held.is_valid() {
            let committed = self.selected;
            self.notify(ChordEvent::ChordCommitted(committed));
            self.selected = Chord::invalid();
        } else {
            self.settle_deadline = Some(now + Duration::from_millis(SETTLE_MS));
        }
    }

    /// The instant the reactor should next wake this recognizer, if a
    /// settle timer is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.settle_deadline
    }

    /// Call when the settle timer the reactor armed for `next_deadline()`
    /// has elapsed. No-op if the timer was already cancelled by a later
    /// key-state change.
    pub fn fire_settle_timer(&mut self) {
        if self.settle_deadline.take().is_none() {
            return;
        }
        if self.held != self.selected {
            self.selected = self.held;
            self.notify(ChordEvent::SelectionChanged(self.selected));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (ChordRecognizer, Rc<RefCell<Vec<ChordEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut recognizer = ChordRecognizer::new();
        let sink = events.clone();
        recognizer.add_listener(move |event| sink.borrow_mut().push(event));
        (recognizer, events)
    }

    #[test]
    fn single_key_chord_selects_then_commits() {
        let (mut r, events) = recorder();
        let now = Instant::now();

        r.chord_key_down(0);
        r.key_state_changed(|_| false, now);

        assert_eq!(
            *events.borrow(),
            vec![
                ChordEvent::SelectionChanged(Chord::from_bits(0b00001)),
                ChordEvent::ChordCommitted(Chord::from_bits(0b00001)),
            ]
        );
        assert!(!r.held().is_valid());
        assert!(!r.selected().is_valid());
    }

    #[test]
    fn late_release_within_settle_window_still_commits_the_selection() {
        let (mut r, events) = recorder();
        let now = Instant::now();

        r.chord_key_down(0);
        r.chord_key_down(1);
        // Key 1 releases first; key 0 is still down.
        r.key_state_changed(|i| i != 1, now);
        // Settle timer armed, but the user finishes releasing before it
        // fires: key 0 goes up too, all keys now released.
        r.key_state_changed(|_| false, now);

        assert_eq!(
            *events.borrow(),
            vec![
                ChordEvent::SelectionChanged(Chord::from_bits(0b00001)),
                ChordEvent::SelectionChanged(Chord::from_bits(0b00011)),
                ChordEvent::ChordCommitted(Chord::from_bits(0b00011)),
            ]
        );
    }

    #[test]
    fn genuine_pause_after_partial_release_reduces_the_selection() {
        let (mut r, events) = recorder();
        let now = Instant::now();

        r.chord_key_down(0);
        r.chord_key_down(1);
        r.key_state_changed(|i| i != 1, now);
        assert!(r.next_deadline().is_some());

        // The user pauses past the settle window instead of releasing key 0.
        r.fire_settle_timer();

        assert_eq!(
            *events.borrow(),
            vec![
                ChordEvent::SelectionChanged(Chord::from_bits(0b00001)),
                ChordEvent::SelectionChanged(Chord::from_bits(0b00011)),
                ChordEvent::SelectionChanged(Chord::from_bits(0b00001)),
            ]
        );
        assert!(r.held().is_valid());
    }

    #[test]
    fn settle_timer_is_cancelled_by_a_later_key_state_change() {
        let (mut r, _events) = recorder();
        let now = Instant::now();

        r.chord_key_down(0);
        r.chord_key_down(1);
        r.key_state_changed(|i| i != 1, now);
        assert!(r.next_deadline().is_some());

        r.key_state_changed(|_| false, now);
        assert!(r.next_deadline().is_none());

        // Firing after cancellation must be a no-op.
        r.fire_settle_timer();
    }

    #[test]
    fn unrelated_key_presses_are_forwarded_in_registration_order() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut r = ChordRecognizer::new();
        let first = events.clone();
        let second = events.clone();
        r.add_listener(move |e| first.borrow_mut().push((1, e)));
        r.add_listener(move |e| second.borrow_mut().push((2, e)));

        r.other_key_pressed(42);

        let recorded = events.borrow();
        assert_eq!(recorded[0], (1, ChordEvent::UnrelatedKeyPressed(42)));
        assert_eq!(recorded[1], (2, ChordEvent::UnrelatedKeyPressed(42)));
    }

    #[test]
    fn key_repeat_does_not_refire_selection_changed() {
        let (mut r, events) = recorder();
        r.chord_key_down(0);
        r.chord_key_down(0);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn commit_of_invalid_chord_never_fires() {
        let (mut r, events) = recorder();
        let now = Instant::now();
        // No keys ever pressed; a spurious key-state edge with nothing
        // tracked held must not fire a commit.
        r.key_state_changed(|_| false, now);
        assert!(events.borrow().iter().all(|e| !matches!(e, ChordEvent::ChordCommitted(_))));
    }
}
