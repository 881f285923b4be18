//! Represents an input event created by releasing several keys at once.
//!
//! A [`Chord`] is an immutable 5-bit bitmap: bit `i` is set if and only if
//! chord key `i` is (or was) held down. Chords compare as sets: a chord is a
//! sub-chord of another when its held keys are a strict subset of the
//! other's.

/// Number of physical chord keys the recognizer tracks. Don't set this above
/// eight; [`Chord`]'s bitmap is a `u8`.
pub const NUM_CHORD_KEYS: u8 = 5;

/// An immutable key combination, encoded as a bitmap over the five chord
/// keys. `Chord::invalid()` (equivalently `Chord::from(0)`) represents "no
/// keys held."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Chord(u8);

impl Chord {
    /// The invalid chord, with no keys held.
    pub const fn invalid() -> Self {
        Chord(0)
    }

    /// Creates a chord from its raw bitmap value. Bitmaps above
    /// `2^NUM_CHORD_KEYS - 1` collapse to the invalid chord.
    pub fn from_bits(bit_map: u8) -> Self {
        let max_chord = (1u8 << NUM_CHORD_KEYS) - 1;
        if bit_map > max_chord {
            Chord(0)
        } else {
            Chord(bit_map)
        }
    }

    /// Whether this chord holds down at least one key.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Whether chord key `key_index` is held down in this chord.
    pub fn uses_key(&self, key_index: u8) -> bool {
        if key_index >= NUM_CHORD_KEYS {
            return false;
        }
        let bit = 1u8 << key_index;
        (self.0 & bit) == bit
    }

    /// The chord this one becomes if `key_index` is additionally held down.
    /// Returns the invalid chord if `key_index` is out of range.
    pub fn with_key_held(&self, key_index: u8) -> Self {
        if key_index >= NUM_CHORD_KEYS {
            return Chord::invalid();
        }
        Chord::from_bits(self.0 | (1 << key_index))
    }

    /// The chord this one becomes if `key_index` is released. Returns the
    /// invalid chord if `key_index` is out of range.
    pub fn with_key_released(&self, key_index: u8) -> Self {
        if key_index >= NUM_CHORD_KEYS {
            return Chord::invalid();
        }
        Chord::from_bits(self.0 & !(1 << key_index))
    }

    /// Whether this chord only holds keys also held in `other`, and the two
    /// chords aren't equal.
    pub fn is_subchord_of(&self, other: &Chord) -> bool {
        self.is_valid() && self.0 != other.0 && (self.0 & other.0) == self.0
    }

    /// Whether `other` only holds keys also held in this chord, and the two
    /// chords aren't equal.
    pub fn is_superchord_of(&self, other: &Chord) -> bool {
        other.is_subchord_of(self)
    }

    /// The raw bitmap backing this chord.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// A debug string like `"#_#__"`, one character per chord key, `#` for
    /// held and `_` for unheld.
    pub fn display(&self) -> String {
        (0..NUM_CHORD_KEYS)
            .map(|i| if self.uses_key(i) { '#' } else { '_' })
            .collect()
    }
}

impl From<u8> for Chord {
    fn from(bits: u8) -> Self {
        Chord::from_bits(bits)
    }
}

impl PartialOrd for Chord {
    /// `Chord` orders as a subset/superset lattice, not a total order: `a <
    /// b` iff `a` is a strict sub-chord of `b`, `a <= b` iff `a`'s keys are
    /// all used by `b` (including equality). Two chords that neither contain
    /// the other compare as `None`.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;
        if self.0 == other.0 {
            Some(Ordering::Equal)
        } else if (self.0 & other.0) == self.0 {
            Some(Ordering::Less)
        } else if (self.0 & other.0) == other.0 {
            Some(Ordering::Greater)
        } else {
            None
        }
    }

    fn lt(&self, other: &Self) -> bool {
        self.is_subchord_of(other)
    }

    fn gt(&self, other: &Self) -> bool {
        self.is_superchord_of(other)
    }

    fn le(&self, other: &Self) -> bool {
        (self.0 & other.0) == self.0
    }

    fn ge(&self, other: &Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_chord_has_zero_bits() {
        assert_eq!(Chord::invalid().bits(), 0);
        assert!(!Chord::invalid().is_valid());
    }

    #[test]
    fn overflowing_bitmap_collapses_to_invalid() {
        assert_eq!(Chord::from_bits(0b1000000), Chord::invalid());
        assert_eq!(Chord::from_bits(32), Chord::invalid());
    }

    #[test]
    fn uses_key_reports_held_bits() {
        let c = Chord::from_bits(0b01010);
        assert!(c.uses_key(1));
        assert!(c.uses_key(3));
        assert!(!c.uses_key(0));
        assert!(!c.uses_key(4));
    }

    #[test]
    fn with_key_held_and_released_round_trips() {
        let c = Chord::from_bits(0b00100);
        for i in 0..NUM_CHORD_KEYS {
            if !c.uses_key(i) {
                assert_eq!(c.with_key_held(i).with_key_released(i), c);
            }
        }
    }

    #[test]
    fn with_key_held_is_idempotent_when_already_held() {
        let c = Chord::from_bits(0b00001);
        assert_eq!(c.with_key_held(0), c);
    }

    #[test]
    fn out_of_range_key_index_yields_invalid() {
        let c = Chord::from_bits(0b00001);
        assert_eq!(c.with_key_held(9), Chord::invalid());
        assert_eq!(c.with_key_released(9), Chord::invalid());
    }

    #[test]
    fn subchord_and_superchord_are_strict() {
        let a = Chord::from_bits(0b00011);
        let b = Chord::from_bits(0b00111);
        assert!(a.is_subchord_of(&b));
        assert!(b.is_superchord_of(&a));
        assert!(!a.is_subchord_of(&a));
        assert!(!b.is_subchord_of(&a));
    }

    #[test]
    fn ordering_matches_subset_semantics() {
        let a = Chord::from_bits(0b00001);
        let b = Chord::from_bits(0b00011);
        assert!(a < b);
        assert!(a <= b);
        assert!(b > a);
        assert!(b >= a);
        assert!(a != b);
        assert!(!(a > b));

        for bits_a in 0u8..=31 {
            for bits_b in 0u8..=31 {
                let ca = Chord::from_bits(bits_a);
                let cb = Chord::from_bits(bits_b);
                assert_eq!(ca <= cb, ca == cb || ca < cb);
                assert!(!(ca < cb) || (ca != cb && !(ca > cb)));
            }
        }
    }
}
