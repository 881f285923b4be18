//! Represents a character set where each character has a corresponding
//! chord value.

use super::values::{is_wide, CharValue, CHORD_CONVENIENCE_ORDER, NUM_CHORDS};
use crate::chord::Chord;

/// A character and its shifted variant. `shifted` equals `primary` when the
/// entry didn't specify a separate shifted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharPair {
    pub primary: CharValue,
    pub shifted: CharValue,
}

impl CharPair {
    pub fn new(primary: CharValue, shifted: Option<CharValue>) -> Self {
        CharPair {
            primary,
            shifted: shifted.unwrap_or(primary),
        }
    }
}

/// One source entry before chord assignment: a character pair, plus either
/// an explicit chord request or a priority used for automatic assignment.
#[derive(Debug, Clone)]
pub struct CharSetEntry {
    pub pair: CharPair,
    pub explicit_chord: Option<Chord>,
    pub priority: i32,
}

/// An immutable, ordered character↔chord mapping built from configuration.
///
/// Invariants: every chord in `pair_of`'s image is valid and unique;
/// `chord_of[pair.primary] == chord_of[pair.shifted]` for every pair; the
/// set never grows after construction.
#[derive(Debug, Clone, Default)]
pub struct CharSetCache {
    ordered: Vec<CharPair>,
    chord_of: std::collections::HashMap<CharValue, Chord>,
    pair_of: [Option<CharPair>; 32],
    wide_draw_count: usize,
}

impl CharSetCache {
    /// Builds a cache from entries in source order, truncating at 31
    /// entries and assigning chords by the construction algorithm: explicit
    /// requests first (log+demote on collision), then unresolved entries by
    /// descending priority walked across the fixed convenience ordering.
    ///
    /// Returns the cache plus the number of entries dropped for exceeding
    /// the 31-entry limit, for the caller to log.
    pub fn build(entries: Vec<CharSetEntry>) -> (Self, usize) {
        let mut truncated = 0;
        let mut entries = entries;
        if entries.len() > NUM_CHORDS {
            truncated = entries.len() - NUM_CHORDS;
            entries.truncate(NUM_CHORDS);
        }

        let mut cache = CharSetCache::default();
        // index into `entries` of every entry still needing an automatic
        // assignment, paired with its priority, built in source order.
        let mut unresolved: Vec<(usize, i32)> = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            let mut priority = entry.priority;
            if let Some(chord) = entry.explicit_chord {
                if cache.assign(entry.pair, chord) {
                    priority = -1;
                } else {
                    log::warn!(
                        "chord collision for character {:#x}: requested chord already \
                         reserved, falling back to priority assignment",
                        entry.pair.primary
                    );
                }
            }
            if priority >= 0 {
                unresolved.push((idx, priority));
            }
        }

        // Stable sort by descending priority; `sort_by_key` is stable, and
        // negating preserves source order among ties.
        unresolved.sort_by_key(|&(_, priority)| -priority);

        let mut convenience_idx = 0usize;
        for (idx, _) in unresolved {
            while convenience_idx < NUM_CHORDS
                && cache.pair_of[CHORD_CONVENIENCE_ORDER[convenience_idx] as usize].is_some()
            {
                convenience_idx += 1;
            }
            if convenience_idx >= NUM_CHORDS {
                log::warn!("ran out of convenience-ordered chords to assign");
                break;
            }
            let chord = Chord::from_bits(CHORD_CONVENIENCE_ORDER[convenience_idx]);
            cache.assign(entries[idx].pair, chord);
            convenience_idx += 1;
        }

        for entry in &entries {
            if is_wide(entry.pair.primary) || is_wide(entry.pair.shifted) {
                cache.wide_draw_count += 1;
            }
            cache.ordered.push(entry.pair);
        }

        (cache, truncated)
    }

    /// Builds the hard-coded modifier set: shift, ctrl, alt, super, each
    /// mapped to the first four convenience chords, shifted == primary.
    pub fn modifier_set() -> Self {
        use super::values::{ALT, CTRL, SHIFT, SUPER};
        let entries: Vec<CharSetEntry> = [SHIFT, CTRL, ALT, SUPER]
            .into_iter()
            .map(|v| CharSetEntry {
                pair: CharPair::new(v, None),
                explicit_chord: None,
                priority: 0,
            })
            .collect();
        CharSetCache::build(entries).0
    }

    fn assign(&mut self, pair: CharPair, chord: Chord) -> bool {
        if !chord.is_valid() || pair.primary == 0 || self.pair_of[chord.bits() as usize].is_some()
        {
            return false;
        }
        self.chord_of.insert(pair.primary, chord);
        self.chord_of.insert(pair.shifted, chord);
        self.pair_of[chord.bits() as usize] = Some(pair);
        true
    }

    /// The character at `index` in source order, or `None` if out of range.
    pub fn char_at_index(&self, index: usize, shifted: bool) -> Option<CharValue> {
        self.ordered.get(index).map(|p| if shifted { p.shifted } else { p.primary })
    }

    /// The character a chord should produce, or `None` if unused.
    pub fn chord_character(&self, chord: Chord, shifted: bool) -> Option<CharValue> {
        self.pair_of[chord.bits() as usize].map(|p| if shifted { p.shifted } else { p.primary })
    }

    /// The chord used to type `character`, or the invalid chord if the
    /// character isn't in this set.
    pub fn character_chord(&self, character: CharValue) -> Chord {
        self.chord_of.get(&character).copied().unwrap_or_else(Chord::invalid)
    }

    /// Total number of character↔chord mappings stored.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Number of characters in this set that need double display width.
    pub fn wide_draw_count(&self) -> usize {
        self.wide_draw_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(primary: CharValue, priority: i32) -> CharSetEntry {
        CharSetEntry {
            pair: CharPair::new(primary, None),
            explicit_chord: None,
            priority,
        }
    }

    #[test]
    fn explicit_chord_is_honored_over_priority() {
        let a = CharSetEntry {
            pair: CharPair::new('a' as CharValue, None),
            explicit_chord: Some(Chord::from_bits(0b11111)),
            priority: 9,
        };
        let b = entry('b' as CharValue, 9);
        let (cache, dropped) = CharSetCache::build(vec![a, b]);
        assert_eq!(dropped, 0);
        assert_eq!(cache.character_chord('a' as CharValue), Chord::from_bits(0b11111));
        assert_eq!(cache.character_chord('b' as CharValue), Chord::from_bits(0b00001));
    }

    #[test]
    fn priority_breaks_ties_by_descending_value() {
        let entries = vec![entry('x' as CharValue, 1), entry('y' as CharValue, 5), entry('z' as CharValue, 3)];
        let (cache, _) = CharSetCache::build(entries);
        assert_eq!(cache.character_chord('y' as CharValue), Chord::from_bits(0b00001));
        assert_eq!(cache.character_chord('z' as CharValue), Chord::from_bits(0b00010));
        assert_eq!(cache.character_chord('x' as CharValue), Chord::from_bits(0b00100));
    }

    #[test]
    fn ties_keep_source_order() {
        let entries = vec![entry('a' as CharValue, 1), entry('b' as CharValue, 1), entry('c' as CharValue, 1)];
        let (cache, _) = CharSetCache::build(entries);
        assert_eq!(cache.character_chord('a' as CharValue), Chord::from_bits(0b00001));
        assert_eq!(cache.character_chord('b' as CharValue), Chord::from_bits(0b00010));
        assert_eq!(cache.character_chord('c' as CharValue), Chord::from_bits(0b00100));
    }

    #[test]
    fn colliding_explicit_chords_demote_to_priority() {
        let a = CharSetEntry {
            pair: CharPair::new('a' as CharValue, None),
            explicit_chord: Some(Chord::from_bits(0b00001)),
            priority: 0,
        };
        let b = CharSetEntry {
            pair: CharPair::new('b' as CharValue, None),
            explicit_chord: Some(Chord::from_bits(0b00001)),
            priority: 0,
        };
        let (cache, _) = CharSetCache::build(vec![a, b]);
        assert_eq!(cache.character_chord('a' as CharValue), Chord::from_bits(0b00001));
        // 'b' falls through to auto-assignment, skipping the taken slot.
        assert_eq!(cache.character_chord('b' as CharValue), Chord::from_bits(0b00010));
    }

    #[test]
    fn overflowing_entries_are_truncated() {
        let entries: Vec<CharSetEntry> = (0..40u32).map(|i| entry(0x20 + i, 0)).collect();
        let (cache, dropped) = CharSetCache::build(entries);
        assert_eq!(dropped, 9);
        assert_eq!(cache.len(), 31);
    }

    #[test]
    fn bijection_holds_between_pair_of_and_chord_of() {
        let entries = vec![entry('a' as CharValue, 3), entry('b' as CharValue, 1)];
        let (cache, _) = CharSetCache::build(entries);
        for pair in cache.ordered.iter() {
            let chord = cache.character_chord(pair.primary);
            assert_eq!(cache.chord_character(chord, false), Some(pair.primary));
        }
    }

    #[test]
    fn shared_shifted_value_maps_to_the_same_chord() {
        let e = CharSetEntry {
            pair: CharPair::new('a' as CharValue, Some('A' as CharValue)),
            explicit_chord: None,
            priority: 0,
        };
        let (cache, _) = CharSetCache::build(vec![e]);
        let chord = cache.character_chord('a' as CharValue);
        assert_eq!(cache.character_chord('A' as CharValue), chord);
    }

    #[test]
    fn modifier_set_maps_shift_ctrl_alt_super_to_first_four_chords() {
        use super::super::values::{ALT, CTRL, SHIFT, SUPER};
        let mods = CharSetCache::modifier_set();
        assert_eq!(mods.character_chord(SHIFT), Chord::from_bits(0b00001));
        assert_eq!(mods.character_chord(CTRL), Chord::from_bits(0b00010));
        assert_eq!(mods.character_chord(ALT), Chord::from_bits(0b00100));
        assert_eq!(mods.character_chord(SUPER), Chord::from_bits(0b01000));
    }
}
