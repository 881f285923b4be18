//! Loads character-set definitions (`main.json`, `alt.json`, `special.json`)
//! into the entries [`crate::charset::cache::CharSetCache::build`] expects.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::charset::cache::{CharPair, CharSetEntry};
use crate::charset::values::CharValue;
use crate::chord::Chord;

/// One entry of a character-set file: a primary character (and optional
/// shifted variant), either as a literal character or a named token
/// (`"backspace"`, `"f1"`, ...), plus optional chord-assignment hints.
#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    #[serde(rename = "char")]
    primary: String,
    shifted: Option<String>,
    /// Explicit chord bitmap request, e.g. `0b00011`. Demoted to priority
    /// assignment on collision.
    chord: Option<u8>,
    #[serde(default)]
    priority: i32,
}

fn token_to_value(token: &str) -> Result<CharValue> {
    use crate::charset::values::*;
    if let Some(rest) = token.strip_prefix("0x") {
        return u32::from_str_radix(rest, 16)
            .with_context(|| format!("invalid hex character token {token:?}"));
    }
    let value = match token {
        "backspace" => BACKSPACE,
        "enter" => ENTER,
        "tab" => TAB,
        "up" => UP,
        "down" => DOWN,
        "left" => LEFT,
        "right" => RIGHT,
        "escape" => ESCAPE,
        "delete" => DELETE,
        "outline" => OUTLINE,
        "fill" => FILL,
        "wide_outline" => WIDE_OUTLINE,
        "wide_fill" => WIDE_FILL,
        "f1" => F1,
        "f2" => F2,
        "f3" => F3,
        "f4" => F4,
        "f5" => F5,
        "f6" => F6,
        "f7" => F7,
        "f8" => F8,
        "f9" => F9,
        "f10" => F10,
        "f11" => F11,
        "f12" => F12,
        _ => {
            let mut chars = token.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                anyhow::bail!("character-set entry {token:?} is not a single character or a known token name");
            };
            c as CharValue
        }
    };
    Ok(value)
}

/// Parses a character-set file's JSON body into build-ready entries.
/// Malformed individual entries are logged and skipped rather than failing
/// the whole file, matching the "missing/invalid configuration entry" rule.
pub fn parse_charset(content: &str) -> Result<Vec<CharSetEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(content).context("failed to parse character-set JSON")?;
    let mut entries = Vec::with_capacity(raw.len());
    for (index, item) in raw.into_iter().enumerate() {
        let primary = match token_to_value(&item.primary) {
            Ok(v) => v,
            Err(err) => {
                log::warn!("character-set entry {index}: {err}; skipping");
                continue;
            }
        };
        let shifted = match item.shifted.as_deref().map(token_to_value) {
            Some(Ok(v)) => Some(v),
            Some(Err(err)) => {
                log::warn!("character-set entry {index}: invalid shifted value ({err}); using primary");
                None
            }
            None => None,
        };
        entries.push(CharSetEntry {
            pair: CharPair::new(primary, shifted),
            explicit_chord: item.chord.map(Chord::from_bits),
            priority: item.priority,
        });
    }
    Ok(entries)
}

/// Reads and parses a character-set JSON file from disk.
pub fn load_charset(path: &Path) -> Result<Vec<CharSetEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read character-set file at {path:?}"))?;
    parse_charset(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_and_named_characters() {
        let json = r#"[
            {"char": "a"},
            {"char": "a", "shifted": "A"},
            {"char": "backspace"},
            {"char": "0x41"}
        ]"#;
        let entries = parse_charset(json).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].pair.primary, 'a' as CharValue);
        assert_eq!(entries[1].pair.shifted, 'A' as CharValue);
        assert_eq!(entries[2].pair.primary, crate::charset::values::BACKSPACE);
        assert_eq!(entries[3].pair.primary, 0x41);
    }

    #[test]
    fn explicit_chord_and_priority_are_carried_through() {
        let json = r#"[{"char": "a", "chord": 3, "priority": 9}]"#;
        let entries = parse_charset(json).unwrap();
        assert_eq!(entries[0].explicit_chord, Some(Chord::from_bits(3)));
        assert_eq!(entries[0].priority, 9);
    }

    #[test]
    fn unrecognized_entry_is_skipped_not_fatal() {
        let json = r#"[{"char": "toolong"}, {"char": "b"}]"#;
        let entries = parse_charset(json).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pair.primary, 'b' as CharValue);
    }
}
