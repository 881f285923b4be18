//! Defines all permitted character values and the fixed chord-convenience
//! ordering used to auto-assign chords to characters.

/// Either the value of a printable ISO 8859-1 character, or one of the
/// special tokens defined below.
pub type CharValue = u32;

// Arrows, outlines, whitespace, and filled areas:
pub const OUTLINE: CharValue = 0x1;
pub const FILL: CharValue = 0x2;
pub const BACKSPACE: CharValue = 0x3;
pub const ENTER: CharValue = 0x4;
pub const TAB: CharValue = 0x5;
pub const UP: CharValue = 0x6;
pub const DOWN: CharValue = 0x7;
pub const LEFT: CharValue = 0x8;
pub const RIGHT: CharValue = 0x9;

// Function keys:
pub const F1: CharValue = 0x80;
pub const F2: CharValue = 0x81;
pub const F3: CharValue = 0x82;
pub const F4: CharValue = 0x83;
pub const F5: CharValue = 0x84;
pub const F6: CharValue = 0x85;
pub const F7: CharValue = 0x86;
pub const F8: CharValue = 0x87;
pub const F9: CharValue = 0x88;
pub const F10: CharValue = 0x89;
pub const F11: CharValue = 0x8a;
pub const F12: CharValue = 0x8b;

// Double-wide glyphs and modifier tokens:
pub const CTRL: CharValue = 0x10;
pub const ALT: CharValue = 0x12;
pub const SHIFT: CharValue = 0x14;
pub const SUPER: CharValue = 0x16;
pub const ESCAPE: CharValue = 0x18;
pub const DELETE: CharValue = 0x1a;
pub const WIDE_FILL: CharValue = 0x1c;
pub const WIDE_OUTLINE: CharValue = 0x1e;

// Bounds for normal printable ASCII:
pub const NORMAL_PRINT_MIN: CharValue = 0x20;
pub const NORMAL_PRINT_MAX: CharValue = 0x7f;

// Bounds for extended Latin-1 printable characters:
pub const EXTRA_PRINT_MIN: CharValue = 0xa1;
pub const EXTRA_PRINT_MAX: CharValue = 0xff;

/// Whether `value` is a printable character (ASCII or Latin-1 extended) that
/// denotes itself rather than a semantic token.
pub fn is_printable(value: CharValue) -> bool {
    (NORMAL_PRINT_MIN..=NORMAL_PRINT_MAX).contains(&value) || (EXTRA_PRINT_MIN..EXTRA_PRINT_MAX).contains(&value)
}

/// Whether `value` needs twice the normal display width.
pub fn is_wide(value: CharValue) -> bool {
    (0x10..=0x1e).contains(&value)
}

/// Whether `value` represents a modifier token (ctrl, alt, shift, or
/// cmd/super) rather than a character to type or send.
pub fn is_modifier(value: CharValue) -> bool {
    matches!(value, CTRL | ALT | SHIFT | SUPER)
}

/// Maximum number of distinct chords a character set can assign (there are
/// exactly 31 nonzero 5-bit bitmaps).
pub const NUM_CHORDS: usize = 31;

/// The 31 valid chord bitmaps, ordered from easiest to hardest to type:
/// singles, adjacent pairs, gapped pairs, adjacent triples, gapped triples,
/// quads, then all five keys. Auto-assignment always walks this exact
/// order, so changing it changes which chords existing configs land on.
pub const CHORD_CONVENIENCE_ORDER: [u8; NUM_CHORDS] = [
    // Single key:
    0b00001, 0b00010, 0b00100, 0b01000, 0b10000,
    // Adjacent pairs:
    0b00011, 0b00110, 0b01100, 0b11000,
    // Gapped pairs:
    0b00101, 0b01010, 0b01001, 0b10100, 0b10010, 0b10001,
    // Adjacent triples:
    0b00111, 0b01110, 0b11100,
    // Gapped triples:
    0b01011, 0b01101, 0b10110, 0b10011, 0b11001, 0b11010, 0b10101,
    // Quads:
    0b01111, 0b10111, 0b11011, 0b11101, 0b11110,
    // All keys:
    0b11111,
];
