//! Defines the four modifier key flags applied to dispatched output.

/// A single modifier bit. Values are combined with bitwise OR into an `i32`
/// flag set stored on [`super::buffer::Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierFlag {
    Control = 0b0001,
    Alt = 0b0010,
    Shift = 0b0100,
    Super = 0b1000,
}

pub const CONTROL: i32 = ModifierFlag::Control as i32;
pub const ALT: i32 = ModifierFlag::Alt as i32;
pub const SHIFT: i32 = ModifierFlag::Shift as i32;
pub const SUPER: i32 = ModifierFlag::Super as i32;

/// Builds the string representation of a modifier flag set, in the fixed
/// order control, alt, shift, super, regardless of which bits are set.
pub fn mod_string(modifier_flags: i32) -> String {
    let mut out = String::new();
    for (flag, name) in [(CONTROL, "control+"), (ALT, "alt+"), (SHIFT, "shift+"), (SUPER, "super+")] {
        if modifier_flags & flag != 0 {
            out.push_str(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flags_yield_empty_string() {
        assert_eq!(mod_string(0), "");
    }

    #[test]
    fn single_flag_is_its_own_name() {
        assert_eq!(mod_string(CONTROL), "control+");
        assert_eq!(mod_string(SUPER), "super+");
    }

    #[test]
    fn combined_flags_follow_fixed_order_regardless_of_bit_order() {
        assert_eq!(mod_string(SHIFT | CONTROL), "control+shift+");
        assert_eq!(mod_string(SUPER | ALT | CONTROL | SHIFT), "control+alt+shift+super+");
    }
}
