use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::names;

/// Raised when text does not name any [`KeyId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key `{0}`")]
pub struct UnknownKey(pub String);

// Single source for variants and their canonical names. `name()` and
// `ALL` are generated from this list so the two never drift.
macro_rules! define_keys {
    ( $( $variant:ident => $name:literal, )* ) => {
        /// A platform-neutral key identity.
        ///
        /// Backends translate these into their own keycodes; the engine never
        /// sees platform codes.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum KeyId {
            $(
                #[doc = concat!("The `", $name, "` key.")]
                $variant,
            )*
        }

        impl KeyId {
            /// Every key, in declaration order.
            pub const ALL: &'static [Self] = &[ $( Self::$variant, )* ];

            /// Canonical lowercase name, accepted back by [`crate::resolve`].
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }
        }
    };
}

define_keys! {
    A => "a", B => "b", C => "c", D => "d", E => "e", F => "f", G => "g",
    H => "h", I => "i", J => "j", K => "k", L => "l", M => "m", N => "n",
    O => "o", P => "p", Q => "q", R => "r", S => "s", T => "t", U => "u",
    V => "v", W => "w", X => "x", Y => "y", Z => "z",
    F1 => "f1", F2 => "f2", F3 => "f3", F4 => "f4", F5 => "f5", F6 => "f6",
    F7 => "f7", F8 => "f8", F9 => "f9", F10 => "f10", F11 => "f11", F12 => "f12",
    Enter => "enter",
    Escape => "escape",
    Space => "space",
    Tab => "tab",
    LeftShift => "shift",
    LeftControl => "ctrl",
    LeftAlt => "alt",
    LeftSuper => "cmd",
    Up => "up",
    Down => "down",
    Left => "left",
    Right => "right",
    Backspace => "backspace",
    Delete => "delete",
    Num0 => "0", Num1 => "1", Num2 => "2", Num3 => "3", Num4 => "4",
    Num5 => "5", Num6 => "6", Num7 => "7", Num8 => "8", Num9 => "9",
}

/// Letter keys indexed by `c - 'A'`.
pub(crate) const LETTERS: [KeyId; 26] = [
    KeyId::A,
    KeyId::B,
    KeyId::C,
    KeyId::D,
    KeyId::E,
    KeyId::F,
    KeyId::G,
    KeyId::H,
    KeyId::I,
    KeyId::J,
    KeyId::K,
    KeyId::L,
    KeyId::M,
    KeyId::N,
    KeyId::O,
    KeyId::P,
    KeyId::Q,
    KeyId::R,
    KeyId::S,
    KeyId::T,
    KeyId::U,
    KeyId::V,
    KeyId::W,
    KeyId::X,
    KeyId::Y,
    KeyId::Z,
];

/// Function keys indexed by `n - 1`.
pub(crate) const FUNCTION_KEYS: [KeyId; 12] = [
    KeyId::F1,
    KeyId::F2,
    KeyId::F3,
    KeyId::F4,
    KeyId::F5,
    KeyId::F6,
    KeyId::F7,
    KeyId::F8,
    KeyId::F9,
    KeyId::F10,
    KeyId::F11,
    KeyId::F12,
];

/// Digit keys indexed by their value.
pub(crate) const DIGITS: [KeyId; 10] = [
    KeyId::Num0,
    KeyId::Num1,
    KeyId::Num2,
    KeyId::Num3,
    KeyId::Num4,
    KeyId::Num5,
    KeyId::Num6,
    KeyId::Num7,
    KeyId::Num8,
    KeyId::Num9,
];

impl KeyId {
    /// True for shift/ctrl/alt/cmd, which cannot end a [`crate::Combo`].
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::LeftShift | Self::LeftControl | Self::LeftAlt | Self::LeftSuper
        )
    }

    /// The printable character for letter and digit keys (lowercase letters).
    pub fn as_char(self) -> Option<char> {
        if let Some(i) = LETTERS.iter().position(|k| *k == self) {
            return Some(char::from(b'a' + i as u8));
        }
        DIGITS
            .iter()
            .position(|k| *k == self)
            .map(|i| char::from(b'0' + i as u8))
    }

    /// Function key number (1..=12) for `F1`..`F12`.
    pub fn function_number(self) -> Option<u8> {
        FUNCTION_KEYS
            .iter()
            .position(|k| *k == self)
            .map(|i| i as u8 + 1)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<KeyId> for &'static str {
    fn from(k: KeyId) -> Self {
        k.name()
    }
}

impl TryFrom<String> for KeyId {
    type Error = UnknownKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        names::resolve(&s).ok_or(UnknownKey(s))
    }
}

impl TryFrom<&str> for KeyId {
    type Error = UnknownKey;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        names::resolve(s).ok_or_else(|| UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_resolves_back() {
        for k in KeyId::ALL {
            assert_eq!(names::resolve(k.name()), Some(*k), "name {}", k.name());
        }
    }

    #[test]
    fn chars_and_function_numbers() {
        assert_eq!(KeyId::Q.as_char(), Some('q'));
        assert_eq!(KeyId::Num7.as_char(), Some('7'));
        assert_eq!(KeyId::Enter.as_char(), None);
        assert_eq!(KeyId::F11.function_number(), Some(11));
        assert_eq!(KeyId::A.function_number(), None);
    }

    #[test]
    fn modifiers_are_flagged() {
        assert!(KeyId::LeftControl.is_modifier());
        assert!(KeyId::LeftSuper.is_modifier());
        assert!(!KeyId::Enter.is_modifier());
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&KeyId::F12).expect("serialize");
        assert_eq!(json, "\"f12\"");
        let back: KeyId = serde_json::from_str("\"ESC\"").expect("deserialize alias");
        assert_eq!(back, KeyId::Escape);
        assert!(serde_json::from_str::<KeyId>("\"hyper\"").is_err());
    }
}
