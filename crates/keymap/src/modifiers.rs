use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::KeyId;

/// Modifier keys usable in a hotkey [`crate::Combo`].
///
/// Declaration order is the canonical display order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Control.
    Control,
    /// Alt / Option.
    Alt,
    /// Shift.
    Shift,
    /// Command / Super / Windows.
    Super,
}

impl From<Modifier> for KeyId {
    fn from(m: Modifier) -> Self {
        match m {
            Modifier::Control => Self::LeftControl,
            Modifier::Alt => Self::LeftAlt,
            Modifier::Shift => Self::LeftShift,
            Modifier::Super => Self::LeftSuper,
        }
    }
}

impl TryFrom<KeyId> for Modifier {
    type Error = ();
    fn try_from(k: KeyId) -> Result<Self, Self::Error> {
        match k {
            KeyId::LeftControl => Ok(Self::Control),
            KeyId::LeftAlt => Ok(Self::Alt),
            KeyId::LeftShift => Ok(Self::Shift),
            KeyId::LeftSuper => Ok(Self::Super),
            _ => Err(()),
        }
    }
}

impl Modifier {
    /// Parse a modifier word, case-insensitively.
    ///
    /// Accepts `ctrl`/`control`, `alt`/`opt`/`option`, `shift`, and
    /// `cmd`/`command`/`super`/`meta`.
    pub fn from_word(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Some(Self::Control),
            "alt" | "opt" | "option" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            "cmd" | "command" | "super" | "meta" => Some(Self::Super),
            _ => None,
        }
    }

    /// Canonical word for this modifier.
    pub fn to_word(self) -> &'static str {
        KeyId::from(self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_words() {
        assert_eq!(Modifier::from_word("CTRL"), Some(Modifier::Control));
        assert_eq!(Modifier::from_word("option"), Some(Modifier::Alt));
        assert_eq!(Modifier::from_word("meta"), Some(Modifier::Super));
        assert_eq!(Modifier::from_word("hyper"), None);
        assert_eq!(Modifier::Super.to_word(), "cmd");
    }

    #[test]
    fn key_conversions() {
        for m in [
            Modifier::Control,
            Modifier::Alt,
            Modifier::Shift,
            Modifier::Super,
        ] {
            let k = KeyId::from(m);
            assert!(k.is_modifier());
            assert_eq!(Modifier::try_from(k), Ok(m));
        }
        assert_eq!(Modifier::try_from(KeyId::Enter), Err(()));
    }
}
