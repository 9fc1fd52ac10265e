use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{KeyId, Modifier, names};

/// Errors produced by [`Combo::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseComboError {
    /// The input was empty or had an empty `+` component.
    #[error("empty component in hotkey combo `{0}`")]
    Empty(String),
    /// A leading component was not a modifier word.
    #[error("unknown modifier `{0}`")]
    Modifier(String),
    /// The final component named no key.
    #[error("unknown key `{0}`")]
    Key(String),
    /// The final component was itself a modifier key.
    #[error("`{0}` is a modifier and cannot end a hotkey combo")]
    ModifierAsKey(String),
}

/// A global hotkey chord: a set of modifiers plus one non-modifier key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Combo {
    /// Modifiers held for this combo.
    pub modifiers: BTreeSet<Modifier>,
    /// The key that triggers the combo.
    pub key: KeyId,
}

impl Combo {
    /// Build a combo from parts.
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: KeyId) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            key,
        }
    }

    /// A bare key with no modifiers (e.g. `enter` while picking).
    pub fn key_only(key: KeyId) -> Self {
        Self {
            modifiers: BTreeSet::new(),
            key,
        }
    }

    /// Parse a combo of the form `ctrl+shift+f9`.
    ///
    /// - Case-insensitive for modifiers and the key.
    /// - Components are separated by `+`; the last one is the key, resolved
    ///   with [`crate::resolve`].
    /// - The key may not itself be a modifier (`ctrl+shift` is rejected).
    pub fn parse(s: &str) -> Result<Self, ParseComboError> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key_raw = parts.pop().unwrap_or_default();
        if key_raw.is_empty() {
            return Err(ParseComboError::Empty(s.to_string()));
        }
        let key = names::resolve(key_raw).ok_or_else(|| ParseComboError::Key(key_raw.into()))?;
        if key.is_modifier() {
            return Err(ParseComboError::ModifierAsKey(key_raw.into()));
        }

        let mut modifiers = BTreeSet::new();
        for m in parts {
            if m.is_empty() {
                return Err(ParseComboError::Empty(s.to_string()));
            }
            let parsed = Modifier::from_word(m).ok_or_else(|| ParseComboError::Modifier(m.into()))?;
            modifiers.insert(parsed);
        }
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.to_word())?;
        }
        f.write_str(self.key.name())
    }
}

impl FromStr for Combo {
    type Err = ParseComboError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Combo {
    type Error = ParseComboError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Combo> for String {
    fn from(c: Combo) -> Self {
        c.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_modifiers() {
        let c = Combo::parse("shift+CTRL+F9").expect("parse");
        assert!(c.modifiers.contains(&Modifier::Shift));
        assert!(c.modifiers.contains(&Modifier::Control));
        assert_eq!(c.key, KeyId::F9);
        assert_eq!(c.to_string(), "ctrl+shift+f9");
    }

    #[test]
    fn bare_keys() {
        assert_eq!(
            Combo::parse("Enter").expect("parse"),
            Combo::key_only(KeyId::Enter)
        );
        assert_eq!(Combo::parse(" esc ").expect("parse").to_string(), "escape");
    }

    #[test]
    fn duplicate_modifiers_collapse() {
        let c = Combo::parse("cmd+super+k").expect("parse");
        assert_eq!(c.modifiers.len(), 1);
        assert_eq!(c.to_string(), "cmd+k");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            Combo::parse(""),
            Err(ParseComboError::Empty(String::new()))
        );
        assert_eq!(
            Combo::parse("ctrl++a"),
            Err(ParseComboError::Empty("ctrl++a".into()))
        );
        assert_eq!(
            Combo::parse("hyper+a"),
            Err(ParseComboError::Modifier("hyper".into()))
        );
        assert_eq!(
            Combo::parse("ctrl+f13"),
            Err(ParseComboError::Key("f13".into()))
        );
        assert_eq!(
            Combo::parse("ctrl+shift"),
            Err(ParseComboError::ModifierAsKey("shift".into()))
        );
    }

    #[test]
    fn serde_as_string() {
        let c = Combo::new([Modifier::Alt, Modifier::Control], KeyId::S);
        let json = serde_json::to_string(&c).expect("serialize");
        assert_eq!(json, "\"ctrl+alt+s\"");
        let back: Combo = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, c);
    }
}
