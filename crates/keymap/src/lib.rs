//! keymap: key identities, the user-facing key name resolver, and hotkey combos.
//!
//! - `KeyId`: the closed set of keys the clicker can synthesize or bind.
//! - `resolve`: maps free text typed by a user ("a", "F5", "enter") to a
//!   `KeyId`, or `None` when the text names no key.
//! - `Modifier` and `Combo`: chords such as `ctrl+shift+f9` used for global
//!   hotkeys.
//!
//! Nothing in this crate touches the platform; it is pure data and parsing.

mod key;
pub use key::{KeyId, UnknownKey};

mod names;
pub use names::resolve;

mod modifiers;
pub use modifiers::Modifier;

mod combo;
pub use combo::{Combo, ParseComboError};
