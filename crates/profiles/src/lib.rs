//! Saved click configurations ("profiles") for mouser.
//!
//! Profiles live in a single RON file. Loading is tolerant: bad entries
//! are normalized or dropped and a malformed file reads as empty, so the
//! store never blocks the clicker from starting.

mod error;
mod profile;
mod store;

pub use error::{Error, Result};
pub use profile::{MAX_NAME_CHARS, Profile};
pub use store::{ProfileStore, default_profiles_path};
