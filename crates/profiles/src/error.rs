//! Error types for profile storage.

use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the profiles crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while editing or persisting profiles.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while saving.
    #[error("Write error at {}: {source}", path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Serializing the store failed.
    #[error("Unable to encode profiles: {0}")]
    Encode(#[from] ron::Error),

    /// A profile name was empty after trimming.
    #[error("Profile name is required")]
    EmptyName,

    /// No profile matched an id or name.
    #[error("No profile named or identified by '{0}'")]
    NotFound(String),
}
