//! Error handling for the mouser binary.

use std::{io, path::PathBuf, result};

use mouser_engine::PickEndReason;
use thiserror::Error;

/// Convenient result type for mouser operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can end a mouser command.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapper for standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Errors surfaced by the engine.
    #[error("{0}")]
    Engine(#[from] mouser_engine::Error),
    /// Profile storage errors.
    #[error("{0}")]
    Profiles(#[from] profiles::Error),
    /// The settings file exists but could not be used.
    #[error("Settings error at {}: {message}", path.display())]
    Settings {
        /// Settings file.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },
    /// No profile matched the given id or name.
    #[error("No profile named or identified by '{0}'")]
    ProfileNotFound(String),
    /// A pick session ended without a position.
    #[error("Pick ended without a position ({0:?})")]
    PickEnded(PickEndReason),
    /// Ctrl-C arrived before the command finished.
    #[error("Interrupted")]
    Interrupted,
    /// The input backend could not be started.
    #[cfg_attr(
        not(feature = "desktop"),
        expect(dead_code, reason = "only the desktop backend can fail to start")
    )]
    #[error("Backend error: {0}")]
    Backend(String),
}
