use std::{fmt, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// The platform call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformOp {
    /// Moving the pointer.
    SetCursor,
    /// Issuing a primary-button click.
    Click,
    /// Synthesizing a keystroke.
    SendKey,
    /// Reading the pointer position.
    QueryCursor,
    /// Registering a global hotkey.
    RegisterHotkey,
}

impl fmt::Display for PlatformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SetCursor => "move pointer",
            Self::Click => "click",
            Self::SendKey => "send key",
            Self::QueryCursor => "read pointer position",
            Self::RegisterHotkey => "register hotkey",
        })
    }
}

/// Failure at the platform boundary (permissions revoked, display gone, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{op} failed: {message}")]
pub struct PlatformError {
    /// Which call failed.
    pub op: PlatformOp,
    /// Human-readable detail from the backend.
    pub message: String,
}

impl PlatformError {
    /// Build an error for `op` with a message.
    pub fn new(op: PlatformOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// Unified error type for the engine.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A submitted configuration was malformed. Raised before any state change.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A platform capability failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// One or more hotkey combos are owned by another process.
    #[error(
        "Unable to register {combos} hotkeys. Close conflicting apps and retry."
    )]
    HotkeyConflict {
        /// The combos involved, joined for display.
        combos: String,
    },

    /// The requested operation conflicts with the current run state.
    #[error("{0}")]
    Busy(&'static str),

    /// The engine has been shut down.
    #[error("Engine is shut down")]
    ShutDown,
}
