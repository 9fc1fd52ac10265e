//! Platform seams the engine drives: input simulation and global hotkeys.

use async_trait::async_trait;
use keymap::{Combo, KeyId};

use crate::{Point, error::PlatformError};

/// Pointer and keyboard capability used by the executor and pick mode.
///
/// Each call may fail (permissions revoked, display disconnected). Calls
/// carry no timeout; a hung call stalls the tick that made it.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Move the pointer to `at`.
    async fn set_cursor(&self, at: Point) -> Result<(), PlatformError>;
    /// Primary-button click at the current pointer location.
    async fn click(&self) -> Result<(), PlatformError>;
    /// Press and release `key`.
    async fn send_key(&self, key: KeyId) -> Result<(), PlatformError>;
    /// Current pointer location.
    async fn cursor(&self) -> Result<Point, PlatformError>;
}

/// Invoked on every press of a registered combo. May run on any thread.
pub type HotkeyCallback = Box<dyn Fn() + Send + Sync>;

/// Minimal global hotkey API.
pub trait HotkeyApi: Send + Sync {
    /// Register `combo`. Returns false when the combo is unavailable
    /// (already owned elsewhere, or rejected by the OS).
    fn register(&self, combo: &Combo, on_press: HotkeyCallback) -> bool;
    /// Release `combo`. Unknown combos are ignored.
    fn unregister(&self, combo: &Combo);
}
