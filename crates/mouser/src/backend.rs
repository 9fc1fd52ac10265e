//! Backend selection.

use std::sync::Arc;

use mouser_engine::{HotkeyApi, Platform};
#[cfg(not(feature = "desktop"))]
use tracing::warn;
use tracing::info;

use crate::{console::ConsoleHotkeys, dryrun::DryRunPlatform, error::Result};

/// The platform seams handed to the engine, plus the console pieces when
/// hotkeys are typed on stdin.
pub struct Backend {
    /// Pointer and keyboard.
    pub platform: Arc<dyn Platform>,
    /// Hotkey registration.
    pub hotkeys: Arc<dyn HotkeyApi>,
    /// Set when combos are typed rather than pressed.
    pub console: Option<Arc<ConsoleHotkeys>>,
    /// Set when the pointer is simulated.
    pub pointer: Option<Arc<DryRunPlatform>>,
}

impl Backend {
    /// Pick the backend: simulated on request or when the binary was built
    /// without desktop support.
    pub fn select(dry_run: bool) -> Result<Self> {
        if dry_run {
            info!("backend: dry run");
            return Ok(Self::dry_run());
        }
        Self::desktop()
    }

    /// Simulated pointer and stdin hotkeys.
    pub fn dry_run() -> Self {
        let pointer = Arc::new(DryRunPlatform::new());
        let console = Arc::new(ConsoleHotkeys::new());
        Self {
            platform: pointer.clone(),
            hotkeys: console.clone(),
            console: Some(console),
            pointer: Some(pointer),
        }
    }

    /// Whether typed combos need a stdin reader.
    pub fn needs_console(&self) -> bool {
        self.console.is_some()
    }

    #[cfg(feature = "desktop")]
    /// Real pointer and OS-level hotkeys.
    fn desktop() -> Result<Self> {
        use crate::desktop::{DesktopHotkeys, DesktopPlatform};

        info!("backend: desktop");
        Ok(Self {
            platform: Arc::new(DesktopPlatform::spawn()?),
            hotkeys: Arc::new(DesktopHotkeys::spawn()?),
            console: None,
            pointer: None,
        })
    }

    #[cfg(not(feature = "desktop"))]
    /// Built without desktop support.
    fn desktop() -> Result<Self> {
        warn!("built without the `desktop` feature; falling back to dry run");
        Ok(Self::dry_run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_wires_console() {
        let b = Backend::select(true).expect("backend");
        assert!(b.needs_console());
        assert!(b.pointer.is_some());
    }
}
