//! User settings, read once at startup from `~/.mouser/settings.ron`.
//!
//! Every field is optional. Example:
//!
//! ```ron
//! (
//!     start_hotkey: "ctrl+shift+f9",
//!     stop_hotkey: "ctrl+shift+f10",
//!     pick_confirm: "enter",
//!     pick_cancel: "escape",
//!     profiles: "/home/me/.mouser/profiles.ron",
//! )
//! ```

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    result,
    time::Duration,
};

use keymap::Combo;
use mouser_engine::{EngineOptions, PICK_SAMPLE_INTERVAL_MS};
use profiles::default_profiles_path;
use ron::{Options, extensions::Extensions};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Default settings location.
pub fn default_settings_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".mouser");
    p.push("settings.ron");
    p
}

/// Parsed settings. Absent fields fall back to engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Global combo that starts automation.
    pub start_hotkey: Option<String>,
    /// Global combo that stops automation.
    pub stop_hotkey: Option<String>,
    /// Combo that confirms a pick.
    pub pick_confirm: Option<String>,
    /// Combo that cancels a pick.
    pub pick_cancel: Option<String>,
    /// Pointer sampling cadence while picking, in milliseconds. Values below
    /// the 50ms floor are raised to it.
    pub pick_sample_ms: Option<u64>,
    /// Profile store location.
    pub profiles: Option<PathBuf>,
    /// File these settings came from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Read `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings_missing_using_defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::Settings {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };
        let mut settings = Self::parse(&text).map_err(|message| Error::Settings {
            path: path.to_path_buf(),
            message,
        })?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Parse RON text.
    pub fn parse(text: &str) -> result::Result<Self, String> {
        Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .from_str(text)
            .map_err(|e| e.to_string())
    }

    /// Engine options with every configured combo parsed.
    pub fn engine_options(&self) -> Result<EngineOptions> {
        let mut opts = EngineOptions::default();
        let combo = |raw: &Option<String>, slot: &mut Combo| -> Result<()> {
            if let Some(raw) = raw {
                *slot = Combo::parse(raw).map_err(|e| Error::Settings {
                    path: self.source.clone().unwrap_or_else(default_settings_path),
                    message: e.to_string(),
                })?;
            }
            Ok(())
        };
        combo(&self.start_hotkey, &mut opts.start_combo)?;
        combo(&self.stop_hotkey, &mut opts.stop_combo)?;
        combo(&self.pick_confirm, &mut opts.pick_confirm)?;
        combo(&self.pick_cancel, &mut opts.pick_cancel)?;
        if let Some(ms) = self.pick_sample_ms {
            opts.pick_sample_interval = Duration::from_millis(ms.max(PICK_SAMPLE_INTERVAL_MS));
        }
        Ok(opts)
    }

    /// Profile store location.
    pub fn profiles_path(&self) -> PathBuf {
        self.profiles.clone().unwrap_or_else(default_profiles_path)
    }
}
