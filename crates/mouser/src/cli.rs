//! Command-line interface definitions for mouser.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;
use mouser_engine::ConfigRequest;
use profiles::ProfileStore;

use crate::error::{Error, Result};

/// Command-line interface for the `mouser` binary.
#[derive(Parser, Debug)]
#[command(
    name = "mouser",
    about = "Mouse auto-clicker with pick mode and global hotkeys",
    version
)]
pub struct Cli {
    /// Logging controls shared across mouser binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Settings file (RON). Defaults to ~/.mouser/settings.ron
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Simulate the pointer and keyboard instead of driving the real ones
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print notifications as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start clicking now; the global hotkeys restart and stop the loop.
    Run(TargetArgs),
    /// Arm the global hotkeys with a configuration without starting.
    Watch(TargetArgs),
    /// Track the pointer until confirmed, then print the position.
    Pick(PickArgs),
    /// Print the current pointer position once.
    Capture,
    /// Manage saved profiles.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Show which key a name resolves to.
    Key {
        /// Key name as a user would type it, e.g. `Enter`, `f5`, `a`.
        name: String,
    },
}

/// Where and how to click.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Target horizontal coordinate (default 0)
    #[arg(long, allow_negative_numbers = true)]
    pub x: Option<f64>,

    /// Target vertical coordinate (default 0)
    #[arg(long, allow_negative_numbers = true)]
    pub y: Option<f64>,

    /// Milliseconds between clicks (minimum 10)
    #[arg(long, short = 'i', value_name = "MS")]
    pub interval: Option<f64>,

    /// Key to press after each click
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Start from a saved profile; other flags override its fields
    #[arg(long, short = 'p', value_name = "ID_OR_NAME")]
    pub profile: Option<String>,
}

impl TargetArgs {
    /// Build the engine request, layering flags over the named profile.
    pub fn request(&self, store: &ProfileStore) -> Result<ConfigRequest> {
        let mut req = ConfigRequest::default();
        if let Some(name) = &self.profile {
            let p = store
                .find(name)
                .ok_or_else(|| Error::ProfileNotFound(name.clone()))?;
            req.x = Some(f64::from(p.x));
            req.y = Some(f64::from(p.y));
            req.interval_ms = Some(p.interval_ms as f64);
            req.key = Some(p.key.clone());
        }
        if self.x.is_some() {
            req.x = self.x;
        }
        if self.y.is_some() {
            req.y = self.y;
        }
        if self.interval.is_some() {
            req.interval_ms = self.interval;
        }
        if self.key.is_some() {
            req.key.clone_from(&self.key);
        }
        Ok(req)
    }
}

/// Arguments for `pick`.
#[derive(Args, Debug, Clone)]
pub struct PickArgs {
    /// Save the picked position as a profile with this name
    #[arg(long, value_name = "NAME")]
    pub save: Option<String>,

    /// Interval stored with a saved profile
    #[arg(long, short = 'i', value_name = "MS")]
    pub interval: Option<f64>,

    /// Key stored with a saved profile
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Start clicking at the picked position
    #[arg(long)]
    pub run: bool,
}

/// Profile management.
#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List profiles, most recently saved first.
    List,
    /// Show one profile.
    Show {
        /// Profile id or name.
        id_or_name: String,
    },
    /// Create or update a profile by name.
    Save {
        /// Profile name (at most 40 characters).
        name: String,
        /// Configuration to store.
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Delete a profile.
    Delete {
        /// Profile id or name.
        id_or_name: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use mouser_engine::ClickConfig;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_profile_fields() {
        let mut store = ProfileStore::empty("unused.ron");
        store
            .upsert_at(Some("1-a"), "home", &ClickConfig::from_parts(5, 6, 200, "a"), 1)
            .expect("upsert");
        let args = TargetArgs {
            y: Some(60.0),
            key: Some("enter".into()),
            profile: Some("home".into()),
            ..TargetArgs::default()
        };
        let cfg = args.request(&store).expect("request").into_config().expect("config");
        assert_eq!((cfg.x(), cfg.y(), cfg.interval_ms(), cfg.key()), (5, 60, 200, "enter"));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let store = ProfileStore::empty("unused.ron");
        let args = TargetArgs {
            profile: Some("nope".into()),
            ..TargetArgs::default()
        };
        assert!(matches!(args.request(&store), Err(Error::ProfileNotFound(_))));
    }

    #[test]
    fn parses_run_with_negative_coordinates() {
        let cli = Cli::try_parse_from(["mouser", "--dry-run", "run", "--x", "-20", "--y", "40", "-i", "5"])
            .expect("parse");
        assert!(cli.dry_run);
        match cli.command {
            Commands::Run(t) => {
                assert_eq!((t.x, t.y, t.interval), (Some(-20.0), Some(40.0), Some(5.0)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
