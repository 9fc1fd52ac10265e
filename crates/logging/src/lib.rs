#![warn(missing_docs)]

//! Shared logging helpers and CLI argument definitions for the mouser workspace.
//!
//! Binaries flatten [`LogArgs`] into their CLI, then call [`init`] once at
//! startup. Filters are crate-scoped so dependency noise stays out of the
//! default output.

use std::{env, io};

use clap::Args;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt};

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, global = true, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, global = true, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "mouser_engine=trace,mouser=debug"
    #[arg(long, global = true)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// The filter spec these flags select.
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &["mouser", "mouser_engine", "keymap", "profiles", "logging"]
}

/// Build a filter directive string that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|t| format!("{t}={lvl}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Create an `EnvFilter` from a spec string.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

/// Install the process-wide subscriber: env filter plus compact fmt output
/// on stderr. Returns the spec in effect. A second call leaves the first
/// subscriber in place.
pub fn init(args: &LogArgs) -> String {
    let spec = args.spec();
    registry()
        .with(env_filter_from_spec(&spec))
        .with(fmt::layer().without_time().with_writer(io::stderr))
        .try_init()
        .ok();
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_spec_covers_every_crate() {
        let spec = level_spec_for("DEBUG");
        for c in our_crates() {
            assert!(spec.contains(&format!("{c}=debug")), "{spec}");
        }
    }

    #[test]
    fn explicit_filter_wins() {
        assert_eq!(
            compute_spec(true, false, Some("warn"), Some("mouser=trace")),
            "mouser=trace"
        );
        assert_eq!(compute_spec(true, false, None, None), level_spec_for("trace"));
        assert_eq!(compute_spec(false, true, None, None), level_spec_for("debug"));
        assert_eq!(compute_spec(false, false, Some("warn"), None), level_spec_for("warn"));
    }

    #[test]
    fn args_spec_matches_compute() {
        let args = LogArgs {
            log_level: Some("error".into()),
            ..LogArgs::default()
        };
        assert_eq!(args.spec(), level_spec_for("error"));
    }
}
