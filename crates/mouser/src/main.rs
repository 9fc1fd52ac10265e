#![warn(missing_docs)]

//! Entry point for the `mouser` auto-clicker.
//!
//! `mouser run --x 100 --y 200 -i 50 -k enter` clicks at (100, 200) every
//! 50ms and presses Enter after each click. The default global hotkeys
//! (ctrl+shift+f9 / ctrl+shift+f10) restart and stop the loop. `mouser pick`
//! tracks the pointer until Enter confirms a position. Build with
//! `--features desktop` to drive the real pointer; otherwise input is
//! simulated and combos are typed on stdin.

mod backend;
mod cli;
mod commands;
mod console;
#[cfg(feature = "desktop")]
mod desktop;
mod dryrun;
mod error;
mod presenter;
mod session;
mod settings;

use std::{process, time::Duration};

use clap::Parser;
use tokio::runtime::Builder;
use tracing::{debug, error};

use crate::{
    cli::{Cli, Commands},
    commands::Context,
    error::Result,
    settings::{Settings, default_settings_path},
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, load settings, and dispatch.
fn run() -> Result<()> {
    let Cli {
        log,
        settings,
        dry_run,
        json,
        command,
    } = Cli::parse();
    let filter = logging::init(&log);
    debug!(%filter, "logging_initialized");

    let settings = Settings::load(&settings.unwrap_or_else(default_settings_path))?;
    let options = settings.engine_options()?;
    let ctx = Context {
        settings,
        options,
        dry_run,
        json,
    };

    match &command {
        Commands::Profile(cmd) => return commands::profile(&ctx, cmd),
        Commands::Key { name } => {
            commands::key(&ctx, name);
            return Ok(());
        }
        _ => {}
    }

    let runtime = Builder::new_current_thread().enable_all().build()?;
    let out = runtime.block_on(async {
        match &command {
            Commands::Run(target) => commands::run(&ctx, target, true).await,
            Commands::Watch(target) => commands::run(&ctx, target, false).await,
            Commands::Pick(args) => commands::pick(&ctx, args).await,
            Commands::Capture => commands::capture(&ctx).await,
            Commands::Profile(_) | Commands::Key { .. } => Ok(()),
        }
    });
    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_timeout(Duration::from_millis(100));
    out
}
