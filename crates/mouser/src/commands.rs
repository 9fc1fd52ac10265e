//! Subcommand implementations.

use keymap::resolve;
use mouser_engine::{ConfigRequest, EngineOptions, Notification, PickEndReason, Point, TriggerSource};
use profiles::{Profile, ProfileStore};
use serde_json::json;
use tracing::{debug, info};

use crate::{
    backend::Backend,
    cli::{PickArgs, ProfileCommand, TargetArgs},
    error::{Error, Result},
    session::Session,
    settings::Settings,
};

/// What every command needs.
pub struct Context {
    /// Parsed settings.
    pub settings: Settings,
    /// Engine options derived from the settings.
    pub options: EngineOptions,
    /// Simulate input.
    pub dry_run: bool,
    /// JSON output.
    pub json: bool,
}

impl Context {
    /// Open a session over the selected backend.
    fn session(&self) -> Result<Session> {
        let backend = Backend::select(self.dry_run)?;
        Ok(Session::open(backend, self.options.clone(), self.json))
    }

    /// Load the profile store.
    fn store(&self) -> ProfileStore {
        ProfileStore::load(self.settings.profiles_path())
    }

    /// Print a result line; JSON mode gets `value` instead of `text`.
    fn print(&self, text: &str, value: &serde_json::Value) {
        if self.json {
            println!("{value}");
        } else {
            println!("{text}");
        }
    }
}

/// `run` and `watch`: arm the global hotkeys and either start now or wait.
pub async fn run(ctx: &Context, target: &TargetArgs, start_now: bool) -> Result<()> {
    let request = target.request(&ctx.store())?;
    let mut session = ctx.session()?;
    let out = drive(&mut session, &ctx.options, request, start_now).await;
    session.close().await;
    match out {
        Err(Error::Interrupted) => Ok(()),
        other => other,
    }
}

/// Body of `run`/`watch`, separated so the session always closes.
async fn drive(session: &mut Session, options: &EngineOptions, request: ConfigRequest, start_now: bool) -> Result<()> {
    let engine = session.engine().clone();
    if start_now {
        let reply = engine.start(request).await?;
        debug!(?reply, "started");
    } else {
        engine.update_last_config(request).await?;
    }
    let bound = engine.bind_global_hotkeys().await?;
    session.flush();

    let how = if session.is_console() { "type" } else { "press" };
    if bound {
        session.presenter().say(&format!(
            "{how} {} to start, {} to stop, Ctrl-C to quit",
            options.start_combo, options.stop_combo
        ));
    } else {
        session.presenter().say("Ctrl-C to quit");
    }
    session.pump_until(|_| false).await.map(drop)
}

/// `pick`: track the pointer until confirmed.
pub async fn pick(ctx: &Context, args: &PickArgs) -> Result<()> {
    let mut session = ctx.session()?;
    let out = pick_inner(ctx, &mut session, args).await;
    session.close().await;
    match out {
        Err(Error::Interrupted) if args.run => Ok(()),
        other => other,
    }
}

/// Body of `pick`.
async fn pick_inner(ctx: &Context, session: &mut Session, args: &PickArgs) -> Result<()> {
    let engine = session.engine().clone();
    engine.start_pick().await?;
    let how = if session.is_console() { "type" } else { "press" };
    session.presenter().say(&format!(
        "picking: move the pointer, then {how} {} to confirm or {} to cancel",
        ctx.options.pick_confirm, ctx.options.pick_cancel
    ));

    let ended = session
        .pump_until(|n| matches!(n, Notification::PickModeEnded { .. }))
        .await?;
    let at = match ended {
        Some(Notification::PickModeEnded {
            reason: PickEndReason::Picked,
            position: Some(at),
        }) => at,
        Some(Notification::PickModeEnded { reason, .. }) => return Err(Error::PickEnded(reason)),
        _ => return Err(Error::PickEnded(PickEndReason::Cancelled)),
    };
    if !ctx.json {
        println!("{} {}", at.x, at.y);
    }

    let request = pick_request(at, args);
    if let Some(name) = &args.save {
        let mut store = ctx.store();
        let config = request.clone().into_config()?;
        let id = store.find(name).map(|p| p.id.clone());
        let saved = store.upsert(id.as_deref(), name, &config)?.clone();
        store.save()?;
        info!(id = %saved.id, name = %saved.name, "profile_saved");
        session.presenter().say(&format!("saved {}: {}", saved.name, saved.summary()));
    }
    if args.run {
        let config = request.into_config()?;
        engine.start_with(config, TriggerSource::Manual).await?;
        session.presenter().say("Ctrl-C to quit");
        session.pump_until(|_| false).await?;
    }
    Ok(())
}

/// Configuration built from a picked position.
fn pick_request(at: Point, args: &PickArgs) -> ConfigRequest {
    ConfigRequest {
        x: Some(f64::from(at.x)),
        y: Some(f64::from(at.y)),
        interval_ms: args.interval,
        key: args.key.clone(),
    }
}

/// `capture`: print the pointer once.
pub async fn capture(ctx: &Context) -> Result<()> {
    let session = ctx.session()?;
    let at = session.engine().capture_position().await;
    session.close().await;
    let at = at?;
    ctx.print(&format!("{} {}", at.x, at.y), &json!({ "x": at.x, "y": at.y }));
    Ok(())
}

/// `profile ...`.
pub fn profile(ctx: &Context, cmd: &ProfileCommand) -> Result<()> {
    let mut store = ctx.store();
    match cmd {
        ProfileCommand::List => {
            if ctx.json {
                println!("{}", json!(store.list()));
            } else if store.is_empty() {
                println!("no profiles in {}", store.path().display());
            } else {
                for p in store.list() {
                    println!("{}", profile_line(p));
                }
            }
        }
        ProfileCommand::Show { id_or_name } => {
            let p = store
                .find(id_or_name)
                .ok_or_else(|| Error::ProfileNotFound(id_or_name.clone()))?;
            ctx.print(&profile_line(p), &json!(p));
        }
        ProfileCommand::Save { name, target } => {
            let config = target.request(&store)?.into_config()?;
            let id = store.find(name).map(|p| p.id.clone());
            let line = profile_line(store.upsert(id.as_deref(), name, &config)?);
            store.save()?;
            ctx.print(&format!("saved {line}"), &json!({ "saved": line }));
        }
        ProfileCommand::Delete { id_or_name } => {
            let id = store
                .find(id_or_name)
                .map(|p| p.id.clone())
                .ok_or_else(|| Error::ProfileNotFound(id_or_name.clone()))?;
            let removed = store.remove(&id)?;
            store.save()?;
            ctx.print(&format!("deleted {}", removed.name), &json!({ "deleted": removed.id }));
        }
    }
    Ok(())
}

/// One profile for listing.
fn profile_line(p: &Profile) -> String {
    format!("{}  {}  {}", p.id, p.name, p.summary())
}

/// `key NAME`: show what a name resolves to.
pub fn key(ctx: &Context, name: &str) {
    let resolved = resolve(name);
    let text = resolved.map_or_else(
        || format!("'{name}' is not a key; no key will be pressed"),
        |k| format!("'{name}' -> {k}"),
    );
    ctx.print(&text, &json!({ "input": name, "key": resolved }));
}
