//! mouser-engine: coordination core for the mouser auto-clicker.
//!
//! The [`Engine`] owns the run state (idle, picking, running) and the three
//! controllers behind it: pick mode, the automation loop, and the global
//! start/stop bindings. Presentation calls and hotkey presses both funnel
//! through one async lock, so state transitions are serialized no matter
//! which thread asked for them. Periodic work (pointer sampling, click
//! ticks) runs on [`ticker::Ticker`] slots and never takes that lock.
use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};

use keymap::{Combo, KeyId};
use serde::Serialize;
use tokio::sync::{
    Mutex, MutexGuard,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

mod automation;
mod command;
mod config;
mod deps;
mod error;
mod executor;
mod hotkeys;
mod notification;
mod pick;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
pub mod ticker;

pub use config::{ClickConfig, ConfigRequest, DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS, Point};
pub use deps::{HotkeyApi, HotkeyCallback, Platform};
pub use error::{Error, PlatformError, PlatformOp, Result};
pub use executor::execute;
pub use hotkeys::{DEFAULT_START_COMBO, DEFAULT_STOP_COMBO};
pub use notification::{Notification, NotificationDispatcher, PickEndReason, TriggerSource};
pub use pick::PICK_SAMPLE_INTERVAL_MS;

use automation::AutomationController;
use command::{Command, CommandTx};
use hotkeys::{GlobalBindings, ctrl_shift};
use pick::{PickController, PickParts};
use ticker::Ticker;

/// Coarse engine state. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Nothing scheduled.
    Idle,
    /// A pick session is tracking the pointer.
    Picking,
    /// The automation loop is armed.
    Running,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Picking => "picking",
            Self::Running => "running",
        })
    }
}

/// Reply to pick-mode operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickReply {
    /// Whether pick mode is active after the call.
    pub pick_mode: bool,
}

/// Reply to automation start/stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReply {
    /// Whether the loop is armed after the call.
    pub running: bool,
    /// Set when the first tick failed; the loop is armed anyway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Tunables fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Global combo that starts automation with the last configuration.
    pub start_combo: Combo,
    /// Global combo that stops automation.
    pub stop_combo: Combo,
    /// Session-scoped combo that confirms a pick.
    pub pick_confirm: Combo,
    /// Session-scoped combo that cancels a pick.
    pub pick_cancel: Combo,
    /// Cadence of pointer samples while picking. Never faster than
    /// [`PICK_SAMPLE_INTERVAL_MS`].
    pub pick_sample_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            start_combo: ctrl_shift(KeyId::F9),
            stop_combo: ctrl_shift(KeyId::F10),
            pick_confirm: Combo::key_only(KeyId::Enter),
            pick_cancel: Combo::key_only(KeyId::Escape),
            pick_sample_interval: Duration::from_millis(PICK_SAMPLE_INTERVAL_MS),
        }
    }
}

/// State guarded by the engine lock.
struct Core {
    /// Current coarse state.
    run_state: RunState,
    /// Most recent configuration the presentation layer submitted.
    last_config: Option<ClickConfig>,
    /// Pick mode.
    pick: PickController,
    /// Automation loop.
    automation: AutomationController,
    /// Global start/stop combos.
    bindings: GlobalBindings,
    /// Queue that hotkey callbacks feed.
    commands: CommandTx,
    /// Outbound notifications.
    notifier: NotificationDispatcher,
    /// Set once by shutdown.
    shut_down: bool,
}

impl Core {
    /// Start (or restart) automation. Cancels any pick session first.
    async fn start(&mut self, config: ClickConfig, source: TriggerSource) -> RunReply {
        if self.pick.stop(PickEndReason::Cancelled, None) {
            debug!("pick_superseded_by_automation");
        }
        self.last_config = Some(config.clone());
        let first = self.automation.start(config, source).await;
        self.run_state = RunState::Running;
        let warning = first.err().map(|e| {
            let msg = e.to_string();
            self.notifier.error(msg.clone());
            msg
        });
        self.notifier.running_changed(true, source);
        self.check();
        RunReply {
            running: true,
            warning,
        }
    }

    /// Stop automation. Emits only on a real transition.
    fn stop(&mut self, source: TriggerSource) -> RunReply {
        if self.automation.stop().is_some() {
            self.run_state = RunState::Idle;
            self.notifier.running_changed(false, source);
        }
        self.check();
        RunReply {
            running: false,
            warning: None,
        }
    }

    /// End the pick session with `reason` and return to idle.
    fn end_pick(&mut self, reason: PickEndReason, position: Option<Point>) -> bool {
        let ended = self.pick.stop(reason, position);
        if ended {
            self.run_state = RunState::Idle;
        }
        self.check();
        ended
    }

    /// Controller state and the coarse state must agree.
    fn check(&self) {
        debug_assert!(
            !(self.pick.is_active() && self.automation.is_running()),
            "pick and automation both active"
        );
        debug_assert_eq!(
            self.run_state,
            if self.automation.is_running() {
                RunState::Running
            } else if self.pick.is_active() {
                RunState::Picking
            } else {
                RunState::Idle
            }
        );
    }
}

impl Drop for Core {
    /// Dropping the last engine handle without [`Engine::shutdown`] still
    /// releases every combo and cancels both sessions, which closes the
    /// command queue and lets the dispatcher exit.
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        debug!("engine_dropped_without_shutdown");
        self.end_pick(PickEndReason::Cancelled, None);
        self.stop(TriggerSource::Manual);
        self.bindings.teardown();
    }
}

/// Applies queued commands. Holds the core weakly so the engine can drop.
struct Dispatcher {
    /// Engine state; gone once every [`Engine`] handle dropped.
    core: Weak<Mutex<Core>>,
    /// Input backend, for confirm.
    platform: Arc<dyn Platform>,
    /// Outbound notifications.
    notifier: NotificationDispatcher,
    /// Cancelled by shutdown.
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Apply queued commands until the engine goes away.
    async fn run(self, mut rx: UnboundedReceiver<Command>) {
        loop {
            let cmd = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
            };
            let Some(core) = self.core.upgrade() else {
                break;
            };
            trace!(command = ?cmd, "dispatch");
            self.handle(&core, cmd).await;
        }
        debug!("dispatcher_exited");
    }

    /// Apply one command.
    async fn handle(&self, core: &Mutex<Core>, cmd: Command) {
        match cmd {
            Command::PickConfirm { session } => self.confirm_pick(core, session).await,
            Command::PickCancel { session } => {
                let mut core = core.lock().await;
                if core.pick.session_id() == Some(session) {
                    core.end_pick(PickEndReason::Cancelled, None);
                } else {
                    trace!(session, "stale_pick_cancel");
                }
            }
            Command::PickSampleFailed { session, error } => {
                let mut core = core.lock().await;
                if core.pick.session_id() == Some(session) {
                    warn!(error = %error, "pick_sampling_failed");
                    core.end_pick(PickEndReason::Error, None);
                    self.notifier.error(error.to_string());
                } else {
                    trace!(session, "stale_pick_sample_failure");
                }
            }
            Command::HotkeyStart => {
                let mut core = core.lock().await;
                if core.shut_down {
                    return;
                }
                match core.last_config.clone() {
                    Some(config) => {
                        core.start(config, TriggerSource::Hotkey).await;
                    }
                    None => self
                        .notifier
                        .error("Nothing to start yet. Start once from the app to arm the hotkey."),
                }
            }
            Command::HotkeyStop => {
                let mut core = core.lock().await;
                if !core.shut_down {
                    core.stop(TriggerSource::Hotkey);
                }
            }
        }
    }

    /// Confirm pick session `session` at the current pointer location.
    async fn confirm_pick(&self, core: &Mutex<Core>, session: u64) {
        let mut core = core.lock().await;
        if core.pick.session_id() != Some(session) {
            trace!(session, "stale_pick_confirm");
            return;
        }
        match self.platform.cursor().await {
            Ok(at) => {
                info!(x = at.x, y = at.y, "pick_confirmed");
                core.end_pick(PickEndReason::Picked, Some(at));
            }
            Err(e) => {
                core.end_pick(PickEndReason::Error, None);
                self.notifier.error(e.to_string());
            }
        }
    }
}

/// The coordination layer. Cloning yields another handle to the same engine.
///
/// Call [`Engine::shutdown`] to wait for in-flight ticks. Dropping every
/// handle without it still releases hotkeys and stops both sessions.
#[derive(Clone)]
pub struct Engine {
    /// All mutable state; one transition at a time.
    core: Arc<Mutex<Core>>,
    /// Input backend, for calls that need no state.
    platform: Arc<dyn Platform>,
    /// Outbound notifications.
    notifier: NotificationDispatcher,
    /// Shared scheduler.
    ticker: Ticker,
    /// Stops the dispatcher task on shutdown.
    shutdown: CancellationToken,
}

impl Engine {
    /// Build an idle engine and spawn its command dispatcher.
    ///
    /// Must be called inside a tokio runtime. Notifications go to `event_tx`.
    pub fn new(
        platform: Arc<dyn Platform>,
        hotkeys: Arc<dyn HotkeyApi>,
        event_tx: UnboundedSender<Notification>,
        options: EngineOptions,
    ) -> Self {
        let notifier = NotificationDispatcher::new(event_tx);
        let ticker = Ticker::new();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let pick = PickController::new(PickParts {
            platform: platform.clone(),
            hotkeys: hotkeys.clone(),
            notifier: notifier.clone(),
            ticker: ticker.clone(),
            commands: cmd_tx.clone(),
            confirm: options.pick_confirm,
            cancel: options.pick_cancel,
            sample_interval: options.pick_sample_interval,
        });
        let automation = AutomationController::new(platform.clone(), notifier.clone(), ticker.clone());
        let bindings = GlobalBindings::new(hotkeys, options.start_combo, options.stop_combo);

        let engine = Self {
            core: Arc::new(Mutex::new(Core {
                run_state: RunState::Idle,
                last_config: None,
                pick,
                automation,
                bindings,
                commands: cmd_tx,
                notifier: notifier.clone(),
                shut_down: false,
            })),
            platform,
            notifier,
            ticker,
            shutdown: CancellationToken::new(),
        };

        let dispatcher = Dispatcher {
            core: Arc::downgrade(&engine.core),
            platform: engine.platform.clone(),
            notifier: engine.notifier.clone(),
            shutdown: engine.shutdown.clone(),
        };
        tokio::spawn(dispatcher.run(cmd_rx));
        engine
    }

    /// Lock the core, failing once the engine is shut down.
    async fn lock_live(&self) -> Result<MutexGuard<'_, Core>> {
        let core = self.core.lock().await;
        if core.shut_down {
            return Err(Error::ShutDown);
        }
        Ok(core)
    }

    /// Read the current pointer location once.
    pub async fn capture_position(&self) -> Result<Point> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShutDown);
        }
        match self.platform.cursor().await {
            Ok(at) => Ok(at),
            Err(e) => {
                self.notifier.error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Enter pick mode. Idempotent while picking; rejected while running.
    pub async fn start_pick(&self) -> Result<PickReply> {
        let mut core = self.lock_live().await?;
        match core.run_state {
            RunState::Running => {
                return Err(Error::Busy("Stop the automation loop before picking a position"));
            }
            RunState::Picking => return Ok(PickReply { pick_mode: true }),
            RunState::Idle => {}
        }
        core.pick.start().await?;
        core.run_state = RunState::Picking;
        core.check();
        Ok(PickReply { pick_mode: true })
    }

    /// Leave pick mode as cancelled. A no-op when not picking.
    pub async fn stop_pick(&self) -> PickReply {
        let mut core = self.core.lock().await;
        core.end_pick(PickEndReason::Cancelled, None);
        PickReply { pick_mode: false }
    }

    /// Start (or restart) automation from a presentation request.
    ///
    /// Validation happens first; an invalid request changes nothing.
    pub async fn start(&self, request: ConfigRequest) -> Result<RunReply> {
        let config = request.into_config()?;
        self.start_with(config, TriggerSource::Manual).await
    }

    /// Start (or restart) automation with an already validated config.
    pub async fn start_with(&self, config: ClickConfig, source: TriggerSource) -> Result<RunReply> {
        let mut core = self.lock_live().await?;
        Ok(core.start(config, source).await)
    }

    /// Stop automation. A no-op when not running.
    pub async fn stop(&self) -> RunReply {
        self.stop_with(TriggerSource::Manual).await
    }

    /// Stop automation, attributing the change to `source`.
    pub async fn stop_with(&self, source: TriggerSource) -> RunReply {
        let mut core = self.core.lock().await;
        if core.shut_down {
            return RunReply {
                running: false,
                warning: None,
            };
        }
        core.stop(source)
    }

    /// Record the configuration a hotkey start will use, without starting.
    pub async fn update_last_config(&self, request: ConfigRequest) -> Result<()> {
        let config = request.into_config()?;
        let mut core = self.lock_live().await?;
        debug!(x = config.x(), y = config.y(), "last_config_updated");
        core.last_config = Some(config);
        Ok(())
    }

    /// Register the global start/stop combos. Returns true when both are held.
    pub async fn bind_global_hotkeys(&self) -> Result<bool> {
        let mut core = self.lock_live().await?;
        let commands = core.commands.clone();
        let notifier = core.notifier.clone();
        Ok(core.bindings.install(&commands, &notifier))
    }

    /// Current coarse state.
    pub async fn run_state(&self) -> RunState {
        self.core.lock().await.run_state
    }

    /// The configuration a hotkey start would use.
    pub async fn last_config(&self) -> Option<ClickConfig> {
        self.core.lock().await.last_config.clone()
    }

    /// Configuration of the running loop.
    pub async fn running_config(&self) -> Option<ClickConfig> {
        self.core.lock().await.automation.config().cloned()
    }

    /// Global combos currently held.
    pub async fn bound_hotkeys(&self) -> Vec<Combo> {
        self.core.lock().await.bindings.bound().to_vec()
    }

    /// Number of ticker slots still holding a task handle.
    pub fn active_timers(&self) -> usize {
        self.ticker.active_count()
    }

    /// Whether [`Engine::shutdown`] has completed.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Release everything: end picking, stop the loop, unregister every
    /// hotkey, and wait briefly for in-flight ticks. Idempotent.
    pub async fn shutdown(&self) {
        {
            let mut core = self.core.lock().await;
            if core.shut_down {
                return;
            }
            core.shut_down = true;
            core.end_pick(PickEndReason::Cancelled, None);
            core.stop(TriggerSource::Manual);
            core.bindings.teardown();
        }
        self.ticker.clear_async().await;
        self.shutdown.cancel();
        info!("engine_shut_down");
    }
}
