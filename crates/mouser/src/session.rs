//! A running engine wired to the terminal.

use std::sync::Arc;

use mouser_engine::{Engine, EngineOptions, Notification};
use tokio::{
    signal,
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    backend::Backend,
    console,
    dryrun::DryRunPlatform,
    error::{Error, Result},
    presenter::Presenter,
};

/// Engine, notification stream, and presenter for one command.
pub struct Session {
    /// The engine.
    engine: Engine,
    /// Notifications from the engine.
    rx: UnboundedReceiver<Notification>,
    /// Terminal output.
    presenter: Presenter,
    /// Stdin reader for typed combos, if any.
    reader: Option<JoinHandle<()>>,
    /// Whether combos are typed rather than pressed.
    console: bool,
    /// Simulated pointer, for the closing tally.
    pointer: Option<Arc<DryRunPlatform>>,
}

impl Session {
    /// Build an idle engine over `backend`. Must run inside the runtime.
    pub fn open(backend: Backend, options: EngineOptions, json: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(backend.platform.clone(), backend.hotkeys.clone(), tx, options);
        let console = backend.needs_console();
        let pointer = backend.pointer;
        let reader = backend
            .console
            .map(|hotkeys| console::spawn_reader(hotkeys, pointer.clone()));
        Self {
            engine,
            rx,
            presenter: Presenter::new(json),
            reader,
            console,
            pointer,
        }
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Whether combos are typed on stdin.
    pub fn is_console(&self) -> bool {
        self.console
    }

    /// Terminal output.
    pub fn presenter(&mut self) -> &mut Presenter {
        &mut self.presenter
    }

    /// Show notifications until one satisfies `done`, which is returned.
    ///
    /// Ctrl-C yields [`Error::Interrupted`]. `None` means the engine went away.
    pub async fn pump_until(&mut self, mut done: impl FnMut(&Notification) -> bool) -> Result<Option<Notification>> {
        let interrupt = signal::ctrl_c();
        tokio::pin!(interrupt);
        loop {
            tokio::select! {
                n = self.rx.recv() => {
                    let Some(n) = n else { return Ok(None) };
                    self.presenter.show(&n);
                    if done(&n) {
                        return Ok(Some(n));
                    }
                }
                res = &mut interrupt => {
                    res?;
                    info!("interrupted");
                    return Err(Error::Interrupted);
                }
            }
        }
    }

    /// Show everything already queued.
    pub fn flush(&mut self) {
        while let Ok(n) = self.rx.try_recv() {
            self.presenter.show(&n);
        }
    }

    /// Shut the engine down and show its final notifications.
    pub async fn close(mut self) {
        self.engine.shutdown().await;
        self.flush();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(p) = &self.pointer {
            info!(clicks = p.clicks(), keys = p.keys(), "dry_run_totals");
        }
        debug!(status = %self.presenter.status(), "session_closed");
    }
}
