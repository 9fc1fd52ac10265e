//! Pick mode: live pointer tracking until the user confirms or cancels.
//!
//! A session registers two session-scoped hotkeys (confirm, cancel), emits
//! the pointer position immediately and then on a fixed cadence. Every exit
//! path (confirm, cancel, sampling failure, superseding automation start,
//! shutdown) goes through [`PickController::stop`], which clears the
//! sampler and unregisters both hotkeys.

use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use keymap::Combo;
use tracing::{debug, trace};

use crate::{
    Error, Point, Result,
    command::{Command, CommandTx, enqueue_on_press},
    deps::{HotkeyApi, Platform},
    notification::{NotificationDispatcher, PickEndReason},
    ticker::{Ticker, TickerSlot},
};

/// Cadence of pointer samples while picking.
pub const PICK_SAMPLE_INTERVAL_MS: u64 = 50;

/// State held only while a session is active.
struct PickSession {
    /// Monotonic id; signals for other ids are stale.
    id: u64,
    /// Cleared on stop so an in-flight sample never reports after the end.
    live: Arc<AtomicBool>,
}

/// Owns the pick session lifecycle. Mutated only by the engine under its lock.
pub struct PickController {
    /// Pointer source.
    platform: Arc<dyn Platform>,
    /// Registers the session-scoped combos.
    hotkeys: Arc<dyn HotkeyApi>,
    /// Outbound notifications.
    notifier: NotificationDispatcher,
    /// Shared scheduler; this controller owns the `PickSample` slot.
    ticker: Ticker,
    /// Dispatcher queue for hotkey presses and sampler failures.
    commands: CommandTx,
    /// Combo that locks in the position.
    confirm: Combo,
    /// Combo that abandons the session.
    cancel: Combo,
    /// Time between samples.
    sample_interval: Duration,
    /// The active session, if any.
    session: Option<PickSession>,
    /// Last issued session id.
    last_id: u64,
}

/// Construction parameters for [`PickController`].
pub struct PickParts {
    /// Pointer source.
    pub platform: Arc<dyn Platform>,
    /// Hotkey registration.
    pub hotkeys: Arc<dyn HotkeyApi>,
    /// Outbound notifications.
    pub notifier: NotificationDispatcher,
    /// Shared scheduler.
    pub ticker: Ticker,
    /// Dispatcher queue.
    pub commands: CommandTx,
    /// Confirm combo.
    pub confirm: Combo,
    /// Cancel combo.
    pub cancel: Combo,
    /// Sampling cadence. Raised to [`PICK_SAMPLE_INTERVAL_MS`] when shorter.
    pub sample_interval: Duration,
}

impl PickController {
    /// Create an inactive controller.
    pub fn new(parts: PickParts) -> Self {
        Self {
            platform: parts.platform,
            hotkeys: parts.hotkeys,
            notifier: parts.notifier,
            ticker: parts.ticker,
            commands: parts.commands,
            confirm: parts.confirm,
            cancel: parts.cancel,
            sample_interval: parts.sample_interval.max(Duration::from_millis(PICK_SAMPLE_INTERVAL_MS)),
            session: None,
            last_id: 0,
        }
    }

    /// True while a session is active.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Id of the active session.
    pub fn session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Begin a session. A no-op when one is already active.
    pub async fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        self.last_id += 1;
        let id = self.last_id;

        let confirm_ok = self.hotkeys.register(
            &self.confirm,
            enqueue_on_press(&self.commands, move || Command::PickConfirm { session: id }),
        );
        let cancel_ok = self.hotkeys.register(
            &self.cancel,
            enqueue_on_press(&self.commands, move || Command::PickCancel { session: id }),
        );
        if !confirm_ok || !cancel_ok {
            if confirm_ok {
                self.hotkeys.unregister(&self.confirm);
            }
            if cancel_ok {
                self.hotkeys.unregister(&self.cancel);
            }
            let err = Error::HotkeyConflict {
                combos: format!("{}/{}", self.confirm, self.cancel),
            };
            self.notifier.error(err.to_string());
            return Err(err);
        }

        match self.platform.cursor().await {
            Ok(at) => self.notifier.pick_position(at),
            Err(e) => {
                self.hotkeys.unregister(&self.confirm);
                self.hotkeys.unregister(&self.cancel);
                self.notifier.error(e.to_string());
                return Err(e.into());
            }
        }

        let live = Arc::new(AtomicBool::new(true));
        self.spawn_sampler(id, live.clone());
        self.session = Some(PickSession { id, live });
        debug!(session = id, "pick_started");
        Ok(())
    }

    /// Arm the periodic sampler for session `id`.
    fn spawn_sampler(&self, id: u64, live: Arc<AtomicBool>) {
        let platform = self.platform.clone();
        let notifier = self.notifier.clone();
        let commands = self.commands.clone();
        self.ticker.start(
            TickerSlot::PickSample,
            self.sample_interval,
            self.sample_interval,
            move || {
                let platform = platform.clone();
                let notifier = notifier.clone();
                let commands = commands.clone();
                let live = live.clone();
                async move {
                    match platform.cursor().await {
                        Ok(at) => {
                            if live.load(Ordering::SeqCst) {
                                notifier.pick_position(at);
                            }
                            ControlFlow::Continue(())
                        }
                        Err(error) => {
                            if live.load(Ordering::SeqCst)
                                && commands.send(Command::PickSampleFailed { session: id, error }).is_err()
                            {
                                debug!(session = id, "pick_failure_dropped_dispatcher_gone");
                            }
                            ControlFlow::Break(())
                        }
                    }
                }
            },
        );
    }

    /// End the active session. Returns false (and emits nothing) when inactive.
    ///
    /// `position` is reported only for [`PickEndReason::Picked`].
    pub fn stop(&mut self, reason: PickEndReason, position: Option<Point>) -> bool {
        let Some(session) = self.session.take() else {
            trace!("pick_stop_inactive");
            return false;
        };
        session.live.store(false, Ordering::SeqCst);
        self.ticker.stop(TickerSlot::PickSample);
        self.hotkeys.unregister(&self.confirm);
        self.hotkeys.unregister(&self.cancel);
        let position = match reason {
            PickEndReason::Picked => position,
            PickEndReason::Cancelled | PickEndReason::Error => None,
        };
        debug!(session = session.id, reason = ?reason, "pick_stopped");
        self.notifier.pick_ended(reason, position);
        true
    }
}

#[cfg(test)]
mod tests {
    use keymap::KeyId;
    use tokio::{sync::mpsc, time};

    use super::*;
    use crate::{
        notification::Notification,
        test_support::{MockHotkeyApi, MockPlatform, drain},
    };

    fn controller(
        platform: Arc<MockPlatform>,
        hotkeys: Arc<MockHotkeyApi>,
    ) -> (
        PickController,
        mpsc::UnboundedReceiver<Notification>,
        mpsc::UnboundedReceiver<Command>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ctx, crx) = mpsc::unbounded_channel();
        let c = PickController::new(PickParts {
            platform,
            hotkeys,
            notifier: NotificationDispatcher::new(tx),
            ticker: Ticker::new(),
            commands: ctx,
            confirm: Combo::key_only(KeyId::Enter),
            cancel: Combo::key_only(KeyId::Escape),
            sample_interval: Duration::from_millis(PICK_SAMPLE_INTERVAL_MS),
        });
        (c, rx, crx)
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_scopes_hotkeys() {
        let platform = Arc::new(MockPlatform::new());
        platform.set_pointer(Point::new(7, 8));
        let hotkeys = Arc::new(MockHotkeyApi::new());
        let (mut pick, mut rx, _crx) = controller(platform.clone(), hotkeys.clone());

        pick.start().await.expect("start");
        pick.start().await.expect("second start is a no-op");
        assert_eq!(platform.cursor_queries(), 1);
        assert_eq!(hotkeys.registered().len(), 2);
        assert_eq!(drain(&mut rx), vec![Notification::PickPosition { x: 7, y: 8 }]);

        assert!(pick.stop(PickEndReason::Cancelled, Some(Point::new(1, 1))));
        assert!(hotkeys.registered().is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![Notification::PickModeEnded {
                reason: PickEndReason::Cancelled,
                position: None,
            }]
        );
        assert!(!pick.stop(PickEndReason::Cancelled, None));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_releases_partial_registration() {
        let platform = Arc::new(MockPlatform::new());
        let hotkeys = Arc::new(MockHotkeyApi::new());
        hotkeys.deny(&Combo::key_only(KeyId::Escape));
        let (mut pick, mut rx, _crx) = controller(platform.clone(), hotkeys.clone());

        let err = pick.start().await.expect_err("conflict");
        assert!(matches!(err, Error::HotkeyConflict { .. }));
        assert!(!pick.is_active());
        assert!(hotkeys.registered().is_empty());
        assert_eq!(platform.cursor_queries(), 0);
        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(&msgs[0], Notification::Error { message } if message.contains("enter/escape")));
    }

    #[tokio::test(start_paused = true)]
    async fn samples_on_cadence() {
        let platform = Arc::new(MockPlatform::new());
        let hotkeys = Arc::new(MockHotkeyApi::new());
        let (mut pick, mut rx, _crx) = controller(platform.clone(), hotkeys);

        pick.start().await.expect("start");
        time::sleep(Duration::from_millis(120)).await;
        // Immediate sample plus ticks at 50ms and 100ms.
        assert_eq!(platform.cursor_queries(), 3);
        assert_eq!(drain(&mut rx).len(), 3);
        pick.stop(PickEndReason::Cancelled, None);
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(platform.cursor_queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sample_signals_dispatcher() {
        let platform = Arc::new(MockPlatform::new());
        platform.fail_cursor_from(2, "pointer unavailable");
        let hotkeys = Arc::new(MockHotkeyApi::new());
        let (mut pick, _rx, mut crx) = controller(platform.clone(), hotkeys);

        pick.start().await.expect("first sample succeeds");
        time::sleep(Duration::from_millis(60)).await;
        match crx.try_recv() {
            Ok(Command::PickSampleFailed { session, error }) => {
                assert_eq!(Some(session), pick.session_id());
                assert_eq!(error.message, "pointer unavailable");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
