//! Automation loop: repeat the executor at a fixed interval.
//!
//! The first tick runs synchronously inside [`AutomationController::start`]
//! so the caller learns immediately whether the platform is usable. Later
//! ticks run on the `Automation` ticker slot. A failing tick is reported
//! and the loop keeps going; only an explicit stop ends it.

use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    ClickConfig,
    deps::Platform,
    error::PlatformError,
    executor,
    notification::{NotificationDispatcher, TriggerSource},
    ticker::{Ticker, TickerSlot},
};

/// A running loop.
#[derive(Debug)]
pub struct AutomationSession {
    /// The configuration every tick uses.
    pub config: ClickConfig,
    /// What started the loop.
    pub source: TriggerSource,
    /// Ticks attempted so far, including failures.
    pub ticks: Arc<AtomicU64>,
    /// When the loop started.
    pub started: Instant,
}

/// Owns the automation loop. Mutated only by the engine under its lock.
pub struct AutomationController {
    /// Input backend.
    platform: Arc<dyn Platform>,
    /// Outbound notifications.
    notifier: NotificationDispatcher,
    /// Shared scheduler; this controller owns the `Automation` slot.
    ticker: Ticker,
    /// Active loop, if any.
    session: Option<AutomationSession>,
}

impl AutomationController {
    /// Create an idle controller.
    pub fn new(platform: Arc<dyn Platform>, notifier: NotificationDispatcher, ticker: Ticker) -> Self {
        Self {
            platform,
            notifier,
            ticker,
            session: None,
        }
    }

    /// True while a loop is armed.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// The active loop's configuration.
    pub fn config(&self) -> Option<&ClickConfig> {
        self.session.as_ref().map(|s| &s.config)
    }

    /// Start the loop, replacing any running one.
    ///
    /// Returns the outcome of the first tick. The loop is armed either way.
    pub async fn start(&mut self, config: ClickConfig, source: TriggerSource) -> Result<(), PlatformError> {
        if let Some(prev) = self.session.take() {
            debug!(
                ticks = prev.ticks.load(Ordering::SeqCst),
                "automation_replaced"
            );
        }
        // Nothing from the previous configuration may land after we return.
        self.ticker.stop_async(TickerSlot::Automation).await;

        let ticks = Arc::new(AtomicU64::new(1));
        let first = executor::execute(&*self.platform, &config).await;
        if let Err(e) = &first {
            warn!(error = %e, "automation_first_tick_failed");
        }

        let interval = Duration::from_millis(config.interval_ms());
        let platform = self.platform.clone();
        let notifier = self.notifier.clone();
        let tick_config = config.clone();
        let counter = ticks.clone();
        self.ticker.start(TickerSlot::Automation, interval, interval, move || {
            let platform = platform.clone();
            let notifier = notifier.clone();
            let config = tick_config.clone();
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if let Err(e) = executor::execute(&*platform, &config).await {
                    warn!(tick = n, error = %e, "automation_tick_failed");
                    notifier.error(e.to_string());
                }
                ControlFlow::Continue(())
            }
        });

        debug!(
            x = config.x(),
            y = config.y(),
            interval_ms = config.interval_ms(),
            key = %config.key(),
            source = ?source,
            "automation_started"
        );
        self.session = Some(AutomationSession {
            config,
            source,
            ticks,
            started: Instant::now(),
        });
        first
    }

    /// Disarm the loop without waiting for an in-flight tick. Returns the
    /// session that was running, if any.
    pub fn stop(&mut self) -> Option<AutomationSession> {
        let session = self.session.take()?;
        self.ticker.stop(TickerSlot::Automation);
        debug!(
            ticks = session.ticks.load(Ordering::SeqCst),
            elapsed_ms = session.started.elapsed().as_millis(),
            source = ?session.source,
            "automation_stopped"
        );
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use tokio::{sync::mpsc, time};

    use super::*;
    use crate::{
        Point,
        notification::Notification,
        test_support::{MockPlatform, drain},
    };

    fn controller(platform: Arc<MockPlatform>) -> (AutomationController, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            AutomationController::new(platform, NotificationDispatcher::new(tx), Ticker::new()),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_interval() {
        let platform = Arc::new(MockPlatform::new());
        let (mut auto, _rx) = controller(platform.clone());
        let begin = Instant::now();
        auto.start(ClickConfig::from_parts(10, 20, 25, ""), TriggerSource::Manual)
            .await
            .expect("first tick");
        assert_eq!(platform.clicks(), vec![Point::new(10, 20)]);
        time::sleep(Duration::from_millis(80)).await;
        let offsets: Vec<u128> = platform
            .click_times()
            .into_iter()
            .map(|t| (t - begin).as_millis())
            .collect();
        assert_eq!(offsets, vec![0, 25, 50, 75]);
        assert!(auto.stop().is_some());
        assert!(auto.stop().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_ticks_keep_the_loop_alive() {
        let platform = Arc::new(MockPlatform::new());
        platform.fail_clicks("display disconnected");
        let (mut auto, mut rx) = controller(platform.clone());
        let first = auto
            .start(ClickConfig::from_parts(0, 0, 10, ""), TriggerSource::Manual)
            .await;
        assert!(first.is_err());
        assert!(auto.is_running());

        time::sleep(Duration::from_millis(25)).await;
        let errors = drain(&mut rx);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|n| matches!(n, Notification::Error { .. })));

        platform.clear_failures();
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(platform.clicks().len(), 1);
        auto.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_config() {
        let platform = Arc::new(MockPlatform::new());
        let (mut auto, _rx) = controller(platform.clone());
        auto.start(ClickConfig::from_parts(1, 1, 10, ""), TriggerSource::Manual)
            .await
            .expect("start a");
        time::sleep(Duration::from_millis(15)).await;
        auto.start(ClickConfig::from_parts(2, 2, 10, ""), TriggerSource::Hotkey)
            .await
            .expect("start b");
        let split = platform.clicks().len();
        time::sleep(Duration::from_millis(50)).await;
        assert!(platform.clicks()[split..].iter().all(|p| *p == Point::new(2, 2)));
        assert_eq!(auto.config().map(ClickConfig::x), Some(2));
        auto.stop();
    }
}
