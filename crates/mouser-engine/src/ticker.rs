//! Ticker for scheduling repeated async actions with cancellation support.
//!
//! Each session kind owns a single slot. Starting a slot replaces (and
//! cancels) whatever ran there before, so handles are never left
//! dangling. Every tick is awaited inside the loop, which means one slot
//! never overlaps itself; cancelling stops future ticks but lets an
//! in-flight tick finish.

use std::{collections::HashMap, fmt, future::Future, ops::ControlFlow, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Maximum time to wait for a cancelled task to finish its in-flight tick.
pub const STOP_WAIT_TIMEOUT_MS: u64 = 50;

/// Identifies one repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickerSlot {
    /// Pointer sampling while picking.
    PickSample,
    /// The click automation loop.
    Automation,
}

impl fmt::Display for TickerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PickSample => "pick_sample",
            Self::Automation => "automation",
        })
    }
}

/// A live slot: its cancellation token and task handle.
struct TickerEntry {
    /// Cancels the loop before its next tick.
    token: CancellationToken,
    /// The spawned loop.
    handle: JoinHandle<()>,
}

/// Slot-keyed scheduler. Cloning shares the same slots.
#[derive(Clone, Default)]
pub struct Ticker {
    /// Live entries by slot.
    entries: Arc<Mutex<HashMap<TickerSlot, TickerEntry>>>,
}

impl Ticker {
    /// Create an empty ticker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a slot has a live task.
    pub fn is_active(&self, slot: TickerSlot) -> bool {
        self.entries
            .lock()
            .get(&slot)
            .is_some_and(|e| !e.handle.is_finished())
    }

    /// Number of slots holding a handle, finished or not.
    pub fn active_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Start or replace `slot`. `on_tick` first runs after `initial`, then
    /// once per `interval`, until cancelled or until it returns
    /// `ControlFlow::Break`.
    pub fn start<F, Fut>(&self, slot: TickerSlot, initial: Duration, interval: Duration, mut on_tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        self.stop(slot);

        let token = CancellationToken::new();
        let cancel = token.clone();

        let fut = async move {
            trace!(
                "ticker_start" = %slot,
                init_ms = initial.as_millis(),
                int_ms = interval.as_millis()
            );

            tokio::select! {
                _ = time::sleep(initial) => {}
                _ = cancel.cancelled() => {
                    trace!("ticker_cancelled_initial" = %slot);
                    return;
                }
            }

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        trace!("ticker_cancelled" = %slot);
                        return;
                    }
                    _ = ticker.tick() => {}
                }
                if on_tick().await.is_break() {
                    trace!("ticker_break" = %slot);
                    return;
                }
            }
        };

        let handle = tokio::spawn(fut);
        self.entries.lock().insert(slot, TickerEntry { token, handle });
    }

    /// Stop a slot if present without waiting.
    pub fn stop(&self, slot: TickerSlot) -> bool {
        match self.entries.lock().remove(&slot) {
            Some(entry) => {
                // Let the loop exit through the token; aborting would cut an
                // in-flight tick short.
                entry.token.cancel();
                trace!("ticker_stop" = %slot);
                true
            }
            None => false,
        }
    }

    /// Stop a slot and wait briefly for its in-flight tick to finish.
    pub async fn stop_async(&self, slot: TickerSlot) -> bool {
        let entry = self.entries.lock().remove(&slot);
        let Some(entry) = entry else {
            return false;
        };
        entry.token.cancel();
        if time::timeout(Duration::from_millis(STOP_WAIT_TIMEOUT_MS), entry.handle).await.is_err() {
            trace!(%slot, "ticker_stop_wait_elapsed");
        }
        trace!("ticker_stop_async" = %slot);
        true
    }

    /// Cancel every slot and wait briefly for all of them.
    pub async fn clear_async(&self) {
        let entries: Vec<TickerEntry> = {
            let mut map = self.entries.lock();
            map.drain().map(|(_, e)| e).collect()
        };

        for e in &entries {
            e.token.cancel();
        }

        for e in entries {
            if time::timeout(Duration::from_millis(STOP_WAIT_TIMEOUT_MS), e.handle).await.is_err() {
                trace!("ticker_clear_wait_elapsed");
            }
        }
        trace!("ticker_clear_async");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future::{Ready, ready},
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut() -> Ready<ControlFlow<()>> + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ready(ControlFlow::Continue(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_after_initial_then_each_interval() {
        let ticker = Ticker::new();
        let n = Arc::new(AtomicUsize::new(0));
        ticker.start(
            TickerSlot::Automation,
            Duration::from_millis(20),
            Duration::from_millis(20),
            counting(&n),
        );
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(n.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(55)).await;
        assert_eq!(n.load(Ordering::SeqCst), 3);
        assert!(ticker.stop_async(TickerSlot::Automation).await);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(n.load(Ordering::SeqCst), 3);
        assert_eq!(ticker.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_a_slot_replaces_it() {
        let ticker = Ticker::new();
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        let ms = Duration::from_millis(10);
        ticker.start(TickerSlot::Automation, ms, ms, counting(&old));
        ticker.start(TickerSlot::Automation, ms, ms, counting(&new));
        time::sleep(Duration::from_millis(35)).await;
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 3);
        assert_eq!(ticker.active_count(), 1);
        ticker.clear_async().await;
        assert_eq!(ticker.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn break_ends_the_loop() {
        let ticker = Ticker::new();
        let n = Arc::new(AtomicUsize::new(0));
        let c = n.clone();
        let ms = Duration::from_millis(10);
        ticker.start(TickerSlot::PickSample, ms, ms, move || {
            let seen = c.fetch_add(1, Ordering::SeqCst) + 1;
            ready(if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        });
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(n.load(Ordering::SeqCst), 2);
        assert!(!ticker.is_active(TickerSlot::PickSample));
        assert!(ticker.stop(TickerSlot::PickSample));
        assert!(!ticker.stop(TickerSlot::PickSample));
    }
}
