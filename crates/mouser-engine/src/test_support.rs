//! Test support utilities for mouser-engine unit and integration tests.
//! These helpers are public so the integration suite can share them; they
//! are not used by production code.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use keymap::{Combo, KeyId};
use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    time::{Instant, sleep, timeout},
};

use crate::{
    Engine, EngineOptions, Point,
    deps::{HotkeyApi, HotkeyCallback, Platform},
    error::{PlatformError, PlatformOp},
    notification::Notification,
};

/// One side effect recorded by [`MockPlatform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Pointer moved to a point.
    Move(Point),
    /// Click at the pointer location at that time.
    Click(Point),
    /// Keystroke.
    Key(KeyId),
}

/// Mutable state behind [`MockPlatform`].
#[derive(Default)]
struct PlatformState {
    /// Current pointer location.
    pointer: Point,
    /// Recorded side effects with their (virtual) timestamps.
    log: Vec<(Instant, Action)>,
    /// Number of cursor queries made.
    cursor_queries: usize,
    /// Cursor queries from this 1-based index onward fail.
    fail_cursor_from: Option<(usize, String)>,
    /// Clicks fail with this message.
    fail_clicks: Option<String>,
    /// Pointer moves fail with this message.
    fail_moves: Option<String>,
    /// Keystrokes fail with this message.
    fail_keys: Option<String>,
    /// Each click takes this long before it lands.
    click_delay: Option<Duration>,
}

/// In-memory [`Platform`] that records every call.
#[derive(Default)]
pub struct MockPlatform {
    /// Shared state.
    state: Mutex<PlatformState>,
}

impl MockPlatform {
    /// Pointer at the origin, nothing failing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the pointer, as if the user moved the mouse.
    pub fn set_pointer(&self, at: Point) {
        self.state.lock().pointer = at;
    }

    /// Recorded side effects in order.
    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().log.iter().map(|(_, a)| *a).collect()
    }

    /// Recorded side effects with timestamps.
    pub fn timed_actions(&self) -> Vec<(Instant, Action)> {
        self.state.lock().log.clone()
    }

    /// Positions of every recorded click.
    pub fn clicks(&self) -> Vec<Point> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Click(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Timestamps of every recorded click.
    pub fn click_times(&self) -> Vec<Instant> {
        self.timed_actions()
            .into_iter()
            .filter_map(|(t, a)| matches!(a, Action::Click(_)).then_some(t))
            .collect()
    }

    /// Number of cursor queries so far.
    pub fn cursor_queries(&self) -> usize {
        self.state.lock().cursor_queries
    }

    /// Make the `nth` cursor query (1-based) and all later ones fail.
    pub fn fail_cursor_from(&self, nth: usize, message: &str) {
        self.state.lock().fail_cursor_from = Some((nth, message.to_string()));
    }

    /// Make every click fail.
    pub fn fail_clicks(&self, message: &str) {
        self.state.lock().fail_clicks = Some(message.to_string());
    }

    /// Make every pointer move fail.
    pub fn fail_moves(&self, message: &str) {
        self.state.lock().fail_moves = Some(message.to_string());
    }

    /// Make every keystroke fail.
    pub fn fail_keys(&self, message: &str) {
        self.state.lock().fail_keys = Some(message.to_string());
    }

    /// Make every click take `delay` of (virtual) time. The click is
    /// recorded when it completes.
    pub fn delay_clicks(&self, delay: Duration) {
        self.state.lock().click_delay = Some(delay);
    }

    /// Clear all injected failures.
    pub fn clear_failures(&self) {
        let mut s = self.state.lock();
        s.fail_cursor_from = None;
        s.fail_clicks = None;
        s.fail_moves = None;
        s.fail_keys = None;
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn set_cursor(&self, at: Point) -> Result<(), PlatformError> {
        let mut s = self.state.lock();
        if let Some(m) = &s.fail_moves {
            return Err(PlatformError::new(PlatformOp::SetCursor, m.clone()));
        }
        s.pointer = at;
        s.log.push((Instant::now(), Action::Move(at)));
        Ok(())
    }

    async fn click(&self) -> Result<(), PlatformError> {
        let delay = self.state.lock().click_delay;
        if let Some(d) = delay {
            sleep(d).await;
        }
        let mut s = self.state.lock();
        if let Some(m) = &s.fail_clicks {
            return Err(PlatformError::new(PlatformOp::Click, m.clone()));
        }
        let at = s.pointer;
        s.log.push((Instant::now(), Action::Click(at)));
        Ok(())
    }

    async fn send_key(&self, key: KeyId) -> Result<(), PlatformError> {
        let mut s = self.state.lock();
        if let Some(m) = &s.fail_keys {
            return Err(PlatformError::new(PlatformOp::SendKey, m.clone()));
        }
        s.log.push((Instant::now(), Action::Key(key)));
        Ok(())
    }

    async fn cursor(&self) -> Result<Point, PlatformError> {
        let mut s = self.state.lock();
        s.cursor_queries += 1;
        if let Some((nth, m)) = &s.fail_cursor_from
            && s.cursor_queries >= *nth
        {
            return Err(PlatformError::new(PlatformOp::QueryCursor, m.clone()));
        }
        Ok(s.pointer)
    }
}

/// Mutable state behind [`MockHotkeyApi`].
#[derive(Default)]
struct HotkeyState {
    /// Live registrations.
    registered: HashMap<Combo, Arc<HotkeyCallback>>,
    /// Combos "owned by another process".
    denied: HashSet<Combo>,
    /// Total register attempts.
    register_calls: usize,
    /// Total unregister calls for held combos.
    unregister_calls: usize,
}

/// In-memory [`HotkeyApi`] that lets tests press combos directly.
#[derive(Default)]
pub struct MockHotkeyApi {
    /// Shared state.
    state: Mutex<HotkeyState>,
}

impl MockHotkeyApi {
    /// Nothing registered, nothing denied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registration of `combo` fail.
    pub fn deny(&self, combo: &Combo) {
        self.state.lock().denied.insert(combo.clone());
    }

    /// Invoke the callback for `combo`. Returns false when it is not registered.
    pub fn press(&self, combo: &Combo) -> bool {
        let cb = self.state.lock().registered.get(combo).cloned();
        match cb {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }

    /// Currently registered combos, sorted by display form.
    pub fn registered(&self) -> Vec<Combo> {
        let mut v: Vec<Combo> = self.state.lock().registered.keys().cloned().collect();
        v.sort_by_key(|c| c.to_string());
        v
    }

    /// Whether `combo` is registered.
    pub fn is_registered(&self, combo: &Combo) -> bool {
        self.state.lock().registered.contains_key(combo)
    }

    /// Total register attempts, successful or not.
    pub fn register_calls(&self) -> usize {
        self.state.lock().register_calls
    }

    /// Total unregister calls that released a held combo.
    pub fn unregister_calls(&self) -> usize {
        self.state.lock().unregister_calls
    }
}

impl HotkeyApi for MockHotkeyApi {
    fn register(&self, combo: &Combo, on_press: HotkeyCallback) -> bool {
        let mut s = self.state.lock();
        s.register_calls += 1;
        if s.denied.contains(combo) || s.registered.contains_key(combo) {
            return false;
        }
        s.registered.insert(combo.clone(), Arc::new(on_press));
        true
    }

    fn unregister(&self, combo: &Combo) {
        let mut s = self.state.lock();
        if s.registered.remove(combo).is_some() {
            s.unregister_calls += 1;
        }
    }
}

/// An engine wired to mocks.
pub struct Harness {
    /// The engine under test.
    pub engine: Engine,
    /// Notifications it emits.
    pub rx: UnboundedReceiver<Notification>,
    /// Mock input backend.
    pub platform: Arc<MockPlatform>,
    /// Mock hotkey backend.
    pub hotkeys: Arc<MockHotkeyApi>,
}

impl Harness {
    /// Build with default options.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Build with custom options. Must be called inside a tokio runtime.
    pub fn with_options(options: EngineOptions) -> Self {
        let platform = Arc::new(MockPlatform::new());
        let hotkeys = Arc::new(MockHotkeyApi::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(platform.clone(), hotkeys.clone(), tx, options);
        Self {
            engine,
            rx,
            platform,
            hotkeys,
        }
    }

    /// Take every notification received so far.
    pub fn drain(&mut self) -> Vec<Notification> {
        drain(&mut self.rx)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Take every notification currently queued.
pub fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

/// Let queued hotkey presses reach the engine's dispatcher.
///
/// Under paused time the runtime only advances the clock once every ready
/// task has run, so a 1ms sleep drains the dispatcher queue.
pub async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

/// Receive until `pred` matches or `timeout_ms` elapses.
pub async fn recv_until<F>(rx: &mut UnboundedReceiver<Notification>, timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut(&Notification) -> bool,
{
    timeout(Duration::from_millis(timeout_ms), async {
        while let Some(n) = rx.recv().await {
            if pred(&n) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}
