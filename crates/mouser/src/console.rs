//! Stdin-driven hotkeys.
//!
//! Without OS-level hotkeys, a combo "press" is a line typed on stdin
//! (`enter`, `escape`, `ctrl+shift+f9`). In dry-run mode `move X Y`
//! repositions the virtual pointer.

use std::{collections::HashMap, sync::Arc};

use keymap::Combo;
use mouser_engine::{HotkeyApi, HotkeyCallback, Point};
use parking_lot::Mutex;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::dryrun::DryRunPlatform;

/// A [`HotkeyApi`] whose presses are typed lines.
#[derive(Default)]
pub struct ConsoleHotkeys {
    /// Registered combos.
    bound: Mutex<HashMap<Combo, Arc<HotkeyCallback>>>,
}

/// What a console line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// A bound combo fired.
    Pressed(Combo),
    /// A valid combo that nothing is bound to.
    Unbound(Combo),
    /// `move X Y`.
    Move(Point),
    /// Blank line.
    Empty,
    /// Anything else.
    Invalid(String),
}

impl ConsoleHotkeys {
    /// No combos bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Combos currently bound, in display order.
    pub fn bound(&self) -> Vec<Combo> {
        let mut v: Vec<Combo> = self.bound.lock().keys().cloned().collect();
        v.sort_by_key(ToString::to_string);
        v
    }

    /// Fire `combo` if bound.
    pub fn press(&self, combo: &Combo) -> bool {
        let cb = self.bound.lock().get(combo).cloned();
        cb.is_some_and(|cb| {
            cb();
            true
        })
    }

    /// Interpret one line of input, firing a combo when it names one.
    pub fn handle_line(&self, line: &str) -> ConsoleInput {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleInput::Empty;
        }
        if let Some(at) = parse_move(line) {
            return ConsoleInput::Move(at);
        }
        match Combo::parse(line) {
            Ok(combo) if self.press(&combo) => ConsoleInput::Pressed(combo),
            Ok(combo) => ConsoleInput::Unbound(combo),
            Err(e) => ConsoleInput::Invalid(e.to_string()),
        }
    }
}

impl HotkeyApi for ConsoleHotkeys {
    fn register(&self, combo: &Combo, on_press: HotkeyCallback) -> bool {
        let mut bound = self.bound.lock();
        if bound.contains_key(combo) {
            return false;
        }
        bound.insert(combo.clone(), Arc::new(on_press));
        debug!(combo = %combo, "console_hotkey_bound");
        true
    }

    fn unregister(&self, combo: &Combo) {
        if self.bound.lock().remove(combo).is_some() {
            debug!(combo = %combo, "console_hotkey_released");
        }
    }
}

/// Parse `move X Y`.
fn parse_move(line: &str) -> Option<Point> {
    let mut parts = line.split_whitespace();
    if !parts.next()?.eq_ignore_ascii_case("move") {
        return None;
    }
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some(Point::new(x, y))
}

/// Read stdin lines until EOF, feeding them to `hotkeys`.
pub fn spawn_reader(hotkeys: Arc<ConsoleHotkeys>, pointer: Option<Arc<DryRunPlatform>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "console_read_failed");
                    break;
                }
            };
            match hotkeys.handle_line(&line) {
                ConsoleInput::Move(at) => match &pointer {
                    Some(p) => p.place_pointer(at),
                    None => warn!("move is only available with --dry-run"),
                },
                ConsoleInput::Unbound(combo) => {
                    let bound: Vec<String> = hotkeys.bound().iter().map(ToString::to_string).collect();
                    warn!(combo = %combo, ?bound, "combo_not_bound");
                }
                ConsoleInput::Invalid(msg) => warn!(input = %line.trim(), error = %msg, "console_input_ignored"),
                ConsoleInput::Pressed(_) | ConsoleInput::Empty => {}
            }
        }
        debug!("console_reader_exited");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use keymap::KeyId;

    use super::*;

    #[test]
    fn typed_combo_fires_callback() {
        let hk = ConsoleHotkeys::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        assert!(hk.register(
            &Combo::key_only(KeyId::Enter),
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
        ));
        assert!(!hk.register(&Combo::key_only(KeyId::Enter), Box::new(|| {})));

        assert_eq!(
            hk.handle_line("  Enter "),
            ConsoleInput::Pressed(Combo::key_only(KeyId::Enter))
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            hk.handle_line("escape"),
            ConsoleInput::Unbound(Combo::key_only(KeyId::Escape))
        );

        hk.unregister(&Combo::key_only(KeyId::Enter));
        assert!(hk.bound().is_empty());
        assert!(matches!(hk.handle_line("enter"), ConsoleInput::Unbound(_)));
    }

    #[test]
    fn move_and_garbage() {
        let hk = ConsoleHotkeys::new();
        assert_eq!(hk.handle_line("move 10 -5"), ConsoleInput::Move(Point::new(10, -5)));
        assert!(matches!(hk.handle_line("move 1"), ConsoleInput::Invalid(_)));
        assert!(matches!(hk.handle_line("ctrl+"), ConsoleInput::Invalid(_)));
        assert_eq!(hk.handle_line("   "), ConsoleInput::Empty);
    }
}
