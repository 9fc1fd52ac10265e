use std::{sync::Arc, time::Instant};

use keymap::{Combo, KeyId, Modifier};
use tracing::{debug, warn};

use crate::{
    command::{Command, CommandTx, enqueue_on_press},
    deps::HotkeyApi,
    notification::NotificationDispatcher,
};

/// Global start combo unless configured otherwise.
pub const DEFAULT_START_COMBO: &str = "ctrl+shift+f9";
/// Global stop combo unless configured otherwise.
pub const DEFAULT_STOP_COMBO: &str = "ctrl+shift+f10";

/// `ctrl+shift+<key>`.
pub fn ctrl_shift(key: KeyId) -> Combo {
    Combo::new([Modifier::Control, Modifier::Shift], key)
}

/// Owns the process-lifetime start/stop bindings.
///
/// Installed at most once and torn down at most once. A combo that failed
/// to register stays unbound; the other one keeps working.
pub struct GlobalBindings {
    /// Registration backend.
    api: Arc<dyn HotkeyApi>,
    /// Start combo.
    start: Combo,
    /// Stop combo.
    stop: Combo,
    /// Combos that registered successfully and are still held.
    bound: Vec<Combo>,
    /// Whether install has run.
    installed: bool,
}

impl GlobalBindings {
    /// Create an uninstalled manager for the two combos.
    pub fn new(api: Arc<dyn HotkeyApi>, start: Combo, stop: Combo) -> Self {
        Self {
            api,
            start,
            stop,
            bound: Vec::new(),
            installed: false,
        }
    }

    /// Combos currently held.
    pub fn bound(&self) -> &[Combo] {
        &self.bound
    }

    /// Register the start and stop combos. Returns true when both are held.
    ///
    /// A second call does not register again and reports the first outcome.
    pub fn install(&mut self, commands: &CommandTx, notifier: &NotificationDispatcher) -> bool {
        if self.installed {
            debug!("global_bindings_already_installed");
            return self.bound.len() == 2;
        }
        self.installed = true;
        let begin = Instant::now();

        let start_ok = self
            .api
            .register(&self.start, enqueue_on_press(commands, || Command::HotkeyStart));
        if start_ok {
            self.bound.push(self.start.clone());
        }
        let stop_ok = self
            .api
            .register(&self.stop, enqueue_on_press(commands, || Command::HotkeyStop));
        if stop_ok {
            self.bound.push(self.stop.clone());
        }

        debug!(
            start = %self.start,
            stop = %self.stop,
            start_ok,
            stop_ok,
            elapsed = ?begin.elapsed(),
            "global_bindings_installed"
        );
        if !(start_ok && stop_ok) {
            warn!(start_ok, stop_ok, "global_bindings_partial");
            notifier.error(format!(
                "Unable to register global hotkeys ({} / {}). Use Start/Stop in the app instead.",
                self.start, self.stop
            ));
        }
        start_ok && stop_ok
    }

    /// Release every held combo. Later calls are no-ops.
    pub fn teardown(&mut self) {
        for combo in self.bound.drain(..) {
            self.api.unregister(&combo);
            debug!(combo = %combo, "global_binding_released");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        notification::Notification,
        test_support::{MockHotkeyApi, drain},
    };

    #[test]
    fn default_combos_match_constants() {
        assert_eq!(ctrl_shift(KeyId::F9).to_string(), DEFAULT_START_COMBO);
        assert_eq!(ctrl_shift(KeyId::F10).to_string(), DEFAULT_STOP_COMBO);
    }

    #[test]
    fn partial_install_keeps_what_registered() {
        let api = Arc::new(MockHotkeyApi::new());
        api.deny(&ctrl_shift(KeyId::F10));
        let (ctx, mut crx) = mpsc::unbounded_channel();
        let (ntx, mut nrx) = mpsc::unbounded_channel();
        let notifier = NotificationDispatcher::new(ntx);
        let mut b = GlobalBindings::new(api.clone(), ctrl_shift(KeyId::F9), ctrl_shift(KeyId::F10));

        assert!(!b.install(&ctx, &notifier));
        assert_eq!(b.bound(), &[ctrl_shift(KeyId::F9)]);
        let msgs = drain(&mut nrx);
        assert!(matches!(
            &msgs[..],
            [Notification::Error { message }] if message.contains("ctrl+shift+f9 / ctrl+shift+f10")
        ));

        assert!(api.press(&ctrl_shift(KeyId::F9)));
        assert!(matches!(crx.try_recv(), Ok(Command::HotkeyStart)));

        // Second install is a no-op.
        assert!(!b.install(&ctx, &notifier));
        assert_eq!(api.register_calls(), 2);

        b.teardown();
        b.teardown();
        assert!(api.registered().is_empty());
        assert_eq!(api.unregister_calls(), 1);
    }
}
