use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::{deps::HotkeyCallback, error::PlatformError};

/// Signals raised outside a presentation call (hotkey presses, sampler
/// failures). The engine's dispatcher applies them one at a time.
#[derive(Debug)]
pub enum Command {
    /// The pick confirm combo was pressed during `session`.
    PickConfirm {
        /// Pick session the press belongs to.
        session: u64,
    },
    /// The pick cancel combo was pressed during `session`.
    PickCancel {
        /// Pick session the press belongs to.
        session: u64,
    },
    /// Pointer sampling failed during `session`.
    PickSampleFailed {
        /// Pick session the sample belongs to.
        session: u64,
        /// The failure.
        error: PlatformError,
    },
    /// Global start combo.
    HotkeyStart,
    /// Global stop combo.
    HotkeyStop,
}

/// Sender half of the dispatcher queue.
pub type CommandTx = UnboundedSender<Command>;

/// Build a hotkey callback that enqueues a command on every press.
pub fn enqueue_on_press<F>(tx: &CommandTx, make: F) -> HotkeyCallback
where
    F: Fn() -> Command + Send + Sync + 'static,
{
    let tx = tx.clone();
    Box::new(move || {
        if tx.send(make()).is_err() {
            debug!("hotkey_press_after_shutdown");
        }
    })
}
