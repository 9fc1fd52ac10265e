//! Terminal rendering of engine notifications.

use std::io::{self, Write as _};

use mouser_engine::{Notification, PickEndReason, RunState, TriggerSource};
use tracing::debug;

/// How a notification should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// A line of its own.
    Line(String),
    /// Overwrites the current line; used for the live pointer readout.
    Inline(String),
}

/// Tracks the status indicator and formats notifications.
#[derive(Debug)]
pub struct Presenter {
    /// Status as last reported by the engine.
    status: RunState,
    /// Emit JSON lines instead of prose.
    json: bool,
    /// Whether an inline readout is on screen and needs a newline first.
    inline_open: bool,
}

impl Presenter {
    /// A presenter that starts idle.
    pub fn new(json: bool) -> Self {
        Self {
            status: RunState::Idle,
            json,
            inline_open: false,
        }
    }

    /// Current status indicator.
    pub fn status(&self) -> RunState {
        self.status
    }

    /// Update the status from `n` and render it.
    pub fn apply(&mut self, n: &Notification) -> Rendered {
        match n {
            Notification::PickPosition { .. } => self.status = RunState::Picking,
            Notification::PickModeEnded { .. } => self.status = RunState::Idle,
            Notification::RunningChanged { running, .. } => {
                self.status = if *running {
                    RunState::Running
                } else {
                    RunState::Idle
                };
            }
            Notification::Error { .. } => {}
        }

        if self.json {
            return Rendered::Line(serde_json::to_string(n).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}")));
        }
        let status = self.status;
        match n {
            Notification::PickPosition { x, y } => Rendered::Inline(format!("[{status}] pointer at {x}, {y}")),
            Notification::PickModeEnded { reason, position } => Rendered::Line(match (reason, position) {
                (PickEndReason::Picked, Some(p)) => format!("[{status}] picked {}, {}", p.x, p.y),
                (PickEndReason::Picked, None) => format!("[{status}] picked"),
                (PickEndReason::Cancelled, _) => format!("[{status}] pick cancelled"),
                (PickEndReason::Error, _) => format!("[{status}] pick failed"),
            }),
            Notification::RunningChanged { running, source } => {
                let verb = if *running { "started" } else { "stopped" };
                let via = match source {
                    TriggerSource::Manual => "",
                    TriggerSource::Hotkey => " (hotkey)",
                };
                Rendered::Line(format!("[{status}] {verb}{via}"))
            }
            Notification::Error { message } => Rendered::Line(format!("[{status}] error: {message}")),
        }
    }

    /// Render `n` to stdout.
    pub fn show(&mut self, n: &Notification) {
        match self.apply(n) {
            Rendered::Inline(text) => {
                self.inline_open = true;
                let mut out = io::stdout().lock();
                if let Err(e) = write!(out, "\r{text}    ").and_then(|()| out.flush()) {
                    debug!(error = %e, "stdout_write_failed");
                }
            }
            Rendered::Line(text) => self.line(&text),
        }
    }

    /// Print a plain message outside the notification stream. Suppressed in
    /// JSON mode so stdout stays machine-readable.
    pub fn say(&mut self, text: &str) {
        if !self.json {
            self.line(text);
        }
    }

    /// Write one line, closing any inline readout first.
    fn line(&mut self, text: &str) {
        let lead = if self.inline_open { "\n" } else { "" };
        self.inline_open = false;
        println!("{lead}{text}");
    }
}

#[cfg(test)]
mod tests {
    use mouser_engine::Point;

    use super::*;

    #[test]
    fn status_follows_notifications() {
        let mut p = Presenter::new(false);
        assert_eq!(
            p.apply(&Notification::PickPosition { x: 3, y: 4 }),
            Rendered::Inline("[picking] pointer at 3, 4".into())
        );
        assert_eq!(p.status(), RunState::Picking);
        assert_eq!(
            p.apply(&Notification::PickModeEnded {
                reason: PickEndReason::Picked,
                position: Some(Point::new(3, 4)),
            }),
            Rendered::Line("[idle] picked 3, 4".into())
        );
        assert_eq!(
            p.apply(&Notification::RunningChanged {
                running: true,
                source: TriggerSource::Hotkey,
            }),
            Rendered::Line("[running] started (hotkey)".into())
        );
        assert_eq!(
            p.apply(&Notification::Error {
                message: "click failed: gone".into()
            }),
            Rendered::Line("[running] error: click failed: gone".into())
        );
        assert_eq!(p.status(), RunState::Running);
    }

    #[test]
    fn json_mode_uses_wire_format() {
        let mut p = Presenter::new(true);
        assert_eq!(
            p.apply(&Notification::RunningChanged {
                running: false,
                source: TriggerSource::Manual,
            }),
            Rendered::Line(r#"{"event":"running-changed","running":false,"source":"manual"}"#.into())
        );
        assert_eq!(p.status(), RunState::Idle);
    }
}
