use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace};

use crate::Point;

/// Why a pick session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickEndReason {
    /// Confirmed; the position was locked in.
    Picked,
    /// Cancelled by the user or superseded by automation.
    Cancelled,
    /// Pointer tracking failed.
    Error,
}

/// What triggered a start or stop. Carried for observers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// The presentation layer.
    Manual,
    /// A global hotkey.
    Hotkey,
}

/// Push messages from the engine to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Notification {
    /// Live pointer position while picking.
    PickPosition {
        /// Horizontal coordinate.
        x: i32,
        /// Vertical coordinate.
        y: i32,
    },
    /// A pick session ended.
    PickModeEnded {
        /// Why it ended.
        reason: PickEndReason,
        /// The locked-in position, only when picked.
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
    },
    /// The automation loop started or stopped.
    RunningChanged {
        /// Whether the loop is now running.
        running: bool,
        /// What caused the change.
        source: TriggerSource,
    },
    /// A short human-readable error.
    Error {
        /// The message.
        message: String,
    },
}

/// Sends notifications to the presentation layer.
///
/// Delivery is fire-and-forget: when the receiver is gone the message is
/// dropped and the engine carries on.
#[derive(Clone)]
pub struct NotificationDispatcher {
    /// Outbound channel.
    tx: UnboundedSender<Notification>,
}

impl NotificationDispatcher {
    /// Create a new dispatcher from a notification channel.
    pub fn new(tx: UnboundedSender<Notification>) -> Self {
        Self { tx }
    }

    /// Push a notification.
    pub fn send(&self, n: Notification) {
        if self.tx.send(n).is_err() {
            debug!("notification_dropped_receiver_closed");
        }
    }

    /// Live pointer sample. Traced rather than logged; it fires every 50ms.
    pub fn pick_position(&self, at: Point) {
        trace!(x = at.x, y = at.y, "pick_position");
        self.send(Notification::PickPosition { x: at.x, y: at.y });
    }

    /// A pick session ended.
    pub fn pick_ended(&self, reason: PickEndReason, position: Option<Point>) {
        info!(reason = ?reason, position = ?position, "pick_mode_ended");
        self.send(Notification::PickModeEnded { reason, position });
    }

    /// The automation loop changed state.
    pub fn running_changed(&self, running: bool, source: TriggerSource) {
        info!(running, source = ?source, "running_changed");
        self.send(Notification::RunningChanged { running, source });
    }

    /// Report an error message.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        info!(message = %message, "error_notification");
        self.send(Notification::Error { message });
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn wire_format() {
        let n = Notification::PickModeEnded {
            reason: PickEndReason::Picked,
            position: Some(Point::new(3, 4)),
        };
        assert_eq!(
            serde_json::to_string(&n).expect("serialize"),
            r#"{"event":"pick-mode-ended","reason":"picked","position":{"x":3,"y":4}}"#
        );
        let n = Notification::RunningChanged {
            running: true,
            source: TriggerSource::Hotkey,
        };
        assert_eq!(
            serde_json::to_string(&n).expect("serialize"),
            r#"{"event":"running-changed","running":true,"source":"hotkey"}"#
        );
        let n = Notification::PickModeEnded {
            reason: PickEndReason::Cancelled,
            position: None,
        };
        assert_eq!(
            serde_json::to_string(&n).expect("serialize"),
            r#"{"event":"pick-mode-ended","reason":"cancelled"}"#
        );
    }

    #[test]
    fn closed_receiver_is_not_an_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let d = NotificationDispatcher::new(tx);
        d.error("nobody is listening");
    }
}
