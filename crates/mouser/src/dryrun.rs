//! Simulated input backend.
//!
//! Keeps a virtual pointer and logs every action instead of performing it,
//! so the full engine can be exercised on any machine.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use keymap::KeyId;
use mouser_engine::{Platform, PlatformError, Point};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// A [`Platform`] that only pretends.
#[derive(Debug, Default)]
pub struct DryRunPlatform {
    /// Virtual pointer location.
    pointer: Mutex<Point>,
    /// Clicks performed.
    clicks: AtomicU64,
    /// Keystrokes sent.
    keys: AtomicU64,
}

impl DryRunPlatform {
    /// Pointer at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the virtual pointer, as if the user moved the mouse.
    pub fn place_pointer(&self, at: Point) {
        *self.pointer.lock() = at;
        debug!(x = at.x, y = at.y, "dry_run_pointer_placed");
    }

    /// Clicks performed so far.
    pub fn clicks(&self) -> u64 {
        self.clicks.load(Ordering::Relaxed)
    }

    /// Keystrokes sent so far.
    pub fn keys(&self) -> u64 {
        self.keys.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Platform for DryRunPlatform {
    async fn set_cursor(&self, at: Point) -> Result<(), PlatformError> {
        *self.pointer.lock() = at;
        trace!(x = at.x, y = at.y, "dry_run_move");
        Ok(())
    }

    async fn click(&self) -> Result<(), PlatformError> {
        let n = self.clicks.fetch_add(1, Ordering::Relaxed) + 1;
        let at = *self.pointer.lock();
        debug!(n, x = at.x, y = at.y, "dry_run_click");
        Ok(())
    }

    async fn send_key(&self, key: KeyId) -> Result<(), PlatformError> {
        self.keys.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "dry_run_key");
        Ok(())
    }

    async fn cursor(&self) -> Result<Point, PlatformError> {
        Ok(*self.pointer.lock())
    }
}

#[cfg(test)]
mod tests {
    use mouser_engine::{ClickConfig, execute};

    use super::*;

    #[tokio::test]
    async fn executes_against_virtual_pointer() {
        let p = DryRunPlatform::new();
        execute(&p, &ClickConfig::from_parts(9, 8, 10, "tab")).await.expect("tick");
        assert_eq!(p.cursor().await.expect("cursor"), Point::new(9, 8));
        assert_eq!((p.clicks(), p.keys()), (1, 1));
        p.place_pointer(Point::new(1, 2));
        assert_eq!(p.cursor().await.expect("cursor"), Point::new(1, 2));
    }
}
