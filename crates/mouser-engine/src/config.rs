//! Click configuration and its wire form.

use keymap::KeyId;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Minimum repeat interval. Shorter requests are raised to this, never rejected.
pub const MIN_INTERVAL_MS: u64 = 10;

/// Interval used when a request omits one.
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// A screen position in integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Construct a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Parameters for one automation session: where to click, how often, and
/// which key (if any) to press after each click.
///
/// Fields are private so the interval floor holds on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickConfig {
    /// Target horizontal coordinate.
    x: i32,
    /// Target vertical coordinate.
    y: i32,
    /// Milliseconds between ticks, at least [`MIN_INTERVAL_MS`].
    interval_ms: u64,
    /// Free-text key name, resolved at execution time.
    key: String,
}

impl ClickConfig {
    /// Validate and normalize raw numeric input.
    ///
    /// Coordinates are rounded and must be finite and fit in `i32`. The
    /// interval must be finite; it is rounded and raised to
    /// [`MIN_INTERVAL_MS`].
    pub fn new(x: f64, y: f64, interval_ms: f64, key: impl Into<String>) -> Result<Self> {
        let x = coordinate("x", x)?;
        let y = coordinate("y", y)?;
        if !interval_ms.is_finite() {
            return Err(Error::InvalidConfig(
                "interval must be a finite number of milliseconds".into(),
            ));
        }
        // Negative and sub-minimum values collapse to the floor.
        let interval = interval_ms.round().clamp(0.0, u64::MAX as f64) as u64;
        Ok(Self::from_parts(x, y, interval, key))
    }

    /// Build from already-integral values, applying the interval floor.
    pub fn from_parts(x: i32, y: i32, interval_ms: u64, key: impl Into<String>) -> Self {
        Self {
            x,
            y,
            interval_ms: interval_ms.max(MIN_INTERVAL_MS),
            key: key.into(),
        }
    }

    /// Target position.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Target horizontal coordinate.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Target vertical coordinate.
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Effective repeat interval in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Raw key text as submitted.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The key to send after each click, or `None` for no key.
    pub fn resolved_key(&self) -> Option<KeyId> {
        keymap::resolve(&self.key)
    }

    /// Copy of this config aimed at a different point.
    pub fn with_point(&self, at: Point) -> Self {
        Self {
            x: at.x,
            y: at.y,
            ..self.clone()
        }
    }
}

/// Round and range-check one coordinate.
fn coordinate(axis: &str, v: f64) -> Result<i32> {
    if !v.is_finite() {
        return Err(Error::InvalidConfig(format!("{axis} must be a finite number")));
    }
    let r = v.round();
    if r < f64::from(i32::MIN) || r > f64::from(i32::MAX) {
        return Err(Error::InvalidConfig(format!("{axis} is out of range")));
    }
    Ok(r as i32)
}

/// Configuration as submitted across the presentation boundary.
///
/// Numbers arrive untyped; [`ConfigRequest::into_config`] validates them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigRequest {
    /// Horizontal coordinate.
    pub x: Option<f64>,
    /// Vertical coordinate.
    pub y: Option<f64>,
    /// Repeat interval in milliseconds.
    pub interval_ms: Option<f64>,
    /// Key name to press after each click.
    pub key: Option<String>,
}

impl ConfigRequest {
    /// Validate into a [`ClickConfig`]. Missing coordinates default to 0;
    /// present but non-finite ones are rejected.
    pub fn into_config(self) -> Result<ClickConfig> {
        let x = self.x.unwrap_or(0.0);
        let y = self.y.unwrap_or(0.0);
        let interval = self.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS as f64);
        ClickConfig::new(x, y, interval, self.key.unwrap_or_default())
    }
}
