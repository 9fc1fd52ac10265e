use std::time::{SystemTime, UNIX_EPOCH};

use mouser_engine::{ClickConfig, DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS};
use serde::{Deserialize, Serialize};

/// Longest profile name kept, in characters.
pub const MAX_NAME_CHARS: usize = 40;

/// A named click configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// Stable identifier, `<millis>-<hex>`.
    pub id: String,
    /// Display name, at most [`MAX_NAME_CHARS`] characters.
    pub name: String,
    /// Target horizontal coordinate.
    pub x: i32,
    /// Target vertical coordinate.
    pub y: i32,
    /// Milliseconds between ticks.
    pub interval_ms: u64,
    /// Free-text key name.
    pub key: String,
    /// Last save time, milliseconds since the epoch.
    pub updated_at_ms: u64,
}

impl Profile {
    /// The click configuration this profile stores.
    pub fn config(&self) -> ClickConfig {
        ClickConfig::from_parts(self.x, self.y, self.interval_ms, self.key.clone())
    }

    /// One-line summary for listings.
    pub fn summary(&self) -> String {
        let key = if self.key.is_empty() { "no key" } else { &self.key };
        format!("X{} Y{} | {}ms | {}", self.x, self.y, self.interval_ms, key)
    }
}

/// A profile as found on disk: every field optional, values unchecked.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawProfile {
    /// Identifier, generated when missing.
    id: Option<String>,
    /// Name; entries without one are dropped.
    name: Option<String>,
    /// Horizontal coordinate.
    x: Option<i64>,
    /// Vertical coordinate.
    y: Option<i64>,
    /// Interval; missing or zero means the default.
    interval_ms: Option<i64>,
    /// Key name.
    key: Option<String>,
    /// Last save time.
    updated_at_ms: Option<u64>,
}

impl RawProfile {
    /// Normalize into a [`Profile`], or `None` when the entry has no name.
    pub fn normalize(self, now_ms: u64) -> Option<Profile> {
        let name = truncate_name(&self.name?);
        let interval_ms = match self.interval_ms {
            None | Some(0) => DEFAULT_INTERVAL_MS,
            Some(n) => u64::try_from(n).unwrap_or(0).max(MIN_INTERVAL_MS),
        };
        Some(Profile {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| new_id(now_ms)),
            name,
            x: clamp_coord(self.x),
            y: clamp_coord(self.y),
            interval_ms,
            key: self.key.unwrap_or_default(),
            updated_at_ms: self.updated_at_ms.unwrap_or(now_ms),
        })
    }
}

/// Missing coordinates read as zero; out-of-range ones saturate.
fn clamp_coord(v: Option<i64>) -> i32 {
    let v = v.unwrap_or(0).clamp(i64::from(i32::MIN), i64::from(i32::MAX));
    i32::try_from(v).unwrap_or_default()
}

/// Keep at most [`MAX_NAME_CHARS`] characters.
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}

/// Fresh identifier for a profile created at `now_ms`.
pub fn new_id(now_ms: u64) -> String {
    format!("{now_ms}-{:x}", rand::random::<u64>() >> 12)
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
