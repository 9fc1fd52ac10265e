//! One automation tick: move, click, then an optional key.

use tracing::trace;

use crate::{ClickConfig, deps::Platform, error::PlatformError};

/// Perform one tick for `config`.
///
/// Steps run in strict order and stop at the first failure: move the
/// pointer to the configured point, click, then send the resolved key when
/// there is one. No retries happen here.
pub async fn execute(platform: &dyn Platform, config: &ClickConfig) -> Result<(), PlatformError> {
    let at = config.point();
    platform.set_cursor(at).await?;
    platform.click().await?;
    if let Some(key) = config.resolved_key() {
        platform.send_key(key).await?;
    }
    trace!(x = at.x, y = at.y, key = %config.key(), "tick_executed");
    Ok(())
}
