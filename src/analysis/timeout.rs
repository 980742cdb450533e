//! Per-call timeout wrapper.

use crate::types::{AppError, Result};
use std::future::Future;
use std::time::Duration;

/// Bound `operation` to `duration`. If the timer fires first the operation is
/// abandoned, not cancelled: a call raced elsewhere may still complete in the
/// background, but its result is discarded. The failure carries `label` so
/// the scheduler can attribute it.
pub async fn with_timeout<T>(
    operation: impl Future<Output = Result<T>>,
    duration: Duration,
    label: &str,
) -> Result<T> {
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Provider(format!(
            "{} timed out after {}s",
            label,
            duration.as_secs()
        ))),
    }
}
