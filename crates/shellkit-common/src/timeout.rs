//! Timeout utility for bounding async operations.

use std::future::Future;
use std::time::Duration;

use crate::ShellKitError;

/// Run an operation with a timeout.
///
/// Returns `ShellKitError::Timeout` if the operation does not complete within
/// the given duration.
pub async fn with_timeout<T, F, Fut>(timeout: Duration, operation: F) -> crate::Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    tokio::time::timeout(timeout, operation())
        .await
        .map_err(|_| ShellKitError::Timeout(timeout))
}
