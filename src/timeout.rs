//! Deadline utilities for bounding subprocess probes.
//!
//! Unlike a hard failure, an elapsed deadline is reported as a value so the
//! caller decides what running out of time means.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Default bound on a single runtime probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout configuration for a bounded operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Maximum duration for the operation
    pub duration: Duration,
    /// Operation name for logging
    pub operation_name: String,
}

impl TimeoutConfig {
    pub fn new(duration: Duration, operation: impl Into<String>) -> Self {
        Self {
            duration,
            operation_name: operation.into(),
        }
    }
}

/// Outcome of racing a future against its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deadline<T> {
    Completed(T),
    Elapsed(Duration),
}

/// Drive `future` until it finishes or `config.duration` passes.
///
/// On expiry the future is dropped, so any resources it owns must be safe to
/// abandon mid-flight.
pub async fn with_deadline<T, F>(config: &TimeoutConfig, future: F) -> Deadline<T>
where
    F: Future<Output = T>,
{
    match timeout(config.duration, future).await {
        Ok(value) => Deadline::Completed(value),
        Err(_) => {
            debug!(
                operation = %config.operation_name,
                timeout_ms = config.duration.as_millis() as u64,
                "Deadline elapsed"
            );
            Deadline::Elapsed(config.duration)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_completed() {
        let config = TimeoutConfig::new(Duration::from_secs(1), "test_operation");

        let result = with_deadline(&config, async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            42
        })
        .await;

        assert_eq!(result, Deadline::Completed(42));
    }

    #[tokio::test]
    async fn test_deadline_elapsed() {
        let config = TimeoutConfig::new(Duration::from_millis(50), "test_operation");

        let result = with_deadline(&config, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            42
        })
        .await;

        assert_eq!(result, Deadline::Elapsed(Duration::from_millis(50)));
    }
}
