//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound connection establishment (applied on the connector)
//! - Bound the wait for the backend's response head after the upload finishes
//! - Expire idle pooled connections
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Body streaming is never bounded: bodies may be arbitrarily large
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::config::TimeoutConfig;

/// Resolved timeout settings for outbound exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTimeouts {
    pub connect: Duration,
    /// Wait for the response head, counted from the end of the upload. `None` waits forever.
    pub response: Option<Duration>,
    pub idle: Duration,
}

impl From<&TimeoutConfig> for ExchangeTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            response: (config.response_secs > 0).then(|| Duration::from_secs(config.response_secs)),
            idle: Duration::from_secs(config.idle_secs),
        }
    }
}

/// Run `future` under an optional deadline, returning the limit on expiry.
pub async fn within<F: Future>(limit: Option<Duration>, future: F) -> Result<F::Output, Duration> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await.map_err(|_| limit),
        None => Ok(future.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_response_timeout_disables_it() {
        let config = TimeoutConfig {
            connect_secs: 2,
            response_secs: 0,
            idle_secs: 10,
        };
        let timeouts = ExchangeTimeouts::from(&config);
        assert_eq!(timeouts.connect, Duration::from_secs(2));
        assert_eq!(timeouts.response, None);
    }

    #[tokio::test]
    async fn within_reports_expiry() {
        let slow = tokio::time::sleep(Duration::from_secs(5));
        assert_eq!(within(Some(Duration::from_millis(10)), slow).await, Err(Duration::from_millis(10)));
        assert_eq!(within(None, async { 7 }).await, Ok(7));
    }
}
