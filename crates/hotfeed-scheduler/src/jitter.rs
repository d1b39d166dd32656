//! Random start delay for scheduled jobs.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Upper bound on the random delay before a job starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JitterConfig {
    /// Maximum delay in seconds (0 disables jitter)
    pub max_jitter_secs: u64,
}

impl JitterConfig {
    pub fn new(max_jitter_secs: u64) -> Self {
        Self { max_jitter_secs }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.max_jitter_secs > 0
    }

    /// Pick a delay in `[0, max_jitter_secs)` with millisecond resolution.
    pub fn generate_jitter(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let jitter_ms = rand::rng().random_range(0..self.max_jitter_secs * 1000);
        Duration::from_millis(jitter_ms)
    }

    /// Sleep for a random delay unless `token` is cancelled first.
    ///
    /// Returns false if cancellation cut the delay short.
    pub async fn delay(&self, token: &CancellationToken) -> bool {
        let jitter = self.generate_jitter();
        if jitter.is_zero() {
            return !token.is_cancelled();
        }
        debug!(jitter_ms = jitter.as_millis() as u64, "Applying jitter delay");
        tokio::select! {
            _ = tokio::time::sleep(jitter) => true,
            _ = token.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_jitter() {
        assert_eq!(JitterConfig::none().generate_jitter(), Duration::ZERO);
        assert!(!JitterConfig::new(0).is_enabled());
    }

    #[test]
    fn test_jitter_bounded_and_varied() {
        let config = JitterConfig::new(3);
        let samples: Vec<Duration> = (0..500).map(|_| config.generate_jitter()).collect();
        assert!(samples.iter().all(|d| *d < Duration::from_secs(3)));

        let distinct: std::collections::HashSet<_> = samples.iter().map(|d| d.as_millis()).collect();
        assert!(distinct.len() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_waits_at_most_max() {
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();
        assert!(JitterConfig::new(2).delay(&token).await);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let token = CancellationToken::new();
        assert!(JitterConfig::none().delay(&token).await);

        token.cancel();
        assert!(!JitterConfig::none().delay(&token).await);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_delay() {
        let token = CancellationToken::new();
        token.cancel();

        let start = tokio::time::Instant::now();
        assert!(!JitterConfig::new(3600).delay(&token).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
