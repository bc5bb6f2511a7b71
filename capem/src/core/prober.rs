//! Readiness probing with a bounded retry budget

use shared::{cluster_debug, cluster_error, cluster_info, Endpoint, LogScope};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{ClusterError, ClusterResult};
use crate::traits::ReadinessCheck;

/// Retry budget and back-off between readiness attempts
///
/// The delay doubles after every failed attempt up to `max_delay`;
/// `initial_delay == max_delay` gives a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay: delay,
            max_delay: delay,
        }
    }

    pub fn exponential(attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Pause after the failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub struct ReadinessProber {
    check: Arc<dyn ReadinessCheck>,
    policy: RetryPolicy,
}

impl ReadinessProber {
    pub fn new(check: Arc<dyn ReadinessCheck>, policy: RetryPolicy) -> Self {
        Self { check, policy }
    }

    /// Poll `endpoint` until it answers or the budget runs out
    ///
    /// Returns the number of attempts used. Exhaustion is fatal for the run.
    pub async fn probe(&self, name: &str, endpoint: &Endpoint) -> ClusterResult<u32> {
        let scope = LogScope::Node(name.to_string());

        for attempt in 1..=self.policy.attempts {
            if self.check.ping(endpoint).await {
                cluster_info!(scope, "🟢 {} answered on {} (attempt {})", name, endpoint, attempt);
                return Ok(attempt);
            }

            if attempt < self.policy.attempts {
                let delay = self.policy.delay_after(attempt);
                cluster_debug!(
                    scope,
                    "⏳ {} not ready on {} (attempt {}/{}), retrying in {:?}",
                    name,
                    endpoint,
                    attempt,
                    self.policy.attempts,
                    delay
                );
                sleep(delay).await;
            }
        }

        cluster_error!(scope, "❌ Node {} failed to come up", name);
        Err(ClusterError::ReadinessExhausted {
            name: name.to_string(),
            attempts: self.policy.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockReadinessCheck;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn endpoint() -> Endpoint {
        Endpoint::new("127.0.0.1", 32768)
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let policy = RetryPolicy::exponential(10, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        assert_eq!(policy.delay_after(40), Duration::from_millis(500));
    }

    #[test]
    fn test_fixed_policy_is_uniform() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(policy.delay_after(1), policy.delay_after(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_retries_until_ready() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut check = MockReadinessCheck::new();
        check
            .expect_ping()
            .returning(move |_| counter.fetch_add(1, Ordering::SeqCst) >= 2);

        let prober = ReadinessProber::new(Arc::new(check), RetryPolicy::fixed(5, Duration::from_secs(1)));
        let attempts = prober.probe("Dock2", &endpoint()).await.unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_exhaustion_is_fatal() {
        let mut check = MockReadinessCheck::new();
        check.expect_ping().times(4).returning(|_| false);

        let prober = ReadinessProber::new(Arc::new(check), RetryPolicy::fixed(4, Duration::from_secs(1)));
        assert_matches!(
            prober.probe("Dock3", &endpoint()).await,
            Err(ClusterError::ReadinessExhausted { name, attempts: 4 }) if name == "Dock3"
        );
    }

    #[tokio::test]
    async fn test_repeated_probes_of_ready_node_are_stable() {
        let mut check = MockReadinessCheck::new();
        check.expect_ping().times(3).returning(|_| true);

        let prober = ReadinessProber::new(Arc::new(check), RetryPolicy::fixed(2, Duration::from_secs(1)));
        for _ in 0..3 {
            assert_eq!(prober.probe("Dock1", &endpoint()).await.unwrap(), 1);
        }
    }
}
