//! Statistical circuit breaker.
//!
//! Trips on the failure ratio observed over a trailing time window instead of
//! a run of consecutive failures. Open and half-open handling is the same
//! state machine the basic breaker uses.

use std::sync::Arc;
use std::time::Duration;

use crate::operation::Operation;
use crate::resilience::circuit_breaker::{BreakerCore, BreakerSnapshot, CircuitState};
use crate::resilience::recorder::SlidingWindow;
use crate::resilience::Policy;

/// Advanced circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct AdvancedCircuitBreakerConfig {
    /// Failure ratio (0.0, 1.0] at or above which the circuit opens.
    pub failure_ratio_threshold: f64,
    /// Length of the trailing window samples are kept for.
    pub sampling_duration: Duration,
    /// Samples required in the window before the ratio is considered.
    pub minimum_throughput: u32,
    /// How long the circuit stays open before a trial call is allowed.
    pub break_duration: Duration,
}

impl Default for AdvancedCircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_ratio_threshold: 0.5,
            sampling_duration: Duration::from_secs(2),
            minimum_throughput: 3,
            break_duration: Duration::from_secs(1),
        }
    }
}

/// Breaker that trips on the failure ratio over a sliding window.
#[derive(Clone)]
pub struct AdvancedCircuitBreaker {
    core: Arc<BreakerCore<SlidingWindow>>,
}

impl AdvancedCircuitBreaker {
    pub fn new(name: impl Into<String>, config: AdvancedCircuitBreakerConfig) -> Self {
        let name = name.into();
        tracing::debug!(
            circuit = %name,
            failure_ratio_threshold = config.failure_ratio_threshold,
            sampling_ms = config.sampling_duration.as_millis() as u64,
            minimum_throughput = config.minimum_throughput,
            break_ms = config.break_duration.as_millis() as u64,
            "Advanced circuit breaker initialized"
        );
        let window = SlidingWindow::new(
            config.failure_ratio_threshold,
            config.sampling_duration,
            config.minimum_throughput,
        );
        Self {
            core: Arc::new(BreakerCore::new(name, config.break_duration, window)),
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn state(&self) -> CircuitState {
        self.core.state()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        self.core.snapshot()
    }

    pub fn isolate(&self) {
        self.core.isolate();
    }

    pub fn reset(&self) {
        self.core.reset();
    }
}

impl std::fmt::Debug for AdvancedCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvancedCircuitBreaker")
            .field("name", &self.core.name())
            .field("state", &self.core.state())
            .finish()
    }
}

impl<T: Send + 'static> Policy<T> for AdvancedCircuitBreaker {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn wrap(&self, inner: Operation<T>) -> Operation<T> {
        let core = Arc::clone(&self.core);
        Operation::new(move |cancel| {
            let core = Arc::clone(&core);
            let inner = inner.clone();
            async move { core.run(&inner, cancel).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn breaker(ratio: f64, sampling_ms: u64, throughput: u32) -> AdvancedCircuitBreaker {
        AdvancedCircuitBreaker::new(
            "advanced",
            AdvancedCircuitBreakerConfig {
                failure_ratio_threshold: ratio,
                sampling_duration: Duration::from_millis(sampling_ms),
                minimum_throughput: throughput,
                break_duration: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_opens_below_minimum_throughput() {
        let cb = breaker(0.5, 2000, 3);
        let fail = Operation::<()>::fail("boom");

        // one failure per window: ratio is 100% but throughput never reaches 3
        for _ in 0..10 {
            let err = cb.execute(&fail).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::OperationFault);
            tokio::time::advance(Duration::from_millis(2000)).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_of_three_failures_opens() {
        let cb = breaker(0.5, 2000, 3);
        cb.execute(&Operation::<()>::fail("Error 0")).await.unwrap_err();
        tokio::time::advance(Duration::from_millis(500)).await;
        cb.execute(&Operation::ok(())).await.unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.execute(&Operation::<()>::fail("Error 2")).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);
        // window is cleared on opening
        assert_eq!(cb.snapshot().stats.total, 0);

        let err = cb.execute(&Operation::ok(())).await.unwrap_err();
        assert!(err.is_circuit_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_age_out_of_window() {
        let cb = breaker(0.5, 2000, 3);
        cb.execute(&Operation::<()>::fail("old")).await.unwrap_err();
        cb.execute(&Operation::<()>::fail("old")).await.unwrap_err();
        tokio::time::advance(Duration::from_millis(2500)).await;

        // the two old failures are gone: 1 failure + 2 successes
        cb.execute(&Operation::ok(())).await.unwrap();
        cb.execute(&Operation::ok(())).await.unwrap();
        cb.execute(&Operation::<()>::fail("new")).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Closed);

        let stats = cb.snapshot().stats;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_mirrors_basic_breaker() {
        let cb = breaker(0.5, 2000, 2);
        cb.execute(&Operation::<()>::fail("a")).await.unwrap_err();
        cb.execute(&Operation::<()>::fail("b")).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.execute(&Operation::<()>::fail("c")).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(1)).await;
        cb.execute(&Operation::ok(())).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().stats.total, 0);
    }
}
