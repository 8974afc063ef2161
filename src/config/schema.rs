//! Configuration schema definitions.
//!
//! This module defines the file-level configuration for the policy runner.
//! All types derive Serde traits for deserialization from config files.
//! Durations are expressed in milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::operation::Operation;
use crate::resilience::{
    AdvancedCircuitBreaker, AdvancedCircuitBreakerConfig, CircuitBreaker, CircuitBreakerConfig,
    FallbackPolicy, TimeoutPolicy, TimeoutStrategy,
};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Logging settings.
    pub logging: LoggingConfig,

    /// Consecutive-failure circuit breaker.
    pub circuit_breaker: CircuitBreakerSettings,

    /// Failure-ratio circuit breaker.
    pub advanced_circuit_breaker: AdvancedCircuitBreakerSettings,

    pub timeout: TimeoutSettings,

    pub fallback: FallbackSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Use the compact single-line formatter.
    pub compact: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            compact: false,
        }
    }
}

/// Consecutive-failure breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open, in milliseconds.
    pub break_duration_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            break_duration_ms: 1000,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            break_duration: Duration::from_millis(self.break_duration_ms),
        }
    }

    pub fn build(&self, name: impl Into<String>) -> CircuitBreaker {
        CircuitBreaker::new(name, self.to_config())
    }
}

/// Failure-ratio breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdvancedCircuitBreakerSettings {
    /// Failure ratio in (0.0, 1.0] at or above which the circuit opens.
    pub failure_ratio_threshold: f64,

    /// Sliding window length in milliseconds.
    pub sampling_duration_ms: u64,

    /// Minimum calls in the window before the ratio is considered.
    pub minimum_throughput: u32,

    /// How long the circuit stays open, in milliseconds.
    pub break_duration_ms: u64,
}

impl Default for AdvancedCircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_ratio_threshold: 0.5,
            sampling_duration_ms: 2000,
            minimum_throughput: 3,
            break_duration_ms: 1000,
        }
    }
}

impl AdvancedCircuitBreakerSettings {
    pub fn to_config(&self) -> AdvancedCircuitBreakerConfig {
        AdvancedCircuitBreakerConfig {
            failure_ratio_threshold: self.failure_ratio_threshold,
            sampling_duration: Duration::from_millis(self.sampling_duration_ms),
            minimum_throughput: self.minimum_throughput,
            break_duration: Duration::from_millis(self.break_duration_ms),
        }
    }

    pub fn build(&self, name: impl Into<String>) -> AdvancedCircuitBreaker {
        AdvancedCircuitBreaker::new(name, self.to_config())
    }
}

/// Timeout settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Deadline in milliseconds.
    pub duration_ms: u64,

    /// "pessimistic" or "optimistic".
    pub strategy: TimeoutStrategy,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            strategy: TimeoutStrategy::Pessimistic,
        }
    }
}

impl TimeoutSettings {
    pub fn build(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(Duration::from_millis(self.duration_ms), self.strategy)
    }
}

/// Fallback settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackSettings {
    /// Error kinds the fallback swallows.
    pub handled: Vec<ErrorKind>,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            handled: vec![ErrorKind::CircuitOpen, ErrorKind::Timeout],
        }
    }
}

impl FallbackSettings {
    pub fn build<T: Send + 'static>(&self, action: Operation<T>) -> FallbackPolicy<T> {
        FallbackPolicy::handling(self.handled.iter().copied(), action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: PolicyConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.circuit_breaker.failure_threshold, 2);
        assert_eq!(config.advanced_circuit_breaker.minimum_throughput, 3);
        assert_eq!(config.timeout.strategy, TimeoutStrategy::Pessimistic);
        assert_eq!(
            config.fallback.handled,
            vec![ErrorKind::CircuitOpen, ErrorKind::Timeout]
        );
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: PolicyConfig = toml::from_str(
            r#"
            [circuit_breaker]
            failure_threshold = 5

            [timeout]
            strategy = "optimistic"
            "#,
        )
        .unwrap();
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.break_duration_ms, 1000);
        assert_eq!(config.timeout.strategy, TimeoutStrategy::Optimistic);
        assert_eq!(config.timeout.duration_ms, 1000);
    }

    #[test]
    fn test_conversions() {
        let settings = AdvancedCircuitBreakerSettings::default();
        let runtime = settings.to_config();
        assert_eq!(runtime.sampling_duration, Duration::from_secs(2));
        assert_eq!(runtime.break_duration, Duration::from_secs(1));

        let timeout = TimeoutSettings {
            duration_ms: 250,
            strategy: TimeoutStrategy::Optimistic,
        }
        .build();
        assert_eq!(timeout.timeout(), Duration::from_millis(250));
        assert_eq!(timeout.strategy(), TimeoutStrategy::Optimistic);

        let fallback = FallbackSettings::default().build(Operation::ok(0u8));
        assert!(fallback.handles(ErrorKind::Timeout));
        assert!(!fallback.handles(ErrorKind::OperationFault));
    }

    #[test]
    fn test_unknown_error_kind_is_rejected() {
        let result: Result<PolicyConfig, _> = toml::from_str(
            r#"
            [fallback]
            handled = ["meltdown"]
            "#,
        );
        assert!(result.is_err());
    }
}
