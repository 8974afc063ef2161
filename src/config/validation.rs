//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, ratios, durations)
//! - Reject fallbacks that would never fire
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PolicyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::PolicyConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Smallest sampling window accepted, in milliseconds.
pub const MIN_SAMPLING_DURATION_MS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("circuit_breaker.failure_threshold must be at least 1")]
    FailureThreshold,

    #[error("advanced_circuit_breaker.failure_ratio_threshold must be in (0, 1], got {0}")]
    FailureRatio(f64),

    #[error("advanced_circuit_breaker.sampling_duration_ms must be at least 20, got {0}")]
    SamplingDuration(u64),

    #[error("advanced_circuit_breaker.minimum_throughput must be at least 2, got {0}")]
    MinimumThroughput(u32),

    #[error("{0}.break_duration_ms must be greater than 0")]
    BreakDuration(&'static str),

    #[error("timeout.duration_ms must be greater than 0")]
    TimeoutDuration,

    #[error("fallback.handled must name at least one error kind")]
    EmptyFallback,

    #[error("unknown log level '{0}'")]
    LogLevel(String),
}

/// Check every semantic rule and report each violation.
pub fn validate_config(config: &PolicyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(config.logging.level.clone()));
    }

    let cb = &config.circuit_breaker;
    if cb.failure_threshold < 1 {
        errors.push(ValidationError::FailureThreshold);
    }
    if cb.break_duration_ms == 0 {
        errors.push(ValidationError::BreakDuration("circuit_breaker"));
    }

    let adv = &config.advanced_circuit_breaker;
    // NaN fails both comparisons
    if !(adv.failure_ratio_threshold > 0.0 && adv.failure_ratio_threshold <= 1.0) {
        errors.push(ValidationError::FailureRatio(adv.failure_ratio_threshold));
    }
    if adv.sampling_duration_ms < MIN_SAMPLING_DURATION_MS {
        errors.push(ValidationError::SamplingDuration(adv.sampling_duration_ms));
    }
    if adv.minimum_throughput < 2 {
        errors.push(ValidationError::MinimumThroughput(adv.minimum_throughput));
    }
    if adv.break_duration_ms == 0 {
        errors.push(ValidationError::BreakDuration("advanced_circuit_breaker"));
    }

    if config.timeout.duration_ms == 0 {
        errors.push(ValidationError::TimeoutDuration);
    }

    if config.fallback.handled.is_empty() {
        errors.push(ValidationError::EmptyFallback);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&PolicyConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_violation() {
        let mut config = PolicyConfig::default();
        config.circuit_breaker.failure_threshold = 0;
        config.advanced_circuit_breaker.failure_ratio_threshold = 1.5;
        config.advanced_circuit_breaker.sampling_duration_ms = 10;
        config.advanced_circuit_breaker.minimum_throughput = 1;
        config.timeout.duration_ms = 0;
        config.fallback.handled.clear();
        config.logging.level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::LogLevel("loud".into()),
                ValidationError::FailureThreshold,
                ValidationError::FailureRatio(1.5),
                ValidationError::SamplingDuration(10),
                ValidationError::MinimumThroughput(1),
                ValidationError::TimeoutDuration,
                ValidationError::EmptyFallback,
            ]
        );
    }

    #[test]
    fn test_ratio_bounds() {
        let mut config = PolicyConfig::default();
        config.advanced_circuit_breaker.failure_ratio_threshold = 1.0;
        assert!(validate_config(&config).is_ok());

        for bad in [0.0, -0.1, f64::NAN] {
            config.advanced_circuit_breaker.failure_ratio_threshold = bad;
            assert!(validate_config(&config).is_err(), "ratio {} accepted", bad);
        }
    }

    #[test]
    fn test_error_messages_name_the_field() {
        assert_eq!(
            ValidationError::SamplingDuration(5).to_string(),
            "advanced_circuit_breaker.sampling_duration_ms must be at least 20, got 5"
        );
        assert_eq!(
            ValidationError::BreakDuration("circuit_breaker").to_string(),
            "circuit_breaker.break_duration_ms must be greater than 0"
        );
    }
}
