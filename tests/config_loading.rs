//! Policies built from a config file behave as configured.

use std::io::Write;
use std::time::Duration;

use resilience_policy::config::{load_config, ConfigError, ValidationError};
use resilience_policy::resilience::{CircuitState, TimeoutStrategy};
use resilience_policy::{ErrorKind, Operation, Pipeline, Policy};

mod common;

use common::{failing, sleeping, Calls};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test(start_paused = true)]
async fn test_configured_pipeline() {
    let file = write_config(
        r#"
        [circuit_breaker]
        failure_threshold = 3
        break_duration_ms = 500

        [timeout]
        duration_ms = 200
        strategy = "optimistic"

        [fallback]
        handled = ["timeout"]
        "#,
    );
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.timeout.strategy, TimeoutStrategy::Optimistic);

    let breaker = config.circuit_breaker.build("configured");
    let pipeline = Pipeline::builder()
        .policy(config.fallback.build(Operation::ok("fallback")))
        .policy(breaker.clone())
        .policy(config.timeout.build())
        .build();

    let calls = Calls::new();
    let slow = sleeping(&calls, Duration::from_secs(1), "slow");
    assert_eq!(pipeline.execute(&slow).await.unwrap(), "fallback");

    // circuit_open is not handled, so rejections surface once the breaker trips
    let failing = failing(&calls);
    pipeline.execute(&failing).await.unwrap_err();
    pipeline.execute(&failing).await.unwrap_err();
    assert_eq!(breaker.state(), CircuitState::Open);
    let err = pipeline.execute(&failing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircuitOpen);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[test]
fn test_invalid_file_reports_all_problems() {
    let file = write_config(
        r#"
        [advanced_circuit_breaker]
        failure_ratio_threshold = 0.0
        minimum_throughput = 1
        "#,
    );
    match load_config(file.path()) {
        Err(ConfigError::Validation(errors)) => assert_eq!(
            errors,
            vec![
                ValidationError::FailureRatio(0.0),
                ValidationError::MinimumThroughput(1),
            ]
        ),
        other => panic!("expected validation error, got {:?}", other),
    }
}
