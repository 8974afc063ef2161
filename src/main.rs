//! Resilience policy scenario runner.
//!
//! Replays the four classic breaker scenarios against policies built from a
//! TOML config file (or defaults).
//!
//! ```text
//! basic                  breaker(consecutive) → op that fails
//! advanced               breaker(ratio)       → op that fails
//! timeout-consequence    breaker(ratio) → timeout → op that overruns
//! fallback-with-timeout  fallback → breaker(ratio) → timeout → slow op, fanned out
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use resilience_policy::config::{load_config, validate_config, ConfigError, PolicyConfig};
use resilience_policy::error::BoxError;
use resilience_policy::execution::{join_all, Executor, Outcome};
use resilience_policy::observability::init_logging;
use resilience_policy::operation::Operation;
use resilience_policy::resilience::{BreakerSnapshot, Pipeline};

#[derive(Parser)]
#[command(name = "resilience-policy")]
#[command(about = "Replay circuit breaker, timeout and fallback scenarios", long_about = None)]
struct Cli {
    /// TOML config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the breaker snapshot as JSON when the scenario ends.
    #[arg(long)]
    json: bool,

    /// Probability that a scenario call fails (basic and advanced).
    #[arg(long, default_value_t = 1.0)]
    failure_rate: f64,

    /// Number of calls to make.
    #[arg(short = 'n', long, default_value_t = 10)]
    iterations: usize,

    #[command(subcommand)]
    command: Scenario,
}

#[derive(Subcommand)]
enum Scenario {
    /// Consecutive-failure breaker over an operation that fails
    Basic,
    /// Failure-ratio breaker over an operation that fails
    Advanced,
    /// Ratio breaker wrapping a timeout that every call overruns
    TimeoutConsequence,
    /// Fallback over breaker and timeout, calls fanned out concurrently
    FallbackWithTimeout,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PolicyConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.logging)?;
    tracing::info!("resilience-policy v0.1.0 starting");

    let snapshot = match &cli.command {
        Scenario::Basic => basic(&config, &cli).await,
        Scenario::Advanced => advanced(&config, &cli).await,
        Scenario::TimeoutConsequence => timeout_consequence(&config, &cli).await,
        Scenario::FallbackWithTimeout => fallback_with_timeout(&config, &cli).await,
    };

    if cli.json {
        print_json(&snapshot)?;
    }
    Ok(())
}

/// Operation that fails with `Error {i}` at the configured rate.
fn flaky(i: usize, failure_rate: f64) -> Operation<()> {
    Operation::from_fn(move || async move {
        tracing::info!(execution = i, "before throw exception");
        if fastrand::f64() < failure_rate {
            Err(format!("Error {}", i))
        } else {
            Ok(())
        }
    })
}

/// Operation that sleeps for `duration` and then succeeds.
fn sleeper(i: usize, duration: Duration) -> Operation<()> {
    Operation::from_fn(move || async move {
        tracing::info!(execution = i, "before wait");
        tokio::time::sleep(duration).await;
        tracing::info!(execution = i, "after wait");
        Ok::<_, BoxError>(())
    })
}

fn report(i: usize, outcome: Outcome<()>) {
    match outcome {
        Outcome::Success(()) => tracing::info!(execution = i, "Call succeeded"),
        Outcome::Failure(err) => tracing::info!(execution = i, error = %err, "Caught failure"),
        Outcome::Rejected(err) => {
            tracing::info!(execution = i, kind = %err.kind(), error = %err, "Caught rejection")
        }
    }
}

async fn basic(config: &PolicyConfig, cli: &Cli) -> BreakerSnapshot {
    let breaker = config.circuit_breaker.build("basic");
    let executor = Executor::new(Pipeline::builder().policy(breaker.clone()).build());

    for i in 0..cli.iterations {
        tracing::info!(execution = i, state = ?breaker.state(), "Execution");
        report(i, executor.execute(&flaky(i, cli.failure_rate)).await);
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    breaker.snapshot()
}

async fn advanced(config: &PolicyConfig, cli: &Cli) -> BreakerSnapshot {
    let breaker = config.advanced_circuit_breaker.build("advanced");
    let executor = Executor::new(Pipeline::builder().policy(breaker.clone()).build());

    for i in 0..cli.iterations {
        tracing::info!(execution = i, state = ?breaker.state(), "Execution");
        report(i, executor.execute(&flaky(i, cli.failure_rate)).await);
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    breaker.snapshot()
}

async fn timeout_consequence(config: &PolicyConfig, cli: &Cli) -> BreakerSnapshot {
    let breaker = config.advanced_circuit_breaker.build("timeout-consequence");
    let timeout = config.timeout.build();
    let overrun = Duration::from_millis(config.timeout.duration_ms);
    let executor = Executor::new(
        Pipeline::builder()
            .policy(breaker.clone())
            .policy(timeout)
            .build(),
    );

    for i in 0..cli.iterations {
        tracing::info!(execution = i, state = ?breaker.state(), "Execution");
        report(i, executor.execute(&sleeper(i, overrun)).await);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    breaker.snapshot()
}

async fn fallback_with_timeout(config: &PolicyConfig, cli: &Cli) -> BreakerSnapshot {
    let breaker = config.advanced_circuit_breaker.build("fallback-with-timeout");
    let fallback = config.fallback.build(Operation::from_fn(|| async {
        tracing::info!("Fallback action");
        Ok::<_, BoxError>(())
    }));
    let executor = Executor::new(
        Pipeline::builder()
            .policy(fallback)
            .policy(breaker.clone())
            .policy(config.timeout.build())
            .build(),
    );

    // Submissions are staggered; each call outlives the timeout.
    let calls = (0..cli.iterations).map(|i| {
        let executor = executor.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(500) * i as u32).await;
            executor.execute(&sleeper(i, Duration::from_millis(3500))).await.into_result()
        }
    });

    match join_all(calls).await.into_result() {
        Ok(values) => tracing::info!(completed = values.len(), "Every call completed"),
        Err(aggregate) => {
            for failure in aggregate.failures() {
                tracing::error!(
                    execution = failure.index,
                    kind = %failure.error.kind(),
                    error = %failure.error,
                    "Call failed"
                );
            }
        }
    }
    breaker.snapshot()
}

fn print_json<S: Serialize>(value: &S) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
