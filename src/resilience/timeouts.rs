//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a wrapped operation against a deadline
//! - Convert expiry into a `Timeout` error
//! - Signal or abandon the operation depending on the strategy
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the timer is dropped on early completion
//! - Pessimistic: the operation runs on its own task and is detached, not
//!   aborted, on expiry. Its eventual result is discarded and any cleanup is
//!   the operation's own business.
//! - Optimistic: the operation runs inline with a child cancellation token.
//!   On expiry the token is cancelled and the future is dropped. Work the
//!   operation spawned elsewhere only stops if it observes the token.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::error::{ResilienceError, ResilienceResult};
use crate::operation::{CancellationToken, Operation};
use crate::resilience::Policy;

/// How a timeout treats an operation that overruns its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutStrategy {
    /// Run the operation on its own task and walk away from it on expiry.
    Pessimistic,
    /// Cancel the operation's token on expiry and expect it to unwind.
    Optimistic,
}

impl fmt::Display for TimeoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutStrategy::Pessimistic => f.write_str("pessimistic"),
            TimeoutStrategy::Optimistic => f.write_str("optimistic"),
        }
    }
}

/// Timeout guard.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    name: String,
    timeout: Duration,
    strategy: TimeoutStrategy,
}

impl TimeoutPolicy {
    pub fn new(timeout: Duration, strategy: TimeoutStrategy) -> Self {
        Self {
            name: format!("timeout({}ms, {})", timeout.as_millis(), strategy),
            timeout,
            strategy,
        }
    }

    pub fn pessimistic(timeout: Duration) -> Self {
        Self::new(timeout, TimeoutStrategy::Pessimistic)
    }

    pub fn optimistic(timeout: Duration) -> Self {
        Self::new(timeout, TimeoutStrategy::Optimistic)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn strategy(&self) -> TimeoutStrategy {
        self.strategy
    }

    fn expired(&self) -> ResilienceError {
        ResilienceError::Timeout {
            timeout: self.timeout,
            strategy: self.strategy,
        }
    }

    async fn run<T: Send + 'static>(
        &self,
        op: &Operation<T>,
        cancel: CancellationToken,
    ) -> ResilienceResult<T> {
        match self.strategy {
            TimeoutStrategy::Pessimistic => {
                let mut handle = tokio::spawn(op.call(cancel));
                match timeout(self.timeout, &mut handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_err)) => Err(ResilienceError::fault(join_err)),
                    Err(_) => {
                        tracing::warn!(
                            timeout_ms = self.timeout.as_millis() as u64,
                            "Pessimistic timeout expired, abandoning operation"
                        );
                        // Dropping the handle detaches the task.
                        drop(handle);
                        Err(self.expired())
                    }
                }
            }
            TimeoutStrategy::Optimistic => {
                let child = cancel.child_token();
                match timeout(self.timeout, op.call(child.clone())).await {
                    Ok(result) => result,
                    Err(_) => {
                        child.cancel();
                        tracing::warn!(
                            timeout_ms = self.timeout.as_millis() as u64,
                            "Optimistic timeout expired, cancellation signalled"
                        );
                        Err(self.expired())
                    }
                }
            }
        }
    }
}

impl<T: Send + 'static> Policy<T> for TimeoutPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn wrap(&self, inner: Operation<T>) -> Operation<T> {
        let policy = self.clone();
        Operation::new(move |cancel| {
            let policy = policy.clone();
            let inner = inner.clone();
            async move { policy.run(&inner, cancel).await }
        })
    }
}
