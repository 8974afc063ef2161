//! Error taxonomy for the policy engine.
//!
//! Every guard reports failures through [`ResilienceError`]. The
//! [`ErrorKind`] of an error is what fallback policies match on, so a kind is
//! never changed while an error travels outward through a pipeline unless a
//! guard deliberately converts it (timeout on expiry).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::timeouts::TimeoutStrategy;

/// Boxed error raised by a protected operation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for policy execution.
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Classification used for matching errors (e.g. a fallback's handled set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    OperationFault,
    CircuitOpen,
    Timeout,
    Aggregate,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::OperationFault,
        ErrorKind::CircuitOpen,
        ErrorKind::Timeout,
        ErrorKind::Aggregate,
    ];
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::OperationFault => "operation_fault",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

/// Why a circuit breaker refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The break duration has not elapsed yet.
    Open { retry_after: Duration },
    /// A half-open trial call is already outstanding.
    TrialInFlight,
    /// The breaker was isolated manually.
    Isolated,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Open { retry_after } => {
                write!(f, "circuit is open, retry after {}ms", retry_after.as_millis())
            }
            RejectReason::TrialInFlight => write!(f, "half-open trial already in flight"),
            RejectReason::Isolated => write!(f, "circuit is isolated"),
        }
    }
}

/// Errors surfaced by guards and pipelines.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The operation itself failed; the original error is kept as the source.
    #[error("operation fault: {0}")]
    OperationFault(#[source] BoxError),

    /// The call was rejected by a circuit breaker without being invoked.
    #[error("circuit '{circuit}' rejected the call: {reason}")]
    CircuitOpen { circuit: String, reason: RejectReason },

    /// The deadline expired before the operation completed.
    #[error("operation timed out after {}ms ({strategy} timeout)", .timeout.as_millis())]
    Timeout {
        timeout: Duration,
        strategy: TimeoutStrategy,
    },

    /// One or more members of a concurrent batch failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl ResilienceError {
    /// Wrap an operation's own error.
    pub fn fault(err: impl Into<BoxError>) -> Self {
        ResilienceError::OperationFault(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResilienceError::OperationFault(_) => ErrorKind::OperationFault,
            ResilienceError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            ResilienceError::Timeout { .. } => ErrorKind::Timeout,
            ResilienceError::Aggregate(_) => ErrorKind::Aggregate,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        self.kind() == ErrorKind::CircuitOpen
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// True when a guard produced this error rather than the operation.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::CircuitOpen | ErrorKind::Timeout)
    }
}

/// A single failed member of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the member in submission order.
    pub index: usize,
    pub error: ResilienceError,
}

/// Every failure from a concurrent batch, never just the first.
#[derive(Debug)]
pub struct AggregateError {
    total: usize,
    failures: Vec<BatchFailure>,
}

impl AggregateError {
    pub fn new(total: usize, failures: Vec<BatchFailure>) -> Self {
        Self { total, failures }
    }

    /// Number of members in the batch, failed or not.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Kinds of the failed members, in submission order.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.failures.iter().map(|f| f.error.kind()).collect()
    }

    pub fn into_failures(self) -> Vec<BatchFailure> {
        self.failures
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} operations failed", self.failures.len(), self.total)?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}[{}] {}", sep, failure.index, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
