//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline::execute(op):
//!     → outermost policy (e.g. fallback.rs: swallow declared error kinds)
//!     → circuit_breaker.rs / advanced.rs (reject while open, record outcomes)
//!     → timeouts.rs (race the operation against a deadline)
//!     → operation
//!     ← result/error unwinds outward through the same policies
//! ```
//!
//! # Design Decisions
//! - Every guard is a [`Policy`]: it turns an operation into a guarded one
//! - Wrapping builds closures only; nothing runs until the operation is called
//! - Breaker state lives behind an `Arc` and is shared by every wrapped copy
//! - Errors keep their [`ErrorKind`](crate::error::ErrorKind) on the way out

pub mod advanced;
pub mod circuit_breaker;
pub mod fallback;
pub mod pipeline;
pub mod recorder;
pub mod timeouts;

pub use advanced::{AdvancedCircuitBreaker, AdvancedCircuitBreakerConfig};
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use fallback::{FallbackBuilder, FallbackPolicy};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use recorder::{ConsecutiveFailures, OutcomeRecorder, RecorderStats, SlidingWindow};
pub use timeouts::{TimeoutPolicy, TimeoutStrategy};

use crate::error::ResilienceResult;
use crate::operation::{BoxFuture, CancellationToken, Operation};

/// A guard that can be wrapped around an operation.
pub trait Policy<T>: Send + Sync {
    /// Name used in logs and pipeline introspection.
    fn name(&self) -> &str;

    /// Produce an operation that runs `inner` under this policy.
    fn wrap(&self, inner: Operation<T>) -> Operation<T>;

    /// Run `op` once under this policy with a fresh cancellation token.
    fn execute(&self, op: &Operation<T>) -> BoxFuture<ResilienceResult<T>>
    where
        T: Send + 'static,
    {
        self.wrap(op.clone()).call(CancellationToken::new())
    }
}
