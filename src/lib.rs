//! Composable resilience policies for async operations.
//!
//! Circuit breakers (consecutive-failure and failure-ratio), timeouts
//! (pessimistic and optimistic) and fallbacks, wrapped around an
//! [`Operation`] in a fixed order by a [`Pipeline`] and run through an
//! [`Executor`].

pub mod config;
pub mod error;
pub mod execution;
pub mod observability;
pub mod operation;
pub mod resilience;

pub use config::schema::PolicyConfig;
pub use error::{AggregateError, ErrorKind, RejectReason, ResilienceError, ResilienceResult};
pub use execution::{BatchReport, Executor, Outcome};
pub use operation::{CancellationToken, Operation};
pub use resilience::{Pipeline, Policy};
