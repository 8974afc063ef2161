//! Execution subsystem.
//!
//! # Data Flow
//! ```text
//! Single invocation (executor.rs):
//!     execute(op) → span{execution_id} → pipeline.wrap(op) → Outcome
//!
//! Batch (executor.rs → batch.rs):
//!     execute_all(ops) → spawn one task per op → wait for all → BatchReport
//!
//! Shutdown (executor.rs):
//!     shutdown() → cancel root token → every child token observes it
//! ```
//!
//! # Design Decisions
//! - Batches never short-circuit: every member runs to completion
//! - Submission order is preserved in reports and aggregate errors
//! - A panicking member is reported as an operation fault, not propagated

pub mod batch;
pub mod executor;

pub use batch::{join_all, BatchReport};
pub use executor::{Executor, Outcome};
