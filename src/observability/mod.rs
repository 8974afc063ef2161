//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → execution spans (execution_id correlation)
//!
//! Consumers:
//!     → stdout via the fmt layer
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (circuit, state, timeout_ms)
//! - Execution ID flows through every policy of one invocation
//! - State transitions log at info/warn, admissions at debug

pub mod logging;

pub use logging::init_logging;
