//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PolicyConfig (validated, immutable)
//!     → each section builds its runtime policy
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; policies are not reconfigured in place
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AdvancedCircuitBreakerSettings;
pub use schema::CircuitBreakerSettings;
pub use schema::FallbackSettings;
pub use schema::LoggingConfig;
pub use schema::PolicyConfig;
pub use schema::TimeoutSettings;
pub use validation::{validate_config, ValidationError};
