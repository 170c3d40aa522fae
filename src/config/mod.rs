//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → lifecycle::startup builds handlers from it
//! ```
//!
//! # Design Decisions
//! - Process config is immutable once loaded; rule files hot-reload on
//!   their own (see `handlers::rules`)
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, DispatchConfig, HandlersConfig, HostsHandlerConfig, ListenerConfig,
    ObservabilityConfig, RedirectHandlerConfig, RouterConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
