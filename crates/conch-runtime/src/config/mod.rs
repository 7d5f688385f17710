//! Configuration for the Conch runtime.
//!
//! Settings are layered with figment (defaults, config files, `CONCH_*`
//! environment variables, programmatic overrides) and checked by
//! [`validate_config`] before the runtime starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ConchConfig, LogFormat, LogOutput, LogRotation, LoggingConfig, LoggingLevel, RuntimeConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
