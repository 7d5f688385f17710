//! Conch Runtime - configuration, logging and the interactive loop.
//!
//! This crate provides:
//! - Layered configuration (`ConchConfig`, `ConfigLoader`)
//! - Tracing subscriber setup (`LoggingBuilder`)
//! - The interactive loop (`ConsoleRuntime`) over an `InputSource`
//! - Console output printing and an optional JSON-lines mirror
//!
//! ```ignore
//! use conch_runtime::ConsoleRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = ConsoleRuntime::builder().build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod mirror;
pub mod output;
pub mod runtime;

pub use config::{ConchConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, RuntimeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use input::{InputSource, ScriptSource, StdinSource};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ConsoleRuntime, RuntimeBuilder, RuntimeStats, shutdown_signal};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for command implementations.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
