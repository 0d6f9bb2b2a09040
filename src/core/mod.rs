//! The core module of the PSE post-processing pipeline.
//!
//! This module contains the fundamental supporting components:
//! - Configuration management and validation
//! - Error handling
//! - Logging setup
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod errors;

pub use config::{ConfigError, ConfigValidator, ParallelPolicy};
pub use errors::{ProcessingStage, PseError, PseResult};

/// Initializes tracing with an environment-filter based subscriber.
///
/// Reads the `RUST_LOG` environment variable to configure log levels.
/// Call once at application startup.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
