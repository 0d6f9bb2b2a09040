//! Configuration management for the post-processing pipeline.
//!
//! This module provides configuration error types, validation traits, and
//! the shared parallel processing policy.

pub mod errors;
pub mod parallel;

// Re-export commonly used types
pub use errors::{ConfigError, ConfigValidator};
pub use parallel::ParallelPolicy;
