//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// A message describing what is invalid.
        message: String,
    },

    /// Error indicating that validation failed.
    #[error("validation failed: {message}")]
    ValidationFailed {
        /// A message describing the failure.
        message: String,
    },

    /// Error indicating that a resource limit has been exceeded.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded {
        /// A message describing the exceeded limit.
        message: String,
    },
}

/// A trait for validating configuration parameters.
///
/// Provides shared validation helpers for the numeric parameters used by the
/// post-processing operators, such as thresholds and area limits.
pub trait ConfigValidator {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// A Result indicating success or a ConfigError if validation fails.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates that a float value lies within a specified range (inclusive).
    fn validate_f32_range(
        &self,
        value: f32,
        min: f32,
        max: f32,
        field_name: &str,
    ) -> Result<(), ConfigError> {
        if value < min || value > max {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be between {} and {}, got {}",
                    field_name, min, max, value
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a fraction lies in [0, 1].
    ///
    /// Used for overlap thresholds and binarization thresholds.
    fn validate_fraction(&self, value: f32, field_name: &str) -> Result<(), ConfigError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be a fraction between 0.0 and 1.0, got {}",
                    field_name, value
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a float value is finite and non-negative.
    fn validate_non_negative_f32(&self, value: f32, field_name: &str) -> Result<(), ConfigError> {
        if !value.is_finite() || value < 0.0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be finite and >= 0, got {}", field_name, value),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a usize value is positive.
    fn validate_positive_usize(&self, value: usize, field_name: &str) -> Result<(), ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be greater than 0, got {}", field_name, value),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a thread count.
    fn validate_thread_count(&self, thread_count: usize) -> Result<(), ConfigError> {
        const MAX_REASONABLE_THREADS: usize = 256;

        if thread_count == 0 {
            Err(ConfigError::InvalidConfig {
                message: "Thread count must be greater than 0".to_string(),
            })
        } else if thread_count > MAX_REASONABLE_THREADS {
            Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "Thread count {} exceeds reasonable maximum of {}",
                    thread_count, MAX_REASONABLE_THREADS
                ),
            })
        } else {
            Ok(())
        }
    }
}

impl From<ConfigError> for String {
    /// Converts a ConfigError to a String representation.
    fn from(error: ConfigError) -> Self {
        error.to_string()
    }
}
