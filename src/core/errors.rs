//! Core error types for the PSE post-processing pipeline.
//!
//! This module defines the main [`PseError`] enum and the [`ProcessingStage`]
//! enum used to attribute failures to a pipeline stage.

use thiserror::Error;

/// Result type used throughout the crate.
pub type PseResult<T> = Result<T, PseError>;

/// Enum representing different stages of the post-processing pipeline.
///
/// Used to identify which stage an error occurred in, providing context
/// for debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while labeling connected components in the seed mask.
    SeedLabeling,
    /// Error occurred during progressive scale expansion.
    ScaleExpansion,
    /// Error occurred while filtering small instances.
    InstanceFilter,
    /// Error occurred while fitting instance shapes.
    ShapeFitting,
    /// Error occurred while grouping instances into text lines.
    LineGrouping,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::SeedLabeling => write!(f, "seed labeling"),
            ProcessingStage::ScaleExpansion => write!(f, "scale expansion"),
            ProcessingStage::InstanceFilter => write!(f, "instance filter"),
            ProcessingStage::ShapeFitting => write!(f, "shape fitting"),
            ProcessingStage::LineGrouping => write!(f, "line grouping"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur during post-processing.
#[derive(Error, Debug)]
pub enum PseError {
    /// Error indicating invalid input at a component boundary.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error occurred during processing.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },
}

impl From<crate::core::config::ConfigError> for PseError {
    /// Converts a ConfigError to PseError::ConfigError.
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl PseError {
    /// Creates an invalid-input error with the given message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Wraps an underlying error with stage and context information.
    pub fn processing(
        stage: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.into(),
            source: Box::new(source),
        }
    }
}
