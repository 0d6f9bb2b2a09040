//! Shared parallel processing configuration types.

use serde::{Deserialize, Serialize};

/// Centralized configuration for parallel processing behavior.
///
/// The expansion stage is inherently sequential; the only data-parallel work
/// in the pipeline is per-instance shape fitting, which is gated by the
/// thresholds in this policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel processing.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Instance count above which per-instance shape fitting runs in parallel
    /// (<= this uses sequential).
    #[serde(default = "ParallelPolicy::default_instance_threshold")]
    pub instance_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the instance count threshold for parallel shape fitting.
    pub fn with_instance_threshold(mut self, threshold: usize) -> Self {
        self.instance_threshold = threshold;
        self
    }

    /// Install the global rayon thread pool with the configured number of threads.
    ///
    /// Should be called once at application startup before any parallel
    /// processing occurs. If `max_threads` is None, this method does nothing
    /// and rayon will use its default thread pool size.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the thread pool was successfully configured
    /// - `Ok(false)` if `max_threads` is None (no configuration needed)
    /// - `Err` if the thread pool has already been initialized
    pub fn install_global_thread_pool(&self) -> Result<bool, rayon::ThreadPoolBuildError> {
        if let Some(num_threads) = self.max_threads {
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Default instance count threshold.
    fn default_instance_threshold() -> usize {
        32
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            instance_threshold: Self::default_instance_threshold(),
        }
    }
}
