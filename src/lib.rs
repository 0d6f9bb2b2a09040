//! # PSE Post-Processing
//!
//! Post-processing for progressive-scale-expansion (PSE) scene-text detectors.
//! The upstream network emits a hierarchy of binary segmentation masks at
//! progressively larger kernel scales; this crate turns that hierarchy into
//! oriented text-instance quadrilaterals and merges them into text lines.
//!
//! ## Components
//!
//! - **Scale Expansion**: grows minimal-scale connected components outward
//!   through each larger mask via constrained label propagation
//! - **Small-Instance Filter**: drops instances below a pixel-area threshold
//! - **Shape Fitter**: converts surviving instances into axis-aligned or
//!   minimum-area rotated bounding quadrilaterals
//! - **Text-Line Grouper**: links neighboring quadrilaterals through a
//!   proximity graph and collapses each chain into one text-line box
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration, and logging setup
//! * [`processors`] - The post-processing operators themselves
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pse_postprocess::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Masks ordered smallest scale first, identical dimensions, values {0, 255}.
//! let masks: Vec<image::GrayImage> = Vec::new();
//! let pyramid = KernelPyramid::new(masks)?;
//!
//! let postprocess = PsePostProcess::new(None, None, None, None, None, None);
//! let detection = postprocess.apply(&pyramid, None, None)?;
//!
//! for line in &detection.text_lines {
//!     println!("{:?}", line.points);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod processors;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::core::{
        ConfigError, ConfigValidator, ParallelPolicy, ProcessingStage, PseError, PseResult,
        init_tracing,
    };
    pub use crate::processors::{
        BoxMode, KernelPyramid, LabelMap, MaskScaleInfo, MergeStrategy, MinAreaRect, PixelState,
        Point, Point2i, PseDetection, PsePostProcess, PsePostProcessConfig, Quad, ShapeFitter,
        TextLineGrouper, scale_expand_kernels, vertical_overlap_ratio,
    };
}
