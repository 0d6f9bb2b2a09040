//! Post-processing operators for PSE text detection.
//!
//! The pipeline flows through these modules in order: [`kernels`] validates
//! the input mask hierarchy, [`scale_expand`] grows labeled instances through
//! it, [`shape_fit`] reduces instances to quadrilaterals, and [`text_line`]
//! merges neighboring quadrilaterals into lines. [`pse_postprocess`] wires the
//! stages together behind one entry point.

pub mod geometry;
pub mod kernels;
pub mod pse_postprocess;
pub mod scale_expand;
pub mod shape_fit;
pub mod text_line;
pub mod types;

pub use geometry::{MinAreaRect, Point, Point2i, Quad, convex_hull, min_area_rect, order_corners};
pub use kernels::{FOREGROUND, KernelPyramid};
pub use pse_postprocess::{PseDetection, PsePostProcess, PsePostProcessConfig};
pub use scale_expand::{LabelMap, PixelState, scale_expand_kernels};
pub use shape_fit::{ShapeFitter, collect_label_points};
pub use text_line::{TextLineGrouper, vertical_overlap_ratio};
pub use types::{BoxMode, MaskScaleInfo, MergeStrategy};
