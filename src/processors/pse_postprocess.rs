//! Post-processing driver for PSE (Progressive Scale Expansion) text detection.
//!
//! The [`PsePostProcess`] struct converts a kernel mask hierarchy into text
//! instance quadrilaterals and merged text-line boxes by seeding connected
//! components, expanding them through the hierarchy, filtering small
//! instances, fitting shapes, and grouping. Supporting functionality lives in
//! the sibling modules within this directory.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geometry::{Point2i, Quad};
use super::kernels::KernelPyramid;
use super::scale_expand::scale_expand_kernels;
use super::shape_fit::ShapeFitter;
use super::text_line::TextLineGrouper;
use super::types::{BoxMode, MaskScaleInfo, MergeStrategy};
use crate::core::config::{ConfigError, ConfigValidator, ParallelPolicy};
use crate::core::errors::PseResult;

/// Runtime configuration for PSE post-processing.
///
/// This struct contains parameters that may vary per call, overriding the
/// defaults stored in the processor.
#[derive(Debug, Clone)]
pub struct PsePostProcessConfig {
    /// Instances with pixel count <= this are removed.
    pub min_area: usize,
    /// Upper bound on the text-line successor search radius, in pixels.
    pub max_horizontal_dist: u32,
    /// Minimum vertical overlap ratio for chaining instance boxes.
    pub overlap_v_threshold: f32,
}

impl PsePostProcessConfig {
    /// Creates a new runtime config with specified values.
    pub fn new(min_area: usize, max_horizontal_dist: u32, overlap_v_threshold: f32) -> Self {
        Self {
            min_area,
            max_horizontal_dist,
            overlap_v_threshold,
        }
    }
}

/// Final detection output: per-instance quads and merged text-line quads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PseDetection {
    /// One fitted quadrilateral per surviving text instance.
    pub instances: Vec<Quad>,
    /// One merged quadrilateral per text line, in chain-extraction order.
    pub text_lines: Vec<Quad>,
}

impl PseDetection {
    /// An empty detection (no instances, no text lines).
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when nothing was detected.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.text_lines.is_empty()
    }
}

/// Post-processor for PSE text detection mask hierarchies.
#[derive(Debug, Clone)]
pub struct PsePostProcess {
    /// Default small-instance threshold in pixels; 0 disables the filter
    /// (default: 5).
    pub min_area: usize,
    /// Kind of bounding shape fitted per instance (default: min-area rotated).
    pub box_mode: BoxMode,
    /// Fitted quads below this area are dropped as noise (default: 10 px²).
    pub min_box_area: f32,
    /// Default successor search radius bound for grouping (default: 50).
    pub max_horizontal_dist: u32,
    /// Default vertical overlap threshold for grouping (default: 0.5).
    pub overlap_v_threshold: f32,
    /// How chains collapse into text-line boxes (default: mean-y).
    pub merge_strategy: MergeStrategy,
    /// Parallelism policy shared with the shape fitter.
    pub parallel_policy: ParallelPolicy,
}

impl PsePostProcess {
    /// Creates a new `PsePostProcess` instance with optional overrides.
    pub fn new(
        min_area: Option<usize>,
        box_mode: Option<BoxMode>,
        min_box_area: Option<f32>,
        max_horizontal_dist: Option<u32>,
        overlap_v_threshold: Option<f32>,
        merge_strategy: Option<MergeStrategy>,
    ) -> Self {
        Self {
            min_area: min_area.unwrap_or(5),
            box_mode: box_mode.unwrap_or_default(),
            min_box_area: min_box_area.unwrap_or(10.0),
            max_horizontal_dist: max_horizontal_dist.unwrap_or(50),
            overlap_v_threshold: overlap_v_threshold.unwrap_or(0.5),
            merge_strategy: merge_strategy.unwrap_or_default(),
            parallel_policy: ParallelPolicy::default(),
        }
    }

    /// Sets the parallel processing policy.
    pub fn with_parallel_policy(mut self, policy: ParallelPolicy) -> Self {
        self.parallel_policy = policy;
        self
    }

    /// Applies post-processing to one kernel mask hierarchy.
    ///
    /// # Arguments
    /// * `pyramid` - Validated mask hierarchy, smallest scale first
    /// * `scale` - Optional scaling info to map outputs back to source-image
    ///   coordinates
    /// * `config` - Runtime overrides for thresholds. If `None`, uses the
    ///   default values stored in this processor.
    ///
    /// An empty pyramid or an all-background seed mask yields an empty
    /// detection, not an error.
    pub fn apply(
        &self,
        pyramid: &KernelPyramid,
        scale: Option<MaskScaleInfo>,
        config: Option<&PsePostProcessConfig>,
    ) -> PseResult<PseDetection> {
        // Use provided config or fall back to stored defaults
        let min_area = config.map(|c| c.min_area).unwrap_or(self.min_area);
        let max_horizontal_dist = config
            .map(|c| c.max_horizontal_dist)
            .unwrap_or(self.max_horizontal_dist);
        let overlap_v_threshold = config
            .map(|c| c.overlap_v_threshold)
            .unwrap_or(self.overlap_v_threshold);

        if pyramid.is_empty() {
            return Ok(PseDetection::empty());
        }

        let (num_instances, mut label_map) = scale_expand_kernels(pyramid)?;
        debug!(
            "PsePostProcess: {} seed instances over {} kernel scales",
            num_instances,
            pyramid.len()
        );
        if num_instances == 0 {
            return Ok(PseDetection::empty());
        }

        if min_area > 0 {
            label_map.filter_small_instances(num_instances, min_area);
        }

        let fitter = ShapeFitter {
            mode: self.box_mode,
            min_box_area: self.min_box_area,
            parallel_policy: self.parallel_policy.clone(),
        };
        let instances = fitter.fit(&label_map, num_instances);

        let grouper = TextLineGrouper {
            max_horizontal_dist,
            overlap_v_threshold,
            merge_strategy: self.merge_strategy,
        };
        let text_lines = grouper.group(&instances);

        let detection = match scale {
            Some(info) => PseDetection {
                instances: instances.iter().map(|q| scale_to_source(q, &info)).collect(),
                text_lines: text_lines.iter().map(|q| scale_to_source(q, &info)).collect(),
            },
            None => PseDetection {
                instances,
                text_lines,
            },
        };
        Ok(detection)
    }
}

impl ConfigValidator for PsePostProcess {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_fraction(self.overlap_v_threshold, "overlap_v_threshold")?;
        self.validate_non_negative_f32(self.min_box_area, "min_box_area")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::new(None, None, None, None, None, None)
    }
}

/// Maps a quad from mask coordinates to source-image coordinates, rounding
/// and clamping to the source extent.
fn scale_to_source(quad: &Quad, info: &MaskScaleInfo) -> Quad {
    Quad::new(quad.points.map(|p| {
        Point2i::new(
            (p.x as f32 / info.ratio_w).round().clamp(0.0, info.src_w) as i32,
            (p.y as f32 / info.ratio_h).round().clamp(0.0, info.src_h) as i32,
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                mask.put_pixel(x, y, Luma([255u8]));
            }
        }
    }

    #[test]
    fn test_empty_pyramid_short_circuits() {
        let pyramid = KernelPyramid::new(Vec::new()).unwrap();
        let postprocess = PsePostProcess::get_defaults();
        let detection = postprocess.apply(&pyramid, None, None).unwrap();
        assert!(detection.is_empty());
    }

    #[test]
    fn test_all_background_seed_short_circuits() {
        let pyramid = KernelPyramid::new(vec![GrayImage::new(8, 8)]).unwrap();
        let postprocess = PsePostProcess::get_defaults();
        let detection = postprocess.apply(&pyramid, None, None).unwrap();
        assert!(detection.is_empty());
    }

    #[test]
    fn test_single_blob_end_to_end() {
        // 10x10 image: 3x3 seed blob at the top-left corner, 9x9 at the next
        // scale, min_area 2. One instance whose axis-aligned bounding box is
        // [(0,0),(8,0),(8,8),(0,8)].
        let mut seed = GrayImage::new(10, 10);
        fill_rect(&mut seed, 0, 0, 2, 2);
        let mut next = GrayImage::new(10, 10);
        fill_rect(&mut next, 0, 0, 8, 8);
        let pyramid = KernelPyramid::new(vec![seed, next]).unwrap();

        let postprocess = PsePostProcess::new(
            Some(2),
            Some(BoxMode::BoundingRect),
            None,
            None,
            None,
            None,
        );
        let detection = postprocess.apply(&pyramid, None, None).unwrap();

        assert_eq!(detection.instances, vec![Quad::from_rect(0, 0, 8, 8)]);
        assert_eq!(detection.text_lines, vec![Quad::from_rect(0, 0, 8, 8)]);
    }

    #[test]
    fn test_two_instances_grouped_into_one_line() {
        let mut seed = GrayImage::new(64, 20);
        fill_rect(&mut seed, 2, 4, 24, 14);
        fill_rect(&mut seed, 30, 4, 58, 14);
        let pyramid = KernelPyramid::new(vec![seed]).unwrap();

        let postprocess = PsePostProcess::new(
            Some(2),
            Some(BoxMode::BoundingRect),
            None,
            None,
            None,
            None,
        );
        let detection = postprocess.apply(&pyramid, None, None).unwrap();

        assert_eq!(detection.instances.len(), 2);
        assert_eq!(
            detection.text_lines,
            vec![Quad::from_rect(2, 4, 58, 14)]
        );
    }

    #[test]
    fn test_runtime_config_overrides_defaults() {
        let mut seed = GrayImage::new(16, 16);
        fill_rect(&mut seed, 2, 2, 9, 9);
        let pyramid = KernelPyramid::new(vec![seed]).unwrap();

        // Stored min_area would keep the instance; override removes it.
        let postprocess =
            PsePostProcess::new(Some(5), Some(BoxMode::BoundingRect), None, None, None, None);
        let config = PsePostProcessConfig::new(100, 50, 0.5);
        let detection = postprocess.apply(&pyramid, None, Some(&config)).unwrap();
        assert!(detection.is_empty());

        let detection = postprocess.apply(&pyramid, None, None).unwrap();
        assert_eq!(detection.instances.len(), 1);
    }

    #[test]
    fn test_scaling_to_source_coordinates() {
        let mut seed = GrayImage::new(10, 10);
        fill_rect(&mut seed, 0, 0, 8, 8);
        let pyramid = KernelPyramid::new(vec![seed]).unwrap();

        // Mask is a 2x downscale of a 20x20 source image.
        let info = MaskScaleInfo::from_dimensions(20, 20, 10, 10);
        let postprocess = PsePostProcess::new(
            Some(2),
            Some(BoxMode::BoundingRect),
            None,
            None,
            None,
            None,
        );
        let detection = postprocess.apply(&pyramid, Some(info), None).unwrap();
        assert_eq!(detection.instances, vec![Quad::from_rect(0, 0, 16, 16)]);
    }

    #[test]
    fn test_validation_rejects_bad_thresholds() {
        let mut postprocess = PsePostProcess::get_defaults();
        assert!(postprocess.validate().is_ok());

        postprocess.overlap_v_threshold = 1.5;
        assert!(postprocess.validate().is_err());

        postprocess.overlap_v_threshold = 0.5;
        postprocess.min_box_area = -1.0;
        assert!(postprocess.validate().is_err());
    }

    #[test]
    fn test_detection_serde_round_trip() {
        let detection = PseDetection {
            instances: vec![Quad::from_rect(0, 0, 8, 8)],
            text_lines: vec![Quad::from_rect(0, 0, 8, 8)],
        };
        let json = serde_json::to_string(&detection).unwrap();
        let back: PseDetection = serde_json::from_str(&json).unwrap();
        assert_eq!(back.instances, detection.instances);
        assert_eq!(back.text_lines, detection.text_lines);
    }
}
