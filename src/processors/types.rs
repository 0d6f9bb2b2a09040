//! Types used by the post-processing operators.
//!
//! This module defines the enums selecting fitting and merging behavior, and
//! the scaling info used to map mask coordinates back to source-image space.

use std::str::FromStr;

use crate::core::errors::PseError;

/// Specifies the kind of bounding shape fitted to each instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxMode {
    /// Axis-aligned bounding box.
    BoundingRect,
    /// Minimum-area rotated rectangle.
    #[default]
    MinAreaRect,
}

impl FromStr for BoxMode {
    type Err = PseError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "bounding-rect" => Ok(BoxMode::BoundingRect),
            "min-area-rect" => Ok(BoxMode::MinAreaRect),
            _ => Err(PseError::invalid_input(format!(
                "unknown box mode '{}', expected 'bounding-rect' or 'min-area-rect'",
                mode
            ))),
        }
    }
}

/// Specifies how a chain of instance boxes is collapsed into one text-line box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Mean of the member boxes' top and bottom y-values (smoothing).
    #[default]
    MeanY,
    /// Full vertical extent of the member boxes (min top, max bottom).
    Extent,
}

impl FromStr for MergeStrategy {
    type Err = PseError;

    fn from_str(strategy: &str) -> Result<Self, Self::Err> {
        match strategy {
            "mean-y" => Ok(MergeStrategy::MeanY),
            "extent" => Ok(MergeStrategy::Extent),
            _ => Err(PseError::invalid_input(format!(
                "unknown merge strategy '{}', expected 'mean-y' or 'extent'",
                strategy
            ))),
        }
    }
}

/// Information about the scaling between the mask hierarchy and the source image.
///
/// Ratios are expressed as mask dimension over source dimension, so dividing a
/// mask coordinate by the ratio maps it back to source-image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskScaleInfo {
    /// Source image height before resizing.
    pub src_h: f32,
    /// Source image width before resizing.
    pub src_w: f32,
    /// Height scaling ratio (mask_height / source_height).
    pub ratio_h: f32,
    /// Width scaling ratio (mask_width / source_width).
    pub ratio_w: f32,
}

impl MaskScaleInfo {
    /// Creates a new `MaskScaleInfo` from source dimensions and ratios.
    pub fn new(src_h: f32, src_w: f32, ratio_h: f32, ratio_w: f32) -> Self {
        Self {
            src_h,
            src_w,
            ratio_h,
            ratio_w,
        }
    }

    /// Creates a `MaskScaleInfo` from integer source and mask dimensions.
    pub fn from_dimensions(src_h: u32, src_w: u32, mask_h: u32, mask_w: u32) -> Self {
        Self {
            src_h: src_h as f32,
            src_w: src_w as f32,
            ratio_h: mask_h as f32 / src_h as f32,
            ratio_w: mask_w as f32 / src_w as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_mode_from_str() {
        assert_eq!(
            "bounding-rect".parse::<BoxMode>().unwrap(),
            BoxMode::BoundingRect
        );
        assert_eq!(
            "min-area-rect".parse::<BoxMode>().unwrap(),
            BoxMode::MinAreaRect
        );
        assert!("oriented".parse::<BoxMode>().is_err());
    }

    #[test]
    fn test_merge_strategy_from_str() {
        assert_eq!(
            "mean-y".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::MeanY
        );
        assert_eq!(
            "extent".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::Extent
        );
        assert!("median".parse::<MergeStrategy>().is_err());
    }

    #[test]
    fn test_mask_scale_info_from_dimensions() {
        let info = MaskScaleInfo::from_dimensions(200, 400, 100, 100);
        assert_eq!(info.src_h, 200.0);
        assert_eq!(info.src_w, 400.0);
        assert_eq!(info.ratio_h, 0.5);
        assert_eq!(info.ratio_w, 0.25);
    }
}
