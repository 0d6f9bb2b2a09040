//! The kernel mask pyramid: an ordered hierarchy of binary segmentation masks.
//!
//! Index 0 holds the smallest, most conservative kernel scale; the last index
//! the largest, most permissive one. All masks share the same dimensions and
//! carry strictly binary values (0 background, 255 foreground); violations are
//! rejected at construction.

use image::{GrayImage, Luma};
use ndarray::ArrayView2;

use crate::core::errors::{PseError, PseResult};

/// Foreground pixel value in a kernel mask.
pub const FOREGROUND: u8 = 255;

/// An ordered, validated hierarchy of binary kernel masks.
#[derive(Debug, Clone)]
pub struct KernelPyramid {
    masks: Vec<GrayImage>,
}

impl KernelPyramid {
    /// Creates a pyramid from masks ordered smallest scale first.
    ///
    /// Fails fast when mask dimensions differ across the hierarchy, when a
    /// mask has zero dimensions, or when pixel values are not strictly binary.
    /// An empty mask list is legal and short-circuits the pipeline downstream.
    pub fn new(masks: Vec<GrayImage>) -> PseResult<Self> {
        if let Some(first) = masks.first() {
            let (width, height) = first.dimensions();
            if width == 0 || height == 0 {
                return Err(PseError::invalid_input("kernel masks have zero dimensions"));
            }
            for (index, mask) in masks.iter().enumerate() {
                if mask.dimensions() != (width, height) {
                    return Err(PseError::invalid_input(format!(
                        "kernel mask {} has dimensions {}x{}, expected {}x{}",
                        index,
                        mask.width(),
                        mask.height(),
                        width,
                        height
                    )));
                }
                if let Some(value) = mask
                    .pixels()
                    .map(|p| p.0[0])
                    .find(|&v| v != 0 && v != FOREGROUND)
                {
                    return Err(PseError::invalid_input(format!(
                        "kernel mask {} contains non-binary value {}",
                        index, value
                    )));
                }
            }
        }
        Ok(Self { masks })
    }

    /// Builds a pyramid by binarizing per-scale probability maps.
    ///
    /// A pixel becomes foreground when its predicted probability exceeds
    /// `thresh`. Maps are expected smallest scale first, like masks.
    pub fn from_probability_maps(maps: &[ArrayView2<f32>], thresh: f32) -> PseResult<Self> {
        if !thresh.is_finite() || !(0.0..=1.0).contains(&thresh) {
            return Err(PseError::invalid_input(format!(
                "binarization threshold must be a fraction between 0.0 and 1.0, got {}",
                thresh
            )));
        }

        let masks = maps
            .iter()
            .map(|map| {
                let (height, width) = map.dim();
                let mut mask = GrayImage::new(width as u32, height as u32);
                for y in 0..height {
                    for x in 0..width {
                        let value = if map[[y, x]] > thresh { FOREGROUND } else { 0 };
                        mask.put_pixel(x as u32, y as u32, Luma([value]));
                    }
                }
                mask
            })
            .collect();

        Self::new(masks)
    }

    /// Number of kernel scales in the pyramid.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// True when the pyramid holds no masks.
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Shared `(width, height)` of all masks, if any.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.masks.first().map(|m| m.dimensions())
    }

    /// The smallest-scale mask, used to seed instance labels.
    pub fn seed(&self) -> Option<&GrayImage> {
        self.masks.first()
    }

    /// The remaining masks in ascending scale order, for expansion.
    pub fn larger_scales(&self) -> impl Iterator<Item = &GrayImage> {
        self.masks.iter().skip(1)
    }

    /// All masks in ascending scale order.
    pub fn masks(&self) -> &[GrayImage] {
        &self.masks
    }
}
