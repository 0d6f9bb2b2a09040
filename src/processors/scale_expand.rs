//! Progressive scale expansion over a kernel mask pyramid.
//!
//! Instance labels are seeded by connected-component analysis of the smallest
//! mask, then grown outward through each larger mask via multi-source BFS:
//! every unlabeled foreground pixel of the next mask becomes a candidate, and
//! candidates adopt the label of whichever labeled region reaches them first
//! through 4-connected propagation. The small-instance filter lives here too,
//! since it operates directly on the label map.

use std::collections::VecDeque;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use super::kernels::KernelPyramid;
use crate::core::errors::{PseError, PseResult};

/// The state of one pixel in a [`LabelMap`].
///
/// An explicit three-state encoding; `Candidate` marks a foreground pixel of
/// the mask currently being absorbed that has not yet adopted a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelState {
    /// Background or permanently unassigned pixel.
    Background,
    /// Foreground pixel awaiting instance assignment during one expansion.
    Candidate,
    /// Pixel assigned to the instance with this label (labels start at 1).
    Labeled(u32),
}

/// An H×W grid of per-pixel instance states.
///
/// Owned exclusively by the expansion engine while it runs, then moved by
/// value through the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct LabelMap {
    width: u32,
    height: u32,
    pixels: Vec<PixelState>,
}

impl LabelMap {
    /// Creates an all-background map with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![PixelState::Background; (width as usize) * (height as usize)],
        }
    }

    /// Map width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Map height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` of the map.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// The state of the pixel at `(x, y)`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> PixelState {
        self.pixels[self.index(x, y)]
    }

    /// Sets the state of the pixel at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, state: PixelState) {
        let index = self.index(x, y);
        self.pixels[index] = state;
    }

    /// The instance label at `(x, y)`, if the pixel is labeled.
    pub fn label_at(&self, x: u32, y: u32) -> Option<u32> {
        match self.get(x, y) {
            PixelState::Labeled(label) => Some(label),
            _ => None,
        }
    }

    /// Seeds a label map by labeling 4-connected foreground regions of the
    /// smallest kernel mask.
    ///
    /// Returns the number of instances (the highest assigned label) and the
    /// seeded map. An all-background mask yields zero instances.
    pub fn from_seed_mask(mask: &GrayImage) -> (u32, LabelMap) {
        let (width, height) = mask.dimensions();
        let components = connected_components(mask, Connectivity::Four, Luma([0u8]));

        let mut map = LabelMap::new(width, height);
        let mut num_instances = 0u32;
        for y in 0..height {
            for x in 0..width {
                let label = components.get_pixel(x, y).0[0];
                if label > 0 {
                    map.set(x, y, PixelState::Labeled(label));
                    num_instances = num_instances.max(label);
                }
            }
        }

        debug!(
            "seed labeling: {} instances in {}x{} mask",
            num_instances, width, height
        );
        (num_instances, map)
    }

    /// Expands the current labels through the next larger kernel mask, in place.
    ///
    /// Every foreground pixel of `next_mask` that is not already labeled is
    /// marked as a candidate, then a multi-source BFS seeded with all labeled
    /// pixels (in row-major order) propagates labels into 4-connected
    /// candidates. Candidates left unreached when the frontier drains are
    /// demoted back to background.
    ///
    /// Pixels in the border row/column are never written and never act as
    /// propagation sources, so border foreground pixels of `next_mask` may
    /// stay permanently unlabeled.
    pub fn expand(&mut self, next_mask: &GrayImage) -> PseResult<()> {
        if next_mask.dimensions() != (self.width, self.height) {
            return Err(PseError::invalid_input(format!(
                "expansion mask is {}x{}, label map is {}x{}",
                next_mask.width(),
                next_mask.height(),
                self.width,
                self.height
            )));
        }

        let mut candidates = 0usize;
        for y in 0..self.height {
            for x in 0..self.width {
                if next_mask.get_pixel(x, y).0[0] != 0
                    && self.get(x, y) == PixelState::Background
                {
                    self.set(x, y, PixelState::Candidate);
                    candidates += 1;
                }
            }
        }
        if candidates == 0 {
            return Ok(());
        }

        // A map narrower than 3 pixels has no interior to propagate through.
        if self.width > 2 && self.height > 2 {
            let mut frontier: VecDeque<(u32, u32)> = VecDeque::new();
            for y in 1..self.height - 1 {
                for x in 1..self.width - 1 {
                    if matches!(self.get(x, y), PixelState::Labeled(_)) {
                        frontier.push_back((x, y));
                    }
                }
            }

            let mut absorbed = 0usize;
            while let Some((x, y)) = frontier.pop_front() {
                let PixelState::Labeled(label) = self.get(x, y) else {
                    continue;
                };
                let neighbors = [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)];
                for (nx, ny) in neighbors {
                    // Border pixels are never written.
                    if nx == 0 || ny == 0 || nx >= self.width - 1 || ny >= self.height - 1 {
                        continue;
                    }
                    if self.get(nx, ny) == PixelState::Candidate {
                        self.set(nx, ny, PixelState::Labeled(label));
                        absorbed += 1;
                        frontier.push_back((nx, ny));
                    }
                }
            }
            debug!(
                "expansion: absorbed {} of {} candidate pixels",
                absorbed, candidates
            );
        }

        // Unreached candidates stay background; the map never carries
        // candidate state between calls.
        for state in &mut self.pixels {
            if *state == PixelState::Candidate {
                *state = PixelState::Background;
            }
        }

        Ok(())
    }

    /// Counts the pixels of each instance label in one consolidated pass.
    ///
    /// Entry `i` holds the pixel count of label `i + 1`.
    pub fn instance_areas(&self, num_instances: u32) -> Vec<usize> {
        let mut areas = vec![0usize; num_instances as usize];
        for state in &self.pixels {
            if let PixelState::Labeled(label) = state {
                if (1..=num_instances).contains(label) {
                    areas[(label - 1) as usize] += 1;
                }
            }
        }
        areas
    }

    /// Resets every pixel of instances with pixel count <= `min_area` to
    /// background, removing them from downstream fitting.
    ///
    /// Returns the number of removed instances.
    pub fn filter_small_instances(&mut self, num_instances: u32, min_area: usize) -> usize {
        let areas = self.instance_areas(num_instances);
        let doomed: Vec<bool> = areas.iter().map(|&a| a > 0 && a <= min_area).collect();
        let removed = doomed.iter().filter(|&&d| d).count();
        if removed == 0 {
            return 0;
        }

        for state in &mut self.pixels {
            if let PixelState::Labeled(label) = state {
                if (1..=num_instances).contains(label) && doomed[(*label - 1) as usize] {
                    *state = PixelState::Background;
                }
            }
        }

        debug!(
            "instance filter: removed {} of {} instances (min_area {})",
            removed, num_instances, min_area
        );
        removed
    }
}

/// Runs the full progressive scale expansion over a kernel pyramid.
///
/// Seeds instance labels from the smallest mask, then expands once per
/// remaining mask in ascending scale order. An empty pyramid yields zero
/// instances and an empty map.
pub fn scale_expand_kernels(pyramid: &KernelPyramid) -> PseResult<(u32, LabelMap)> {
    let Some(seed) = pyramid.seed() else {
        return Ok((0, LabelMap::new(0, 0)));
    };

    let (num_instances, mut map) = LabelMap::from_seed_mask(seed);
    for mask in pyramid.larger_scales() {
        map.expand(mask)?;
    }
    Ok((num_instances, map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const FG: Luma<u8> = Luma([255u8]);

    fn mask_from_rows(rows: &[&[u8]]) -> GrayImage {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut mask = GrayImage::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                if v != 0 {
                    mask.put_pixel(x as u32, y as u32, FG);
                }
            }
        }
        mask
    }

    fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                mask.put_pixel(x, y, FG);
            }
        }
    }

    #[test]
    fn test_seed_labeling_separates_regions() {
        let mask = mask_from_rows(&[
            &[1, 1, 0, 0, 1],
            &[1, 1, 0, 0, 1],
            &[0, 0, 0, 0, 0],
        ]);
        let (num, map) = LabelMap::from_seed_mask(&mask);
        assert_eq!(num, 2);
        assert!(map.label_at(0, 0).is_some());
        assert!(map.label_at(4, 0).is_some());
        assert_ne!(map.label_at(0, 0), map.label_at(4, 0));
        assert_eq!(map.label_at(2, 1), None);
    }

    #[test]
    fn test_seed_labeling_all_background() {
        let (num, map) = LabelMap::from_seed_mask(&GrayImage::new(6, 6));
        assert_eq!(num, 0);
        assert_eq!(map.instance_areas(0), Vec::<usize>::new());
    }

    #[test]
    fn test_expansion_monotonicity() {
        // Seed labels must survive expansion unchanged.
        let mut seed = GrayImage::new(8, 8);
        fill_rect(&mut seed, 3, 3, 4, 4);
        let mut next = GrayImage::new(8, 8);
        fill_rect(&mut next, 2, 2, 5, 5);

        let (num, mut map) = LabelMap::from_seed_mask(&seed);
        assert_eq!(num, 1);
        let before: Vec<(u32, u32, u32)> = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .filter_map(|(x, y)| map.label_at(x, y).map(|l| (x, y, l)))
            .collect();

        map.expand(&next).unwrap();
        for (x, y, label) in before {
            assert_eq!(map.label_at(x, y), Some(label));
        }
    }

    #[test]
    fn test_expansion_absorbs_interior_and_drops_leftovers() {
        let mut seed = GrayImage::new(10, 10);
        fill_rect(&mut seed, 4, 4, 5, 5);
        let mut next = GrayImage::new(10, 10);
        fill_rect(&mut next, 2, 2, 7, 7);
        // Isolated foreground far from the seed stays unreachable.
        next.put_pixel(1, 8, FG);

        let (_, mut map) = LabelMap::from_seed_mask(&seed);
        map.expand(&next).unwrap();

        for y in 2..=7 {
            for x in 2..=7 {
                assert_eq!(map.label_at(x, y), Some(1), "pixel ({}, {})", x, y);
            }
        }
        // No candidate state survives an expansion pass.
        for y in 0..10 {
            for x in 0..10 {
                assert_ne!(map.get(x, y), PixelState::Candidate);
            }
        }
        assert_eq!(map.label_at(1, 8), None);
    }

    #[test]
    fn test_expansion_never_writes_border() {
        let mut seed = GrayImage::new(6, 6);
        fill_rect(&mut seed, 2, 2, 3, 3);
        let mut next = GrayImage::new(6, 6);
        fill_rect(&mut next, 0, 0, 5, 5);

        let (_, mut map) = LabelMap::from_seed_mask(&seed);
        map.expand(&next).unwrap();

        for i in 0..6 {
            assert_eq!(map.label_at(i, 0), None);
            assert_eq!(map.label_at(i, 5), None);
            assert_eq!(map.label_at(0, i), None);
            assert_eq!(map.label_at(5, i), None);
        }
        // Interior is fully absorbed.
        for y in 1..5 {
            for x in 1..5 {
                assert_eq!(map.label_at(x, y), Some(1));
            }
        }
    }

    #[test]
    fn test_expansion_idempotent_on_absorbed_mask() {
        let mut seed = GrayImage::new(8, 8);
        fill_rect(&mut seed, 3, 3, 4, 4);
        let mut next = GrayImage::new(8, 8);
        fill_rect(&mut next, 2, 2, 5, 5);

        let (_, mut map) = LabelMap::from_seed_mask(&seed);
        map.expand(&next).unwrap();
        let absorbed = map.clone();

        map.expand(&next).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(map.get(x, y), absorbed.get(x, y));
            }
        }
    }

    #[test]
    fn test_expansion_nearest_region_wins() {
        // Two seeds with a candidate corridor between them; each half of the
        // corridor adopts the label of the closer seed.
        let seed = mask_from_rows(&[
            &[0, 0, 0, 0, 0, 0, 0, 0, 0],
            &[0, 1, 0, 0, 0, 0, 0, 1, 0],
            &[0, 0, 0, 0, 0, 0, 0, 0, 0],
        ]);
        let next = mask_from_rows(&[
            &[0, 0, 0, 0, 0, 0, 0, 0, 0],
            &[0, 1, 1, 1, 1, 1, 1, 1, 0],
            &[0, 0, 0, 0, 0, 0, 0, 0, 0],
        ]);

        let (num, mut map) = LabelMap::from_seed_mask(&seed);
        assert_eq!(num, 2);
        let left = map.label_at(1, 1).unwrap();
        let right = map.label_at(7, 1).unwrap();
        map.expand(&next).unwrap();

        assert_eq!(map.label_at(2, 1), Some(left));
        assert_eq!(map.label_at(3, 1), Some(left));
        assert_eq!(map.label_at(5, 1), Some(right));
        assert_eq!(map.label_at(6, 1), Some(right));
    }

    #[test]
    fn test_expand_rejects_dimension_mismatch() {
        let (_, mut map) = LabelMap::from_seed_mask(&GrayImage::new(4, 4));
        let result = map.expand(&GrayImage::new(5, 4));
        assert!(matches!(result, Err(PseError::InvalidInput { .. })));
    }

    #[test]
    fn test_filter_small_instances_zeroes_pixels() {
        let mask = mask_from_rows(&[
            &[1, 1, 1, 0, 0, 1],
            &[1, 1, 1, 0, 0, 0],
            &[0, 0, 0, 0, 0, 0],
        ]);
        let (num, mut map) = LabelMap::from_seed_mask(&mask);
        assert_eq!(num, 2);

        let removed = map.filter_small_instances(num, 2);
        assert_eq!(removed, 1);

        // The 6-pixel instance survives, the single pixel is gone.
        let areas = map.instance_areas(num);
        assert_eq!(areas.iter().sum::<usize>(), 6);
        assert_eq!(map.label_at(5, 0), None);
        assert!(map.label_at(0, 0).is_some());
    }

    #[test]
    fn test_filter_noop_when_all_large_enough() {
        let mut mask = GrayImage::new(6, 6);
        fill_rect(&mut mask, 1, 1, 3, 3);
        let (num, mut map) = LabelMap::from_seed_mask(&mask);
        let removed = map.filter_small_instances(num, 2);
        assert_eq!(removed, 0);
        assert_eq!(map.instance_areas(num), vec![9]);
    }

    #[test]
    fn test_scale_expand_kernels_empty_pyramid() {
        let pyramid = KernelPyramid::new(Vec::new()).unwrap();
        let (num, map) = scale_expand_kernels(&pyramid).unwrap();
        assert_eq!(num, 0);
        assert_eq!(map.dimensions(), (0, 0));
    }

    #[test]
    fn test_scale_expand_kernels_grows_through_hierarchy() {
        let mut seed = GrayImage::new(12, 12);
        fill_rect(&mut seed, 5, 5, 6, 6);
        let mut mid = GrayImage::new(12, 12);
        fill_rect(&mut mid, 4, 4, 7, 7);
        let mut large = GrayImage::new(12, 12);
        fill_rect(&mut large, 3, 3, 8, 8);

        let pyramid = KernelPyramid::new(vec![seed, mid, large]).unwrap();
        let (num, map) = scale_expand_kernels(&pyramid).unwrap();
        assert_eq!(num, 1);
        assert_eq!(map.instance_areas(num), vec![36]);
        assert_eq!(map.label_at(3, 3), Some(1));
        assert_eq!(map.label_at(8, 8), Some(1));
    }
}
