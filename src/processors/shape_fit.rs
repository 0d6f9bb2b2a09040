//! Shape fitting: converts labeled instances into bounding quadrilaterals.
//!
//! Each surviving instance is reduced to its pixel coordinates and fitted with
//! either an axis-aligned bounding box or a minimum-area rotated rectangle.
//! Quads whose area falls below a small noise threshold are silently dropped.

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use super::geometry::{Point, Quad, min_area_rect};
use super::scale_expand::{LabelMap, PixelState};
use super::types::BoxMode;
use crate::core::config::ParallelPolicy;

/// Collects the pixel coordinates of every instance in one consolidated pass
/// over the label map.
///
/// Entry `i` holds the points of label `i + 1`, in row-major order.
pub fn collect_label_points(map: &LabelMap, num_instances: u32) -> Vec<Vec<Point>> {
    let mut point_sets = vec![Vec::new(); num_instances as usize];
    for y in 0..map.height() {
        for x in 0..map.width() {
            if let PixelState::Labeled(label) = map.get(x, y) {
                if (1..=num_instances).contains(&label) {
                    point_sets[(label - 1) as usize].push(Point::new(x as f32, y as f32));
                }
            }
        }
    }
    point_sets
}

/// Fits bounding quadrilaterals to labeled instances.
#[derive(Debug, Clone)]
pub struct ShapeFitter {
    /// The kind of bounding shape to fit (default: minimum-area rotated).
    pub mode: BoxMode,
    /// Fitted quads with a smaller area are dropped as noise (default: 10 px²).
    pub min_box_area: f32,
    /// Gates the parallel per-instance fitting path.
    pub parallel_policy: ParallelPolicy,
}

impl Default for ShapeFitter {
    fn default() -> Self {
        Self {
            mode: BoxMode::default(),
            min_box_area: 10.0,
            parallel_policy: ParallelPolicy::default(),
        }
    }
}

impl ShapeFitter {
    /// Creates a new fitter with optional overrides.
    pub fn new(mode: Option<BoxMode>, min_box_area: Option<f32>) -> Self {
        Self {
            mode: mode.unwrap_or_default(),
            min_box_area: min_box_area.unwrap_or(10.0),
            parallel_policy: ParallelPolicy::default(),
        }
    }

    /// Sets the parallel processing policy.
    pub fn with_parallel_policy(mut self, policy: ParallelPolicy) -> Self {
        self.parallel_policy = policy;
        self
    }

    /// Fits one quadrilateral per surviving instance.
    ///
    /// Instances whose pixel set is empty (removed by the filter) are skipped,
    /// as are fitted quads rejected by the area rule. Output order follows
    /// label order.
    pub fn fit(&self, map: &LabelMap, num_instances: u32) -> Vec<Quad> {
        let point_sets = collect_label_points(map, num_instances);
        if point_sets.len() > self.parallel_policy.instance_threshold {
            point_sets
                .par_iter()
                .filter_map(|points| self.fit_one(points))
                .collect()
        } else {
            point_sets
                .iter()
                .filter_map(|points| self.fit_one(points))
                .collect()
        }
    }

    /// Applies a homogeneous transform to each instance's coordinates before
    /// axis-aligned fitting.
    ///
    /// Used by callers that rectify skew externally: the label map stays in
    /// mask space while the fitted boxes land in the rectified space.
    pub fn fit_warped(
        &self,
        map: &LabelMap,
        num_instances: u32,
        transform: &Matrix3<f32>,
    ) -> Vec<Quad> {
        collect_label_points(map, num_instances)
            .iter()
            .filter_map(|points| {
                if points.is_empty() {
                    return None;
                }
                let warped: Vec<Point> = points
                    .iter()
                    .map(|p| {
                        let v = transform * Vector3::new(p.x, p.y, 1.0);
                        let w = if v.z.abs() > f32::EPSILON { v.z } else { 1.0 };
                        Point::new(v.x / w, v.y / w)
                    })
                    .collect();
                self.accept(bounding_rect(&warped))
            })
            .collect()
    }

    fn fit_one(&self, points: &[Point]) -> Option<Quad> {
        if points.is_empty() {
            return None;
        }
        let quad = match self.mode {
            BoxMode::BoundingRect => bounding_rect(points),
            BoxMode::MinAreaRect => {
                let rect = min_area_rect(points);
                Quad::from_float_corners(rect.box_points())
            }
        };
        self.accept(quad)
    }

    fn accept(&self, quad: Quad) -> Option<Quad> {
        let area = quad.area();
        if area < self.min_box_area {
            debug!("dropping fitted quad with area {:.1}", area);
            return None;
        }
        Some(quad)
    }
}

/// Axis-aligned bounding box over a point set, with inclusive max-pixel
/// corners, as 4 clockwise corners from the top-left.
fn bounding_rect(points: &[Point]) -> Quad {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Quad::from_rect(min_x as i32, min_y as i32, max_x as i32, max_y as i32)
}
