//! Geometric primitives and algorithms for instance shape fitting.
//!
//! This module provides the point and quadrilateral types used throughout the
//! post-processing pipeline, plus the convex hull and rotating calipers
//! algorithms behind minimum-area rotated rectangle fitting.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// A 2D point with floating-point coordinates.
///
/// Used for intermediate geometry (hulls, projections); final outputs carry
/// integer coordinates via [`Point2i`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A 2D point with integer pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point2i {
    /// X-coordinate of the point.
    pub x: i32,
    /// Y-coordinate of the point.
    pub y: i32,
}

impl Point2i {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A quadrilateral with four ordered integer-coordinate corners.
///
/// Corners are ordered top-left, top-right, bottom-right, bottom-left.
/// Immutable once fitted; transformations return new values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quad {
    /// The four corners in top-left, top-right, bottom-right, bottom-left order.
    pub points: [Point2i; 4],
}

impl Quad {
    /// Creates a quadrilateral from four ordered corners.
    pub fn new(points: [Point2i; 4]) -> Self {
        Self { points }
    }

    /// Creates an axis-aligned quadrilateral from corner coordinates.
    ///
    /// Corners are materialized clockwise starting at the top-left:
    /// `(x1,y1), (x2,y1), (x2,y2), (x1,y2)`.
    pub fn from_rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            points: [
                Point2i::new(x1, y1),
                Point2i::new(x2, y1),
                Point2i::new(x2, y2),
                Point2i::new(x1, y2),
            ],
        }
    }

    /// Creates a quadrilateral by truncating four ordered float corners to
    /// integer coordinates.
    pub fn from_float_corners(corners: [Point; 4]) -> Self {
        Self {
            points: corners.map(|p| Point2i::new(p.x as i32, p.y as i32)),
        }
    }

    /// The top-left corner.
    #[inline]
    pub fn top_left(&self) -> Point2i {
        self.points[0]
    }

    /// The top-right corner.
    #[inline]
    pub fn top_right(&self) -> Point2i {
        self.points[1]
    }

    /// The bottom-right corner.
    #[inline]
    pub fn bottom_right(&self) -> Point2i {
        self.points[2]
    }

    /// The bottom-left corner.
    #[inline]
    pub fn bottom_left(&self) -> Point2i {
        self.points[3]
    }

    /// Vertical extent measured between the top-left and bottom-left corners.
    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom_left().y - self.top_left().y
    }

    /// Calculates the area of the quadrilateral using the shoelace formula.
    pub fn area(&self) -> f32 {
        let mut area = 0.0f64;
        for i in 0..4 {
            let j = (i + 1) % 4;
            area += self.points[i].x as f64 * self.points[j].y as f64;
            area -= self.points[j].x as f64 * self.points[i].y as f64;
        }
        (area.abs() / 2.0) as f32
    }

    /// Returns a new quadrilateral translated by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            points: self.points.map(|p| Point2i::new(p.x + dx, p.y + dy)),
        }
    }

    /// The smallest coordinate value across both axes of all corners.
    pub fn min_coord(&self) -> i32 {
        self.points
            .iter()
            .map(|p| p.x.min(p.y))
            .min()
            .unwrap_or(0)
    }

    /// The largest x-coordinate of all corners.
    pub fn max_x(&self) -> i32 {
        self.points.iter().map(|p| p.x).max().unwrap_or(0)
    }
}

/// Computes the cross product of the vectors `p1->p2` and `p1->p3`.
///
/// A positive value indicates a counter-clockwise turn, a negative value a
/// clockwise turn, and zero collinearity.
fn cross_product(p1: &Point, p2: &Point, p3: &Point) -> f32 {
    (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
}

/// Computes the convex hull of a point set using Graham's scan.
///
/// Returns the input unchanged when it has fewer than 3 points.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut points = points.to_vec();

    // Find the point with the lowest y-coordinate (and leftmost if tied)
    let mut start_idx = 0;
    for i in 1..points.len() {
        if points[i].y < points[start_idx].y
            || (points[i].y == points[start_idx].y && points[i].x < points[start_idx].x)
        {
            start_idx = i;
        }
    }
    points.swap(0, start_idx);
    let start_point = points[0];

    // Sort the remaining points by polar angle with respect to the start point
    points[1..].sort_by(|a, b| {
        let cross = cross_product(&start_point, a, b);
        if cross == 0.0 {
            let dist_a = (a.x - start_point.x).powi(2) + (a.y - start_point.y).powi(2);
            let dist_b = (b.x - start_point.x).powi(2) + (b.y - start_point.y).powi(2);
            dist_a
                .partial_cmp(&dist_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        } else if cross > 0.0 {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });

    // Build the hull with a stack, dropping clockwise turns
    let mut hull: Vec<Point> = Vec::new();
    for point in points {
        while hull.len() > 1
            && cross_product(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) <= 0.0
        {
            hull.pop();
        }
        hull.push(point);
    }

    hull
}

/// A rectangle with minimum area that encloses a point set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinAreaRect {
    /// The center point of the rectangle.
    pub center: Point,
    /// The width of the rectangle.
    pub width: f32,
    /// The height of the rectangle.
    pub height: f32,
    /// The rotation angle of the rectangle in degrees.
    pub angle: f32,
}

impl MinAreaRect {
    /// Gets the four corner points of the rectangle.
    ///
    /// Corners are ordered top-left, top-right, bottom-right, bottom-left
    /// via [`order_corners`].
    pub fn box_points(&self) -> [Point; 4] {
        let cos_a = (self.angle * PI / 180.0).cos();
        let sin_a = (self.angle * PI / 180.0).sin();

        let w_2 = self.width / 2.0;
        let h_2 = self.height / 2.0;

        let corners = [(-w_2, -h_2), (w_2, -h_2), (w_2, h_2), (-w_2, h_2)];
        let rotated = corners.map(|(x, y)| {
            Point::new(
                x * cos_a - y * sin_a + self.center.x,
                x * sin_a + y * cos_a + self.center.y,
            )
        });

        order_corners(rotated)
    }

    /// Gets the length of the shorter side of the rectangle.
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

/// Orders four corner points as top-left, top-right, bottom-right, bottom-left.
///
/// Sorts by x to split a left and a right pair, then picks the top and bottom
/// of each pair by y.
pub fn order_corners(corners: [Point; 4]) -> [Point; 4] {
    let mut by_x = corners;
    by_x.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let (mut left_a, mut left_b) = (by_x[0], by_x[1]);
    if left_a.y > left_b.y {
        std::mem::swap(&mut left_a, &mut left_b);
    }
    let (mut right_a, mut right_b) = (by_x[2], by_x[3]);
    if right_a.y > right_b.y {
        std::mem::swap(&mut right_a, &mut right_b);
    }

    // (tl, tr, br, bl)
    [left_a, right_a, right_b, left_b]
}

/// Computes the minimum-area enclosing rotated rectangle of a point set.
///
/// Runs rotating calipers over the convex hull. Degenerate inputs (fewer than
/// 3 hull points, collinear sets) fall back to the axis-aligned extent.
pub fn min_area_rect(points: &[Point]) -> MinAreaRect {
    let hull = convex_hull(points);

    if hull.len() < 3 {
        return axis_aligned_rect(points);
    }

    let mut min_area = f32::MAX;
    let mut min_rect = MinAreaRect {
        center: Point::new(0.0, 0.0),
        width: 0.0,
        height: 0.0,
        angle: 0.0,
    };
    let mut found = false;

    let n = hull.len();
    for i in 0..n {
        let j = (i + 1) % n;

        let edge_x = hull[j].x - hull[i].x;
        let edge_y = hull[j].y - hull[i].y;
        let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();

        // Skip degenerate edges
        if edge_length < f32::EPSILON {
            continue;
        }

        let nx = edge_x / edge_length;
        let ny = edge_y / edge_length;
        let px = -ny;
        let py = nx;

        // Project all hull points onto the edge and perpendicular directions
        let mut min_n = f32::MAX;
        let mut max_n = f32::MIN;
        let mut min_p = f32::MAX;
        let mut max_p = f32::MIN;

        for point in &hull {
            let proj_n = nx * (point.x - hull[i].x) + ny * (point.y - hull[i].y);
            min_n = min_n.min(proj_n);
            max_n = max_n.max(proj_n);

            let proj_p = px * (point.x - hull[i].x) + py * (point.y - hull[i].y);
            min_p = min_p.min(proj_p);
            max_p = max_p.max(proj_p);
        }

        let width = max_n - min_n;
        let height = max_p - min_p;
        let area = width * height;

        if area < min_area {
            min_area = area;
            found = true;

            let center_n = (min_n + max_n) / 2.0;
            let center_p = (min_p + max_p) / 2.0;

            min_rect = MinAreaRect {
                center: Point::new(
                    hull[i].x + center_n * nx + center_p * px,
                    hull[i].y + center_n * ny + center_p * py,
                ),
                width,
                height,
                angle: f32::atan2(ny, nx) * 180.0 / PI,
            };
        }
    }

    if found {
        min_rect
    } else {
        axis_aligned_rect(points)
    }
}

/// Axis-aligned extent of a point set, expressed as a zero-angle [`MinAreaRect`].
fn axis_aligned_rect(points: &[Point]) -> MinAreaRect {
    let Some((min_x, max_x)) = points.iter().map(|p| p.x).minmax().into_option() else {
        return MinAreaRect {
            center: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        };
    };
    let Some((min_y, max_y)) = points.iter().map(|p| p.y).minmax().into_option() else {
        return MinAreaRect {
            center: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        };
    };

    MinAreaRect {
        center: Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
        width: max_x - min_x,
        height: max_y - min_y,
        angle: 0.0,
    }
}
