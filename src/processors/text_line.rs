//! Text-line grouping over fitted instance quadrilaterals.
//!
//! Builds a directed proximity graph: each quad gets at most one outgoing
//! edge, pointing to the first quad to its right that clears a vertical
//! overlap threshold within a height-scaled search radius. Weakly connected
//! chains are collapsed into one merged text-line box each.
//!
//! Known imprecision, kept by design: a small quad nested inside a text line
//! that no other quad picks as its first rightward match stays an isolated
//! singleton instead of merging into the line.

use tracing::debug;

use super::geometry::Quad;
use super::types::MergeStrategy;

/// Fraction of vertical extent shared between two quads, relative to the
/// taller one.
///
/// Zero when neither quad has positive height. Symmetric in its arguments.
pub fn vertical_overlap_ratio(a: &Quad, b: &Quad) -> f32 {
    let max_height = a.height().max(b.height());
    if max_height <= 0 {
        return 0.0;
    }
    let top = a.top_left().y.max(b.top_left().y);
    let bottom = a.bottom_left().y.min(b.bottom_left().y);
    (bottom - top).max(0) as f32 / max_height as f32
}

/// Groups instance quadrilaterals into merged text-line boxes.
#[derive(Debug, Clone)]
pub struct TextLineGrouper {
    /// Upper bound on the rightward successor search radius, in pixels
    /// (default: 50).
    pub max_horizontal_dist: u32,
    /// Minimum vertical overlap ratio for two quads to be chained
    /// (default: 0.5).
    pub overlap_v_threshold: f32,
    /// How each chain is collapsed into one box (default: mean-y).
    pub merge_strategy: MergeStrategy,
}

impl Default for TextLineGrouper {
    fn default() -> Self {
        Self {
            max_horizontal_dist: 50,
            overlap_v_threshold: 0.5,
            merge_strategy: MergeStrategy::default(),
        }
    }
}

impl TextLineGrouper {
    /// Creates a new grouper with optional overrides.
    pub fn new(
        max_horizontal_dist: Option<u32>,
        overlap_v_threshold: Option<f32>,
        merge_strategy: Option<MergeStrategy>,
    ) -> Self {
        Self {
            max_horizontal_dist: max_horizontal_dist.unwrap_or(50),
            overlap_v_threshold: overlap_v_threshold.unwrap_or(0.5),
            merge_strategy: merge_strategy.unwrap_or_default(),
        }
    }

    /// Merges quads into text-line boxes, one per chain.
    ///
    /// Output order is deterministic: chains in discovery order, then
    /// leftover singletons in index order. Singleton chains are valid text
    /// lines of size one.
    pub fn group(&self, quads: &[Quad]) -> Vec<Quad> {
        if quads.is_empty() {
            return Vec::new();
        }

        // Rotated rectangles may carry negative coordinates; shift everything
        // non-negative and remember the offset for the final un-shift.
        let min_coord = quads.iter().map(|q| q.min_coord()).min().unwrap_or(0);
        let offset = if min_coord < 0 { -min_coord } else { 0 };
        let shifted: Vec<Quad> = quads.iter().map(|q| q.translate(offset, offset)).collect();
        let max_w = shifted.iter().map(|q| q.max_x()).max().unwrap_or(0) + 1;

        // Spatial index: bucket quad indices by top-left x-column.
        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); max_w as usize];
        for (index, quad) in shifted.iter().enumerate() {
            columns[quad.top_left().x as usize].push(index);
        }

        let n = shifted.len();
        let mut successor: Vec<Option<usize>> = vec![None; n];
        let mut indegree = vec![0usize; n];
        for i in 0..n {
            if let Some(j) = self.find_successor(i, &shifted, &columns, max_w) {
                successor[i] = Some(j);
                indegree[j] += 1;
            }
        }

        // Chains start at nodes with no incoming edge and an outgoing one.
        // Nodes are claimed first-come-first-served so converging chains
        // cannot duplicate members.
        let mut claimed = vec![false; n];
        let mut chains: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            if indegree[i] > 0 || successor[i].is_none() {
                continue;
            }
            let mut chain = Vec::new();
            let mut v = i;
            while !claimed[v] {
                claimed[v] = true;
                chain.push(v);
                match successor[v] {
                    Some(next) => v = next,
                    None => break,
                }
            }
            chains.push(chain);
        }
        for i in 0..n {
            if !claimed[i] {
                chains.push(vec![i]);
            }
        }

        debug!("grouped {} quads into {} text lines", n, chains.len());

        chains
            .iter()
            .map(|chain| self.merge_chain(chain, &shifted).translate(-offset, -offset))
            .collect()
    }

    /// Finds the nearest rightward successor of quad `i`, if any.
    ///
    /// Scans x-columns strictly right of the quad's top-left corner, up to its
    /// top-right corner plus a height-scaled radius; the first candidate whose
    /// vertical overlap clears the threshold wins.
    fn find_successor(
        &self,
        i: usize,
        quads: &[Quad],
        columns: &[Vec<usize>],
        max_w: i32,
    ) -> Option<usize> {
        let quad = &quads[i];
        let radius =
            (self.max_horizontal_dist as i32).min((quad.height().max(0) as f32 * 1.5).round() as i32);
        let start = quad.top_left().x + 1;
        let end = (max_w - 1).min(quad.top_right().x + radius);

        for x in start..end {
            for &j in &columns[x as usize] {
                if vertical_overlap_ratio(quad, &quads[j]) > self.overlap_v_threshold {
                    return Some(j);
                }
            }
        }
        None
    }

    fn merge_chain(&self, chain: &[usize], quads: &[Quad]) -> Quad {
        let mut x1 = i32::MAX;
        let mut x2 = i32::MIN;
        let mut top_sum = 0i64;
        let mut bottom_sum = 0i64;
        let mut top_min = i32::MAX;
        let mut bottom_max = i32::MIN;
        for &i in chain {
            let quad = &quads[i];
            let top = quad.top_left().y;
            let bottom = quad.bottom_right().y;
            x1 = x1.min(quad.top_left().x);
            x2 = x2.max(quad.bottom_right().x);
            top_sum += top as i64;
            bottom_sum += bottom as i64;
            top_min = top_min.min(top);
            bottom_max = bottom_max.max(bottom);
        }

        let (y1, y2) = match self.merge_strategy {
            MergeStrategy::MeanY => (
                round_mean(top_sum, chain.len()),
                round_mean(bottom_sum, chain.len()),
            ),
            MergeStrategy::Extent => (top_min, bottom_max),
        };
        Quad::from_rect(x1, y1, x2, y2)
    }
}

fn round_mean(sum: i64, count: usize) -> i32 {
    (sum as f64 / count as f64).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::geometry::Point2i;

    #[test]
    fn test_vertical_overlap_symmetry() {
        let a = Quad::from_rect(0, 0, 10, 10);
        let b = Quad::from_rect(20, 4, 30, 18);
        let c = Quad::from_rect(5, 40, 9, 41);
        for (p, q) in [(&a, &b), (&a, &c), (&b, &c)] {
            assert_eq!(vertical_overlap_ratio(p, q), vertical_overlap_ratio(q, p));
        }
        assert!((vertical_overlap_ratio(&a, &b) - 6.0 / 14.0).abs() < 1e-6);
        assert_eq!(vertical_overlap_ratio(&a, &c), 0.0);
    }

    #[test]
    fn test_vertical_overlap_zero_heights() {
        let a = Quad::from_rect(0, 5, 10, 5);
        let b = Quad::from_rect(12, 5, 20, 5);
        assert_eq!(vertical_overlap_ratio(&a, &b), 0.0);
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let grouper = TextLineGrouper::default();
        assert!(grouper.group(&[]).is_empty());
    }

    #[test]
    fn test_adjacent_quads_merge_into_one_line() {
        // Same height, full vertical overlap, gap 5 < max dist.
        let a = Quad::from_rect(0, 0, 20, 10);
        let b = Quad::from_rect(25, 0, 45, 10);
        let grouper = TextLineGrouper::default();
        let lines = grouper.group(&[a, b]);
        assert_eq!(lines, vec![Quad::from_rect(0, 0, 45, 10)]);
    }

    #[test]
    fn test_low_overlap_stays_separate() {
        // Overlap ratio 0.2 < threshold 0.5: two singleton lines.
        let a = Quad::from_rect(0, 0, 20, 10);
        let b = Quad::from_rect(25, 8, 45, 18);
        let grouper = TextLineGrouper::default();
        let lines = grouper.group(&[a, b]);
        assert_eq!(lines, vec![a, b]);
    }

    #[test]
    fn test_distance_cap_blocks_far_quads() {
        let a = Quad::from_rect(0, 0, 20, 10);
        let b = Quad::from_rect(200, 0, 220, 10);
        let grouper = TextLineGrouper::default();
        let lines = grouper.group(&[a, b]);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_chain_of_three_merges_in_order() {
        let a = Quad::from_rect(0, 0, 20, 10);
        let b = Quad::from_rect(25, 1, 45, 11);
        let c = Quad::from_rect(50, 0, 70, 10);
        let grouper = TextLineGrouper::default();
        let lines = grouper.group(&[c, a, b]);
        // One chain covering all three; mean-y smoothing over tops {0,1,0}
        // rounds back to 0 and bottoms {10,11,10} round to 10.
        assert_eq!(lines, vec![Quad::from_rect(0, 0, 70, 10)]);
    }

    #[test]
    fn test_every_quad_lands_in_exactly_one_line() {
        let quads = vec![
            Quad::from_rect(0, 0, 20, 10),
            Quad::from_rect(25, 0, 45, 10),
            Quad::from_rect(0, 30, 20, 40),
            Quad::from_rect(100, 100, 140, 112),
        ];
        let grouper = TextLineGrouper::default();
        let lines = grouper.group(&quads);
        // First two chain; the other two are singletons.
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], Quad::from_rect(0, 0, 45, 10));
        assert!(lines.contains(&Quad::from_rect(0, 30, 20, 40)));
        assert!(lines.contains(&Quad::from_rect(100, 100, 140, 112)));
    }

    #[test]
    fn test_negative_coordinates_offset_round_trip() {
        // A rotated fit can push corners negative; the output must land back
        // in the original coordinate range, integer-exact.
        let a = Quad::new([
            Point2i::new(-6, -4),
            Point2i::new(14, -4),
            Point2i::new(14, 6),
            Point2i::new(-6, 6),
        ]);
        let grouper = TextLineGrouper::default();
        let lines = grouper.group(&[a]);
        assert_eq!(lines, vec![a]);
    }

    #[test]
    fn test_extent_merge_strategy() {
        let a = Quad::from_rect(0, 0, 20, 10);
        let b = Quad::from_rect(25, 2, 45, 12);
        let grouper = TextLineGrouper::new(None, None, Some(MergeStrategy::Extent));
        let lines = grouper.group(&[a, b]);
        assert_eq!(lines, vec![Quad::from_rect(0, 0, 45, 12)]);
    }

    #[test]
    fn test_below_threshold_candidate_is_skipped() {
        // The nearer candidate fails the overlap test (4/12 < 0.5), so the
        // farther one becomes the successor and the near quad stays alone.
        let a = Quad::from_rect(0, 0, 10, 10);
        let near = Quad::from_rect(13, 6, 23, 18);
        let far = Quad::from_rect(16, 0, 26, 10);
        let grouper = TextLineGrouper::default();
        let lines = grouper.group(&[a, near, far]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], Quad::from_rect(0, 0, 26, 10));
        assert!(lines.contains(&near));
    }
}
