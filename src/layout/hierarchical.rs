//! Hierarchical layout: one band per area, stacked top to bottom.
//!
//! Each area's nodes are packed into a centered grid whose column count fits
//! the canvas width while keeping rows balanced. When the stack is shorter
//! than the canvas it is centered vertically.

use crate::graph::GraphNode;
use crate::layout::{Canvas, group_by_area};

const MARGIN: f64 = 40.0;

pub fn run(nodes: &mut [GraphNode], canvas: Canvas, min_spacing: f64) {
    let col_spacing = min_spacing * 1.8;
    let row_spacing = min_spacing * 1.5;
    let area_padding = min_spacing * 0.75;
    let area_gap = min_spacing;

    let available = (canvas.width - 2.0 * MARGIN).max(col_spacing);
    let max_cols = ((available / col_spacing).floor() as usize).max(1);
    let center_x = canvas.width / 2.0;

    let mut y = MARGIN;
    for (_, members) in group_by_area(nodes) {
        let count = members.len();
        let (cols, rows) = balanced_grid(count, max_cols);
        let top = y + area_padding;

        for (k, &i) in members.iter().enumerate() {
            let row = k / cols;
            let col = k % cols;
            let in_row = if row + 1 == rows { count - row * cols } else { cols };
            let row_width = (in_row - 1) as f64 * col_spacing;

            nodes[i].x = center_x - row_width / 2.0 + col as f64 * col_spacing;
            nodes[i].y = top + row as f64 * row_spacing;
        }

        y = top + (rows - 1) as f64 * row_spacing + area_padding + area_gap;
    }

    let total = y - area_gap + MARGIN;
    if total < canvas.height {
        let shift = (canvas.height - total) / 2.0;
        for n in nodes.iter_mut() {
            n.y += shift;
        }
    }
}

/// Columns and rows for `count` items with at most `max_cols` columns,
/// rebalanced so the last row is not left nearly empty.
fn balanced_grid(count: usize, max_cols: usize) -> (usize, usize) {
    let count = count.max(1);
    let cols = count.min(max_cols.max(1));
    let rows = count.div_ceil(cols);
    let cols = count.div_ceil(rows);
    (cols, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::{min_pairwise_distance, node};
    use pretty_assertions::assert_eq;

    #[test]
    fn grid_is_balanced() {
        assert_eq!(balanced_grid(1, 10), (1, 1));
        assert_eq!(balanced_grid(10, 10), (10, 1));
        assert_eq!(balanced_grid(11, 10), (6, 2));
        assert_eq!(balanced_grid(7, 3), (3, 3));
    }

    #[test]
    fn areas_stack_backbone_first_and_center_vertically() {
        let mut nodes = vec![node("a1", "1"), node("b1", "0"), node("b2", "0")];
        let canvas = Canvas { width: 1200.0, height: 800.0 };
        run(&mut nodes, canvas, 60.0);

        // Backbone row above area 1 row.
        assert!(nodes[1].y < nodes[0].y);
        assert_eq!(nodes[1].y, nodes[2].y);
        // Two-node row is centered horizontally.
        assert_eq!((nodes[1].x + nodes[2].x) / 2.0, 600.0);
        assert_eq!(nodes[0].x, 600.0);
        // Short stack is centered vertically.
        let mid = (nodes[1].y + nodes[0].y) / 2.0;
        assert!((mid - 400.0).abs() < 1e-9);
    }

    #[test]
    fn wide_areas_wrap_into_rows_without_overlap() {
        let mut nodes: Vec<GraphNode> = (0..50).map(|i| node(&format!("n{}", i), "0")).collect();
        let canvas = Canvas { width: 600.0, height: 400.0 };
        run(&mut nodes, canvas, 60.0);

        let rows: std::collections::BTreeSet<i64> =
            nodes.iter().map(|n| n.y.round() as i64).collect();
        assert!(rows.len() > 1);
        assert!(min_pairwise_distance(&nodes) >= 60.0);
        assert!(nodes.iter().all(|n| n.x >= 0.0 && n.x <= 600.0));
    }
}
