//! Auto-fit: zoom and pan that frame every node in the viewport.

use crate::graph::GraphNode;
use serde::Serialize;

pub const FIT_PADDING: f64 = 60.0;
pub const MAX_ZOOM: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Viewport {
    pub const NEUTRAL: Viewport = Viewport {
        zoom: 1.0,
        pan_x: 0.0,
        pan_y: 0.0,
    };
}

impl Default for Viewport {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Viewport transform mapping the nodes' bounding box (plus padding) onto a
/// `viewport_w` x `viewport_h` screen, zooming in at most `MAX_ZOOM`.
///
/// Zero or one node, or all nodes on a single point, give the neutral
/// transform.
pub fn auto_fit(nodes: &[GraphNode], viewport_w: f64, viewport_h: f64) -> Viewport {
    if nodes.len() < 2 || viewport_w <= 0.0 || viewport_h <= 0.0 {
        return Viewport::NEUTRAL;
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for n in nodes {
        min_x = min_x.min(n.x);
        min_y = min_y.min(n.y);
        max_x = max_x.max(n.x);
        max_y = max_y.max(n.y);
    }

    let width = max_x - min_x;
    let height = max_y - min_y;
    let degenerate = width < f64::EPSILON && height < f64::EPSILON;
    if !(width.is_finite() && height.is_finite()) || degenerate {
        return Viewport::NEUTRAL;
    }

    let content_w = width + 2.0 * FIT_PADDING;
    let content_h = height + 2.0 * FIT_PADDING;
    let zoom = (viewport_w / content_w).min(viewport_h / content_h).min(MAX_ZOOM);

    let center_x = (min_x + max_x) / 2.0;
    let center_y = (min_y + max_y) / 2.0;
    Viewport {
        zoom,
        pan_x: viewport_w / 2.0 - center_x * zoom,
        pan_y: viewport_h / 2.0 - center_y * zoom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::node;
    use pretty_assertions::assert_eq;

    fn at(x: f64, y: f64) -> GraphNode {
        let mut n = node("n", "0");
        n.x = x;
        n.y = y;
        n
    }

    #[test]
    fn degenerate_inputs_are_neutral() {
        assert_eq!(auto_fit(&[], 800.0, 600.0), Viewport::NEUTRAL);
        assert_eq!(auto_fit(&[at(5.0, 5.0)], 800.0, 600.0), Viewport::NEUTRAL);
        assert_eq!(
            auto_fit(&[at(5.0, 5.0), at(5.0, 5.0), at(5.0, 5.0)], 800.0, 600.0),
            Viewport::NEUTRAL
        );
        assert_eq!(auto_fit(&[at(0.0, 0.0), at(10.0, 0.0)], 0.0, 600.0), Viewport::NEUTRAL);
    }

    #[test]
    fn large_content_is_zoomed_out_and_centered() {
        let nodes = [at(0.0, 0.0), at(1880.0, 0.0), at(0.0, 480.0)];
        let vp = auto_fit(&nodes, 1000.0, 600.0);

        // Width-limited: 1000 / (1880 + 120).
        assert!((vp.zoom - 0.5).abs() < 1e-12);
        // Bounding-box center lands on viewport center.
        assert!((940.0 * vp.zoom + vp.pan_x - 500.0).abs() < 1e-9);
        assert!((240.0 * vp.zoom + vp.pan_y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn small_content_zoom_is_capped() {
        let nodes = [at(100.0, 100.0), at(110.0, 100.0)];
        let vp = auto_fit(&nodes, 1000.0, 600.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
        assert!(vp.pan_x.is_finite() && vp.pan_y.is_finite());
    }
}
