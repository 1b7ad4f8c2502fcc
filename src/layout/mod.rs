//! Layout engine: assigns 2D positions to graph nodes.
//!
//! Three algorithms are available (force-directed, hierarchical, radial).
//! All of them work on a canvas that grows with the node count, so dense
//! topologies get room to spread out; `fit::auto_fit` then maps the result
//! back onto the viewport.

pub mod fit;
pub mod force;
pub mod grid;
pub mod hierarchical;
pub mod radial;

pub use fit::{Viewport, auto_fit};

use crate::graph::{GraphEdge, GraphNode};
use crate::topology::BACKBONE_AREA;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutAlgorithm {
    #[default]
    Force,
    Hierarchical,
    Radial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub algorithm: LayoutAlgorithm,
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Minimum distance between any two node centers after layout.
    pub min_spacing: f64,
    /// Working-canvas area reserved per node.
    pub cell_area: f64,
    /// Node count above which repulsion uses the spatial grid.
    pub grid_threshold: usize,
    /// Seed for the overlap-resolution jitter.
    pub seed: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            algorithm: LayoutAlgorithm::Force,
            canvas_width: 1200.0,
            canvas_height: 800.0,
            min_spacing: 60.0,
            cell_area: 120.0 * 120.0,
            grid_threshold: 150,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

/// Working canvas for `node_count` nodes on a `width` x `height` viewport.
///
/// The area is `max(viewport area, node_count * cell_area)` and keeps the
/// viewport's aspect ratio.
pub fn working_canvas(node_count: usize, width: f64, height: f64, cell_area: f64) -> Canvas {
    let width = width.max(1.0);
    let height = height.max(1.0);
    let needed = node_count as f64 * cell_area.max(0.0);
    let available = width * height;

    if needed <= available {
        return Canvas { width, height };
    }
    let scale = (needed / available).sqrt();
    Canvas {
        width: width * scale,
        height: height * scale,
    }
}

/// Position `nodes` in place. Returns the working canvas that was used.
pub fn layout(nodes: &mut [GraphNode], edges: &[GraphEdge], config: &LayoutConfig) -> Canvas {
    let canvas = working_canvas(
        nodes.len(),
        config.canvas_width,
        config.canvas_height,
        config.cell_area,
    );
    debug!(
        "layout {:?}: {} nodes, {} edges on {:.0}x{:.0}",
        config.algorithm,
        nodes.len(),
        edges.len(),
        canvas.width,
        canvas.height
    );

    match nodes {
        [] => return canvas,
        [only] => {
            (only.x, only.y) = canvas.center();
            return canvas;
        }
        _ => {}
    }

    match config.algorithm {
        LayoutAlgorithm::Force => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            force::run(nodes, edges, canvas, config, &mut rng);
        }
        LayoutAlgorithm::Hierarchical => hierarchical::run(nodes, canvas, config.min_spacing),
        LayoutAlgorithm::Radial => radial::run(nodes, canvas, config.min_spacing),
    }
    canvas
}

/// Node indices grouped by area: backbone first, then the rest in
/// lexicographic order. Within a group nodes keep their input order.
pub(crate) fn group_by_area(nodes: &[GraphNode]) -> Vec<(String, Vec<usize>)> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, n) in nodes.iter().enumerate() {
        groups.entry(n.area.as_str()).or_default().push(i);
    }

    let mut out: Vec<(String, Vec<usize>)> = groups
        .into_iter()
        .map(|(area, idx)| (area.to_string(), idx))
        .collect();
    out.sort_by(|(a, _), (b, _)| {
        (a != BACKBONE_AREA)
            .cmp(&(b != BACKBONE_AREA))
            .then_with(|| a.cmp(b))
    });
    out
}
