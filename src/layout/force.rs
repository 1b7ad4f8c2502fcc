//! Force-directed layout.
//!
//! Nodes start on per-area circles arranged around the canvas center, then a
//! cooled simulation applies pairwise repulsion, edge springs, area gravity
//! and center gravity. A final pass pushes apart any pair still closer than
//! the minimum spacing.
//!
//! Above `grid_threshold` nodes, repulsion only considers pairs in
//! neighboring spatial-grid cells; below it every pair is compared.

use crate::graph::{GraphEdge, GraphNode};
use crate::layout::grid::{SpatialGrid, for_each_candidate_pair};
use crate::layout::{Canvas, LayoutConfig, group_by_area};
use log::debug;
use rand::Rng;
use std::collections::HashMap;
use std::f64::consts::TAU;

const REPULSION: f64 = 8_000.0;
const SAME_AREA_REPULSION: f64 = 0.6;
const SHORT_RANGE_BOOST: f64 = 3.0;
const SPRING_BASE: f64 = 600.0;
const SPRING_K: f64 = 0.05;
const AREA_GRAVITY: f64 = 0.02;
const CENTER_GRAVITY: f64 = 0.005;
const DAMPING: f64 = 0.85;
const MAX_SPEED: f64 = 40.0;
const MIN_TEMP: f64 = 0.02;
const MARGIN: f64 = 30.0;
const OVERLAP_PASSES: usize = 200;
const MAX_OVERLAP_PASSES: usize = 2_000;
const OVERLAP_SLACK: f64 = 0.5;
/// Candidate positions per spiral ring when a node has to be displaced.
const SPIRAL_STEPS: usize = 12;

/// Relaxation passes before falling back to greedy placement.
pub fn overlap_budget(node_count: usize) -> usize {
    node_count
        .saturating_mul(2)
        .clamp(OVERLAP_PASSES, MAX_OVERLAP_PASSES)
}

/// Iteration budget shrinks as the graph grows.
pub fn iteration_budget(node_count: usize) -> usize {
    match node_count {
        0..=50 => 300,
        51..=200 => 200,
        201..=600 => 120,
        _ => 60,
    }
}

/// Ideal edge length, shorter for bigger graphs but never below 1.5x spacing.
pub fn ideal_length(node_count: usize, min_spacing: f64) -> f64 {
    (SPRING_BASE / (node_count.max(1) as f64).sqrt()).max(min_spacing * 1.5)
}

struct Sim {
    pos: Vec<[f64; 2]>,
    vel: Vec<[f64; 2]>,
    force: Vec<[f64; 2]>,
    area: Vec<usize>,
    area_count: usize,
    springs: Vec<(usize, usize)>,
}

pub fn run(
    nodes: &mut [GraphNode],
    edges: &[GraphEdge],
    canvas: Canvas,
    config: &LayoutConfig,
    rng: &mut impl Rng,
) {
    let n = nodes.len();
    let min_spacing = config.min_spacing;
    let use_grid = n > config.grid_threshold;
    let grid_cell = use_grid.then_some(min_spacing * 2.0);
    let iterations = iteration_budget(n);
    let ideal = ideal_length(n, min_spacing);

    let mut sim = Sim::new(nodes, edges, canvas, min_spacing);
    debug!(
        "force layout: {} iterations, ideal length {:.1}, grid {}",
        iterations, ideal, use_grid
    );

    for iter in 0..iterations {
        let temp = 1.0 - iter as f64 / iterations as f64;
        sim.clear_forces();
        sim.repel(grid_cell, min_spacing);
        sim.attract(ideal);
        sim.gravitate(canvas);
        sim.integrate(temp, canvas);
    }

    resolve_overlaps(&mut sim.pos, min_spacing, grid_cell, rng);

    for (node, p) in nodes.iter_mut().zip(&sim.pos) {
        node.x = p[0];
        node.y = p[1];
    }
}

impl Sim {
    fn new(nodes: &[GraphNode], edges: &[GraphEdge], canvas: Canvas, min_spacing: f64) -> Self {
        let n = nodes.len();
        let groups = group_by_area(nodes);
        let (cx, cy) = canvas.center();
        let ring = canvas.width.min(canvas.height) * 0.3;
        let has_backbone = groups
            .first()
            .is_some_and(|(a, _)| a == crate::topology::BACKBONE_AREA);
        let outer = groups.len() - usize::from(has_backbone);

        let mut pos = vec![[cx, cy]; n];
        let mut area = vec![0; n];

        for (g, (_, members)) in groups.iter().enumerate() {
            // Backbone (or a lone area) sits at the center; the rest are
            // spread around a ring by rank.
            let (ax, ay) = if groups.len() == 1 || (has_backbone && g == 0) {
                (cx, cy)
            } else {
                let rank = g - usize::from(has_backbone);
                let angle = TAU * rank as f64 / outer as f64;
                (cx + ring * angle.cos(), cy + ring * angle.sin())
            };

            let m = members.len();
            let radius = (min_spacing * m as f64 / TAU).max(min_spacing / 2.0);
            for (k, &i) in members.iter().enumerate() {
                area[i] = g;
                pos[i] = if m == 1 {
                    [ax, ay]
                } else {
                    let angle = TAU * k as f64 / m as f64;
                    [ax + radius * angle.cos(), ay + radius * angle.sin()]
                };
            }
        }

        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();
        let springs = edges
            .iter()
            .filter_map(|e| {
                let s = *index.get(e.source.as_str())?;
                let t = *index.get(e.target.as_str())?;
                (s != t).then_some((s, t))
            })
            .collect();

        Self {
            pos,
            vel: vec![[0.0, 0.0]; n],
            force: vec![[0.0, 0.0]; n],
            area,
            area_count: groups.len(),
            springs,
        }
    }

    fn clear_forces(&mut self) {
        self.force.iter_mut().for_each(|f| *f = [0.0, 0.0]);
    }

    fn repel(&mut self, grid_cell: Option<f64>, min_spacing: f64) {
        let pos = &self.pos;
        let area = &self.area;
        let force = &mut self.force;

        for_each_candidate_pair(pos, grid_cell, |i, j| {
            let (ux, uy, d) = separation(pos[i], pos[j], i, j);
            let mut f = REPULSION / (d.max(1.0) * d.max(1.0));
            if area[i] == area[j] {
                f *= SAME_AREA_REPULSION;
            }
            if d < min_spacing {
                f *= SHORT_RANGE_BOOST;
            }
            force[i][0] -= ux * f;
            force[i][1] -= uy * f;
            force[j][0] += ux * f;
            force[j][1] += uy * f;
        });
    }

    fn attract(&mut self, ideal: f64) {
        for &(s, t) in &self.springs {
            let (ux, uy, d) = separation(self.pos[s], self.pos[t], s, t);
            let f = (d - ideal) * SPRING_K;
            self.force[s][0] += ux * f;
            self.force[s][1] += uy * f;
            self.force[t][0] -= ux * f;
            self.force[t][1] -= uy * f;
        }
    }

    fn gravitate(&mut self, canvas: Canvas) {
        let mut sums = vec![[0.0, 0.0, 0.0]; self.area_count];
        for (p, &a) in self.pos.iter().zip(&self.area) {
            sums[a][0] += p[0];
            sums[a][1] += p[1];
            sums[a][2] += 1.0;
        }

        let (cx, cy) = canvas.center();
        for ((p, f), &a) in self.pos.iter().zip(self.force.iter_mut()).zip(&self.area) {
            let [sx, sy, count] = sums[a];
            f[0] += (sx / count - p[0]) * AREA_GRAVITY + (cx - p[0]) * CENTER_GRAVITY;
            f[1] += (sy / count - p[1]) * AREA_GRAVITY + (cy - p[1]) * CENTER_GRAVITY;
        }
    }

    fn integrate(&mut self, temp: f64, canvas: Canvas) {
        let limit = MAX_SPEED * temp.max(MIN_TEMP);
        for ((p, v), f) in self.pos.iter_mut().zip(self.vel.iter_mut()).zip(&self.force) {
            v[0] = (v[0] + f[0]) * DAMPING;
            v[1] = (v[1] + f[1]) * DAMPING;

            let speed = (v[0] * v[0] + v[1] * v[1]).sqrt();
            if speed > limit {
                v[0] *= limit / speed;
                v[1] *= limit / speed;
            }

            p[0] = clamp_axis(p[0] + v[0], canvas.width);
            p[1] = clamp_axis(p[1] + v[1], canvas.height);
        }
    }
}

/// Unit vector from `a` to `b` and their distance. Coincident points get a
/// fixed direction derived from their indices so forces stay finite.
fn separation(a: [f64; 2], b: [f64; 2], i: usize, j: usize) -> (f64, f64, f64) {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let d = (dx * dx + dy * dy).sqrt();
    if d < 1e-6 {
        let angle = (i * 7 + j * 13) as f64;
        return (angle.cos(), angle.sin(), 1e-6);
    }
    (dx / d, dy / d, d)
}

fn clamp_axis(v: f64, extent: f64) -> f64 {
    if extent <= 2.0 * MARGIN {
        extent / 2.0
    } else {
        v.clamp(MARGIN, extent - MARGIN)
    }
}

/// Push apart pairs closer than `min_spacing` until none remain. Exactly
/// coincident points are separated along a random direction.
///
/// Dense clusters can keep the relaxation moving past its budget; the
/// leftovers are then placed greedily, so on return every pair is at least
/// `min_spacing` apart. Returns the number of relaxation passes used.
pub fn resolve_overlaps(
    pos: &mut [[f64; 2]],
    min_spacing: f64,
    grid_cell: Option<f64>,
    rng: &mut impl Rng,
) -> usize {
    let budget = overlap_budget(pos.len());
    for pass in 0..budget {
        let mut pairs = Vec::new();
        for_each_candidate_pair(pos, grid_cell, |i, j| pairs.push((i, j)));

        let mut moved = false;
        for (i, j) in pairs {
            let dx = pos[j][0] - pos[i][0];
            let dy = pos[j][1] - pos[i][1];
            let d = (dx * dx + dy * dy).sqrt();
            if d >= min_spacing {
                continue;
            }

            let (ux, uy) = if d < 1e-9 {
                let angle = rng.gen_range(0.0..TAU);
                (angle.cos(), angle.sin())
            } else {
                (dx / d, dy / d)
            };
            let push = (min_spacing - d) / 2.0 + OVERLAP_SLACK;
            pos[i][0] -= ux * push;
            pos[i][1] -= uy * push;
            pos[j][0] += ux * push;
            pos[j][1] += uy * push;
            moved = true;
        }

        if !moved {
            return pass;
        }
    }

    let displaced = place_greedily(pos, min_spacing);
    debug!(
        "overlap relaxation unsettled after {} passes, displaced {} nodes",
        budget, displaced
    );
    budget
}

/// Walk the nodes in order and move any node within `min_spacing` of an
/// already placed one outward along a spiral until it is clear. Returns the
/// number of nodes moved.
fn place_greedily(pos: &mut [[f64; 2]], min_spacing: f64) -> usize {
    let mut placed = SpatialGrid::new(min_spacing);
    let mut displaced = 0;

    for i in 0..pos.len() {
        let origin = pos[i];
        let mut candidate = origin;
        let mut step = 0;
        while !is_clear(candidate, &placed, pos, min_spacing) {
            step += 1;
            candidate = spiral_point(origin, step, min_spacing);
        }
        if step > 0 {
            pos[i] = candidate;
            displaced += 1;
        }
        placed.insert(i, candidate);
    }
    displaced
}

fn is_clear(p: [f64; 2], placed: &SpatialGrid, pos: &[[f64; 2]], min_spacing: f64) -> bool {
    placed.near(p).all(|j| {
        let dx = pos[j][0] - p[0];
        let dy = pos[j][1] - p[1];
        (dx * dx + dy * dy).sqrt() >= min_spacing
    })
}

/// `step`-th candidate around `origin`: rings half a spacing apart, each
/// sampled at `SPIRAL_STEPS` angles.
fn spiral_point(origin: [f64; 2], step: usize, min_spacing: f64) -> [f64; 2] {
    let ring = step.div_ceil(SPIRAL_STEPS) as f64;
    let angle = TAU * (step % SPIRAL_STEPS) as f64 / SPIRAL_STEPS as f64;
    let radius = ring * min_spacing / 2.0;
    [origin[0] + radius * angle.cos(), origin[1] + radius * angle.sin()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::{min_pairwise_distance, synthetic};
    use crate::layout::{LayoutAlgorithm, layout};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(grid_threshold: usize) -> LayoutConfig {
        LayoutConfig {
            algorithm: LayoutAlgorithm::Force,
            grid_threshold,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn min_spacing_holds_below_grid_threshold() {
        let (mut nodes, edges) = synthetic(40, 3);
        let config = config(150);
        layout(&mut nodes, &edges, &config);
        assert!(min_pairwise_distance(&nodes) >= config.min_spacing - 1e-6);
    }

    #[test]
    fn min_spacing_holds_above_grid_threshold() {
        let (mut nodes, edges) = synthetic(260, 5);
        let config = config(150);
        layout(&mut nodes, &edges, &config);
        assert!(min_pairwise_distance(&nodes) >= config.min_spacing - 1e-6);
    }

    #[test]
    fn min_spacing_holds_at_400_nodes_in_one_area() {
        let (mut nodes, edges) = synthetic(400, 1);
        let config = config(150);
        layout(&mut nodes, &edges, &config);
        assert!(min_pairwise_distance(&nodes) >= config.min_spacing - 1e-6);
    }

    #[test]
    fn min_spacing_holds_at_600_nodes() {
        for areas in [1, 3] {
            let (mut nodes, edges) = synthetic(600, areas);
            let config = config(150);
            layout(&mut nodes, &edges, &config);
            assert!(
                min_pairwise_distance(&nodes) >= config.min_spacing - 1e-6,
                "{} areas",
                areas
            );
        }
    }

    #[test]
    fn greedy_placement_clears_a_dense_cluster() {
        let mut pos: Vec<[f64; 2]> = (0..80)
            .map(|i| [(i % 9) as f64 * 1.5, (i / 9) as f64 * 1.5])
            .collect();
        pos.push(pos[0]);

        let displaced = place_greedily(&mut pos, 60.0);
        assert_eq!(displaced, 80);
        for i in 0..pos.len() {
            for j in (i + 1)..pos.len() {
                let d = ((pos[i][0] - pos[j][0]).powi(2) + (pos[i][1] - pos[j][1]).powi(2)).sqrt();
                assert!(d >= 60.0 - 1e-9, "{} {} at {}", i, j, d);
            }
        }
    }

    #[test]
    fn grid_and_exact_paths_both_hold_at_small_n() {
        let (nodes, edges) = synthetic(30, 2);
        for threshold in [0, 1_000] {
            let mut nodes = nodes.clone();
            let config = config(threshold);
            layout(&mut nodes, &edges, &config);
            assert!(min_pairwise_distance(&nodes) >= config.min_spacing - 1e-6);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let (nodes, edges) = synthetic(25, 2);
        let mut a = nodes.clone();
        let mut b = nodes;
        layout(&mut a, &edges, &config(150));
        layout(&mut b, &edges, &config(150));
        assert_eq!(a, b);
    }

    #[test]
    fn coincident_points_are_jittered_apart() {
        let mut pos = vec![[100.0, 100.0]; 4];
        let mut rng = StdRng::seed_from_u64(1);
        let passes = resolve_overlaps(&mut pos, 60.0, None, &mut rng);
        assert!(passes < overlap_budget(pos.len()));

        for i in 0..pos.len() {
            for j in (i + 1)..pos.len() {
                let d = ((pos[i][0] - pos[j][0]).powi(2) + (pos[i][1] - pos[j][1]).powi(2)).sqrt();
                assert!(d >= 60.0 - 1e-6);
            }
        }
    }

    #[test]
    fn dangling_edges_are_ignored() {
        let (mut nodes, mut edges) = synthetic(6, 1);
        edges.push(crate::layout::tests::edge("r0", "ghost"));
        layout(&mut nodes, &edges, &config(150));
        assert!(nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
    }

    #[test]
    fn overlap_budget_scales_with_size() {
        assert_eq!(overlap_budget(10), OVERLAP_PASSES);
        assert_eq!(overlap_budget(600), 1_200);
        assert_eq!(overlap_budget(50_000), MAX_OVERLAP_PASSES);
    }

    #[test]
    fn budgets_shrink_with_size() {
        assert!(iteration_budget(10) > iteration_budget(1_000));
        assert!(ideal_length(4, 60.0) > ideal_length(400, 60.0));
        assert_eq!(ideal_length(10_000, 60.0), 90.0);
    }
}
