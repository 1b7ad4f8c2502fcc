//! Uniform spatial hash used to limit pairwise comparisons on large graphs.
//!
//! Points are bucketed into square cells; a pair is a candidate only when its
//! points fall in the same or adjacent cells. Any two points closer than the
//! cell size are always reported.

use std::collections::BTreeMap;

type Cell = (i64, i64);

/// Half of the 8-neighborhood; visiting only these offsets from every cell
/// reports each adjacent cell pair exactly once.
const FORWARD_NEIGHBORS: [Cell; 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: BTreeMap<Cell, Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(f64::EPSILON),
            cells: BTreeMap::new(),
        }
    }

    pub fn build(points: &[[f64; 2]], cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (i, p) in points.iter().enumerate() {
            grid.insert(i, *p);
        }
        grid
    }

    pub fn insert(&mut self, index: usize, p: [f64; 2]) {
        self.cells
            .entry(cell_of(p, self.cell_size))
            .or_default()
            .push(index);
    }

    /// Indices in the 3x3 block of cells around `p`. Every inserted point
    /// closer to `p` than the cell size is among them.
    pub fn near(&self, p: [f64; 2]) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = cell_of(p, self.cell_size);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(|cell| self.cells.get(&cell))
            .flatten()
            .copied()
    }

    /// Visit every candidate pair `(i, j)` with `i != j` once.
    pub fn for_each_pair(&self, mut f: impl FnMut(usize, usize)) {
        for (&(cx, cy), members) in &self.cells {
            for (k, &i) in members.iter().enumerate() {
                for &j in &members[k + 1..] {
                    f(i, j);
                }
            }

            for (dx, dy) in FORWARD_NEIGHBORS {
                let Some(other) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &i in members {
                    for &j in other {
                        f(i, j);
                    }
                }
            }
        }
    }
}

fn cell_of(p: [f64; 2], size: f64) -> Cell {
    ((p[0] / size).floor() as i64, (p[1] / size).floor() as i64)
}

/// Visit candidate pairs: every pair when `cell_size` is `None`, otherwise
/// only pairs in neighboring grid cells.
pub fn for_each_candidate_pair(
    points: &[[f64; 2]],
    cell_size: Option<f64>,
    mut f: impl FnMut(usize, usize),
) {
    match cell_size {
        Some(size) => SpatialGrid::build(points, size).for_each_pair(f),
        None => {
            for i in 0..points.len() {
                for j in (i + 1)..points.len() {
                    f(i, j);
                }
            }
        }
    }
}
