//! Radial layout: backbone on an inner ring, other areas in angular sectors.
//!
//! An area with more nodes than fit on one ring arc spills onto concentric
//! rings further out, each ring spreading its nodes evenly over the sector.

use crate::graph::GraphNode;
use crate::layout::{Canvas, group_by_area};
use crate::topology::BACKBONE_AREA;
use std::f64::consts::TAU;

/// Share of each sector actually used, leaving a gap between areas.
const SECTOR_FILL: f64 = 0.85;

pub fn run(nodes: &mut [GraphNode], canvas: Canvas, min_spacing: f64) {
    let (cx, cy) = canvas.center();
    let mut groups = group_by_area(nodes);

    let has_backbone = groups.first().is_some_and(|(area, _)| area == BACKBONE_AREA);
    let backbone = has_backbone.then(|| groups.remove(0).1);

    let inner = inner_radius(backbone.as_ref().map_or(0, Vec::len), min_spacing);
    if let Some(members) = &backbone {
        let m = members.len();
        for (k, &i) in members.iter().enumerate() {
            if m == 1 {
                (nodes[i].x, nodes[i].y) = (cx, cy);
            } else {
                let angle = TAU * k as f64 / m as f64;
                nodes[i].x = cx + inner * angle.cos();
                nodes[i].y = cy + inner * angle.sin();
            }
        }
    }

    if groups.is_empty() {
        return;
    }

    let ring_gap = min_spacing * 1.5;
    let first_ring = inner + ring_gap * 1.5;
    let sector = TAU / groups.len() as f64;
    let span = sector * SECTOR_FILL;

    for (g, (_, members)) in groups.iter().enumerate() {
        let start = g as f64 * sector + (sector - span) / 2.0;
        let mut remaining = members.as_slice();
        let mut ring = 0;

        while !remaining.is_empty() {
            let radius = first_ring + ring as f64 * ring_gap;
            let take = ring_capacity(radius, span, min_spacing).min(remaining.len());
            let (on_ring, rest) = remaining.split_at(take);

            for (t, &i) in on_ring.iter().enumerate() {
                let angle = start + span * (t as f64 + 0.5) / take as f64;
                nodes[i].x = cx + radius * angle.cos();
                nodes[i].y = cy + radius * angle.sin();
            }

            remaining = rest;
            ring += 1;
        }
    }
}

fn inner_radius(backbone_count: usize, min_spacing: f64) -> f64 {
    (min_spacing * backbone_count as f64 / TAU).max(min_spacing * 1.5)
}

/// Nodes that fit on an arc of `span` radians at `radius`.
fn ring_capacity(radius: f64, span: f64, min_spacing: f64) -> usize {
    ((radius * span / min_spacing).floor() as usize).max(1)
}
