//! Report model: the published snapshot flattened into one serializable
//! document.

use crate::Result;
use crate::diff::Change;
use crate::graph::{GraphEdge, GraphNode};
use crate::layout::{Canvas, LayoutAlgorithm, Viewport, auto_fit};
use crate::refresh::{RefreshStatus, Session};
use crate::topology::{BACKBONE_AREA, RouterRole, Topology};
use anyhow::bail;
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize)]
pub struct AreaView {
    pub id: String,
    pub backbone: bool,
    pub routers: usize,
    pub networks: usize,
    pub links: usize,
    /// Routers also observed in at least one other area.
    pub border_routers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalsView {
    pub routers: usize,
    pub networks: usize,
    pub links: usize,
    pub areas: usize,
    pub abr: usize,
    pub asbr: usize,
    /// Removed entities still shown while fading out.
    pub tombstones: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub source: String,
    pub generated_at: String,
    pub status: RefreshStatus,
    pub algorithm: LayoutAlgorithm,
    pub canvas: Canvas,
    pub viewport: Viewport,
    pub totals: TotalsView,
    pub areas: Vec<AreaView>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub changes: Vec<Change>,
}

/// Build report data from the session's published snapshot.
///
/// Errors when nothing has been published yet. Edges whose endpoints are
/// not among the rendered nodes are kept but logged.
pub fn build_report_data(
    source: &str,
    session: &Session,
    status: &RefreshStatus,
    generated_at: DateTime<Utc>,
) -> Result<ReportData> {
    let (Some(topology), Some(canvas)) = (session.topology(), session.canvas()) else {
        bail!("no data found in {}", source);
    };
    let config = session.layout_config();

    let ids: BTreeSet<&str> = session.nodes().iter().map(|n| n.id.as_str()).collect();
    for e in session.edges() {
        for end in [&e.source, &e.target] {
            if !ids.contains(end.as_str()) {
                warn!("edge {} references {}, which has no node", e.id, end);
            }
        }
    }

    let tombstones = session
        .nodes()
        .iter()
        .filter(|n| n.status.is_removed())
        .count()
        + session
            .edges()
            .iter()
            .filter(|e| e.status.is_removed())
            .count();

    Ok(ReportData {
        source: source.to_string(),
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        status: status.clone(),
        algorithm: config.algorithm,
        canvas,
        viewport: auto_fit(session.nodes(), config.canvas_width, config.canvas_height),
        totals: TotalsView {
            tombstones,
            ..totals(topology)
        },
        areas: area_views(topology),
        nodes: session.nodes().to_vec(),
        edges: session.edges().to_vec(),
        changes: session.history().to_vec(),
    })
}

fn totals(topology: &Topology) -> TotalsView {
    let role_count = |role: RouterRole| {
        topology.routers.values().filter(|r| r.role == role).count()
    };
    TotalsView {
        routers: topology.routers.len(),
        networks: topology.networks.len(),
        links: topology.links.len(),
        areas: topology.areas.len(),
        abr: role_count(RouterRole::Abr),
        asbr: role_count(RouterRole::Asbr),
        tombstones: 0,
    }
}

fn area_views(topology: &Topology) -> Vec<AreaView> {
    let mut views: BTreeMap<&str, AreaView> = topology
        .areas
        .iter()
        .map(|a| {
            let view = AreaView {
                id: a.clone(),
                backbone: a == BACKBONE_AREA,
                routers: 0,
                networks: 0,
                links: 0,
                border_routers: Vec::new(),
            };
            (a.as_str(), view)
        })
        .collect();

    for r in topology.routers.values() {
        for a in &r.areas {
            if let Some(v) = views.get_mut(a.as_str()) {
                v.routers += 1;
                if r.areas.len() > 1 {
                    v.border_routers.push(r.id.clone());
                }
            }
        }
    }
    for n in topology.networks.values() {
        if let Some(v) = views.get_mut(n.area.as_str()) {
            v.networks += 1;
        }
    }
    for l in &topology.links {
        if let Some(v) = views.get_mut(l.area.as_str()) {
            v.links += 1;
        }
    }

    // Backbone first, then by id.
    let mut out: Vec<AreaView> = views.into_values().collect();
    out.sort_by(|a, b| b.backbone.cmp(&a.backbone).then_with(|| a.id.cmp(&b.id)));
    out
}
