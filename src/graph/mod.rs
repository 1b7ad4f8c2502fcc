//! Rendering-facing projection of a `Topology`.
//!
//! One node per router and per network, one edge per link. Positions start
//! at the origin; the layout engine assigns them.

pub mod status;

pub use status::Status;

use crate::topology::{LinkKind, RouterRole, Topology};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Router,
    Network,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    /// None for network nodes.
    pub role: Option<RouterRole>,
    pub area: String,
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    /// Sorted endpoint pair, shared with the differ's link identity.
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub cost: u32,
    pub area: String,
    #[serde(flatten)]
    pub status: Status,
}

/// Project a topology into unpositioned nodes and edges.
pub fn build(topology: &Topology) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let routers = topology.routers.values().map(|r| GraphNode {
        id: r.id.clone(),
        label: r.id.clone(),
        kind: NodeKind::Router,
        role: Some(r.role),
        area: r.area.clone(),
        x: 0.0,
        y: 0.0,
        status: Status::Stable,
    });

    let networks = topology.networks.values().map(|n| GraphNode {
        id: n.id.clone(),
        label: match &n.mask {
            Some(mask) => format!("{} {}", n.id, mask),
            None => n.id.clone(),
        },
        kind: NodeKind::Network,
        role: None,
        area: n.area.clone(),
        x: 0.0,
        y: 0.0,
        status: Status::Stable,
    });

    let nodes = routers.chain(networks).collect();

    let edges = topology
        .links
        .iter()
        .map(|l| GraphEdge {
            id: l.key(),
            source: l.source.clone(),
            target: l.target.clone(),
            kind: l.kind,
            cost: l.cost,
            area: l.area.clone(),
            status: Status::Stable,
        })
        .collect();

    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsa::LsaParser;
    use pretty_assertions::assert_eq;

    const DUMP: &str = r#"
  LS age: 1
  LS Type: Router Links
  Link State ID: 1.1.1.1
  Area Border Router
    Link connected to: another Router (point-to-point)
     (Link ID) Neighboring Router ID: 2.2.2.2
      TOS 0 Metrics: 10

  LS age: 2
  LS Type: Network Links
  Link State ID: 10.0.0.1
  Advertising Router: 1.1.1.1
  Network Mask: /24
        Attached Router: 1.1.1.1
        Attached Router: 2.2.2.2
"#;

    #[test]
    fn one_node_per_entity_one_edge_per_link() {
        let topo = LsaParser::new().unwrap().parse(DUMP);
        let (nodes, edges) = build(&topo);

        let ids: Vec<(&str, NodeKind)> = nodes.iter().map(|n| (n.id.as_str(), n.kind)).collect();
        assert_eq!(
            ids,
            vec![
                ("1.1.1.1", NodeKind::Router),
                ("2.2.2.2", NodeKind::Router),
                ("10.0.0.1", NodeKind::Network),
            ]
        );
        assert_eq!(nodes[0].role, Some(RouterRole::Abr));
        assert_eq!(nodes[2].label, "10.0.0.1 /24");
        assert!(nodes.iter().all(|n| n.x == 0.0 && n.y == 0.0 && n.status == Status::Stable));

        assert_eq!(edges.len(), topo.links.len());
        assert_eq!(edges[0].id, "1.1.1.1--2.2.2.2");
        assert_eq!(edges[0].cost, 10);
    }
}
