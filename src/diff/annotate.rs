//! Status annotation: project changes onto a freshly built graph.
//!
//! Removed entities are not dropped. They are copied from the previous graph
//! and re-inserted as `Removed` tombstones so a renderer can fade them out;
//! `carry_tombstones` keeps them across refreshes until their TTL elapses.

use crate::diff::{Change, ChangeKind};
use crate::graph::{GraphEdge, GraphNode, Status};
use log::trace;
use std::collections::{BTreeMap, BTreeSet};

/// Status for every node of the new graph, plus tombstones for removed
/// routers and networks taken from `old_nodes`.
pub fn annotate_nodes(
    new_nodes: &[GraphNode],
    changes: &[Change],
    old_nodes: &[GraphNode],
) -> Vec<GraphNode> {
    let mut marks: BTreeMap<&str, Status> = BTreeMap::new();
    let mut removed: Vec<(&str, i64)> = Vec::new();

    for c in changes.iter().filter(|c| !c.kind.is_link()) {
        match c.kind {
            k if k.is_added() => {
                marks.insert(c.entity.as_str(), Status::New { at: c.timestamp });
            }
            k if k.is_removed() => removed.push((c.entity.as_str(), c.timestamp)),
            ChangeKind::AreaChanged => {
                let status = Status::Changed { at: c.timestamp, old_cost: None };
                marks.insert(c.entity.as_str(), status);
            }
            _ => {}
        }
    }

    let mut out: Vec<GraphNode> = new_nodes
        .iter()
        .map(|n| GraphNode {
            status: marks.get(n.id.as_str()).copied().unwrap_or(Status::Stable),
            ..n.clone()
        })
        .collect();

    let present: BTreeSet<String> = out.iter().map(|n| n.id.clone()).collect();
    for (id, at) in removed {
        if present.contains(id) {
            continue;
        }
        match old_nodes.iter().find(|n| n.id == id) {
            Some(old) => out.push(GraphNode {
                status: Status::Removed { at },
                ..old.clone()
            }),
            None => trace!("no previous node for removed entity {}", id),
        }
    }
    out
}

/// Status for every edge of the new graph, plus tombstones for removed links
/// taken from `old_edges`. Metric changes record the previous edge's cost.
pub fn annotate_edges(
    new_edges: &[GraphEdge],
    changes: &[Change],
    old_edges: &[GraphEdge],
) -> Vec<GraphEdge> {
    let mut marks: BTreeMap<&str, Status> = BTreeMap::new();
    let mut removed: Vec<(&str, i64)> = Vec::new();

    for c in changes.iter().filter(|c| c.kind.is_link()) {
        match c.kind {
            ChangeKind::LinkAdded => {
                marks.insert(c.entity.as_str(), Status::New { at: c.timestamp });
            }
            ChangeKind::LinkRemoved => removed.push((c.entity.as_str(), c.timestamp)),
            ChangeKind::MetricChanged => {
                let old_cost = old_edges.iter().find(|e| e.id == c.entity).map(|e| e.cost);
                marks.insert(c.entity.as_str(), Status::Changed { at: c.timestamp, old_cost });
            }
            _ => {}
        }
    }

    let mut out: Vec<GraphEdge> = new_edges
        .iter()
        .map(|e| GraphEdge {
            status: marks.get(e.id.as_str()).copied().unwrap_or(Status::Stable),
            ..e.clone()
        })
        .collect();

    let present: BTreeSet<String> = out.iter().map(|e| e.id.clone()).collect();
    for (id, at) in removed {
        if present.contains(id) {
            continue;
        }
        match old_edges.iter().find(|e| e.id == id) {
            Some(old) => out.push(GraphEdge {
                status: Status::Removed { at },
                ..old.clone()
            }),
            None => trace!("no previous edge for removed link {}", id),
        }
    }
    out
}

/// Anything carrying an id and a status.
pub trait Annotated: Clone {
    fn key(&self) -> &str;
    fn status(&self) -> Status;
    fn set_status(&mut self, status: Status);
}

impl Annotated for GraphNode {
    fn key(&self) -> &str {
        &self.id
    }
    fn status(&self) -> Status {
        self.status
    }
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }
}

impl Annotated for GraphEdge {
    fn key(&self) -> &str {
        &self.id
    }
    fn status(&self) -> Status {
        self.status
    }
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }
}

/// Merge the previously rendered set into the current one.
///
/// Tombstones that have not expired and are absent from `current` are kept.
/// A `Stable` entry inherits an unexpired New/Changed highlight from its
/// previous rendering. Highlights older than the TTL settle to Stable and
/// expired tombstones are dropped.
pub fn carry_tombstones<T: Annotated>(
    previous: &[T],
    current: Vec<T>,
    now: i64,
    ttl_ms: i64,
) -> Vec<T> {
    let present: BTreeSet<String> = current.iter().map(|x| x.key().to_string()).collect();
    let highlighted: BTreeMap<&str, Status> = previous
        .iter()
        .filter(|x| matches!(x.status(), Status::New { .. } | Status::Changed { .. }))
        .map(|x| (x.key(), x.status()))
        .collect();

    let mut out: Vec<T> = current
        .into_iter()
        .filter(|x| !x.status().is_expired(now, ttl_ms))
        .map(|mut x| {
            let status = match (x.status(), highlighted.get(x.key())) {
                (Status::Stable, Some(prev)) => *prev,
                (status, _) => status,
            };
            x.set_status(status.settle(now, ttl_ms));
            x
        })
        .collect();

    out.extend(
        previous
            .iter()
            .filter(|x| x.status().is_removed())
            .filter(|x| !x.status().is_expired(now, ttl_ms))
            .filter(|x| !present.contains(x.key()))
            .cloned(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::tests::{BASE, WITHOUT_R2, parse};
    use crate::diff::{ChangeIds, diff};
    use crate::graph::build;
    use pretty_assertions::assert_eq;

    fn statuses<T: Annotated>(items: &[T]) -> Vec<(String, Status)> {
        items.iter().map(|x| (x.key().to_string(), x.status())).collect()
    }

    #[test]
    fn removed_router_is_reinserted_as_tombstone() {
        let a = parse(BASE);
        let b = parse(WITHOUT_R2);
        let (mut old_nodes, old_edges) = build(&a);
        old_nodes[1].x = 321.0;
        let (new_nodes, new_edges) = build(&b);

        let changes = diff(&a, &b, &mut ChangeIds::new(), 1_000);
        let nodes = annotate_nodes(&new_nodes, &changes, &old_nodes);
        let edges = annotate_edges(&new_edges, &changes, &old_edges);

        assert_eq!(
            statuses(&nodes),
            vec![
                ("1.1.1.1".to_string(), Status::Stable),
                ("3.3.3.3".to_string(), Status::Stable),
                ("2.2.2.2".to_string(), Status::Removed { at: 1_000 }),
            ]
        );
        // Tombstone keeps its last known position.
        assert_eq!(nodes[2].x, 321.0);

        assert_eq!(
            statuses(&edges),
            vec![
                ("1.1.1.1--3.3.3.3".to_string(), Status::Stable),
                ("1.1.1.1--2.2.2.2".to_string(), Status::Removed { at: 1_000 }),
            ]
        );
    }

    #[test]
    fn added_and_changed_entities_are_marked() {
        let a = parse(WITHOUT_R2);
        let b = parse(&BASE.replace("TOS 0 Metrics: 20", "TOS 0 Metrics: 35"));
        let (old_nodes, old_edges) = build(&a);
        let (new_nodes, new_edges) = build(&b);

        let changes = diff(&a, &b, &mut ChangeIds::new(), 5);
        let nodes = annotate_nodes(&new_nodes, &changes, &old_nodes);
        let edges = annotate_edges(&new_edges, &changes, &old_edges);

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].status, Status::New { at: 5 });
        assert_eq!(
            statuses(&edges),
            vec![
                ("1.1.1.1--2.2.2.2".to_string(), Status::New { at: 5 }),
                (
                    "1.1.1.1--3.3.3.3".to_string(),
                    Status::Changed { at: 5, old_cost: Some(20) }
                ),
            ]
        );
    }

    #[test]
    fn annotation_only_touches_status() {
        let a = parse(BASE);
        let b = parse(&WITHOUT_R2.replace("TOS 0 Metrics: 20", "TOS 0 Metrics: 25"));
        let (old_nodes, old_edges) = build(&a);
        let (new_nodes, new_edges) = build(&b);
        let changes = diff(&a, &b, &mut ChangeIds::new(), 7);

        let strip = |mut items: Vec<GraphNode>| {
            items.retain(|n| !n.status.is_removed());
            items.iter_mut().for_each(|n| n.status = Status::Stable);
            items
        };
        let nodes = annotate_nodes(&new_nodes, &changes, &old_nodes);
        assert_eq!(strip(nodes), new_nodes);

        let mut edges = annotate_edges(&new_edges, &changes, &old_edges);
        assert_eq!(edges[0].status, Status::Changed { at: 7, old_cost: Some(20) });
        edges.retain(|e| !e.status.is_removed());
        edges.iter_mut().for_each(|e| e.status = Status::Stable);
        assert_eq!(edges, new_edges);
    }

    #[test]
    fn tombstones_survive_until_ttl() {
        let a = parse(BASE);
        let b = parse(WITHOUT_R2);
        let (old_nodes, _) = build(&a);
        let (new_nodes, _) = build(&b);
        let changes = diff(&a, &b, &mut ChangeIds::new(), 1_000);
        let rendered = annotate_nodes(&new_nodes, &changes, &old_nodes);

        // Next tick: nothing changed, the tombstone is still fading.
        let (next, _) = build(&b);
        let kept = carry_tombstones(&rendered, next.clone(), 1_500, 1_000);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[2].id, "2.2.2.2");

        // After the TTL it is gone.
        let gone = carry_tombstones(&kept, next, 2_500, 1_000);
        assert_eq!(gone.len(), 2);
        assert!(gone.iter().all(|n| !n.status.is_removed()));
    }

    #[test]
    fn highlights_settle_after_ttl() {
        let mut node = build(&parse(BASE)).0.remove(0);
        node.status = Status::New { at: 0 };
        let settled = carry_tombstones(&[], vec![node], 10_000, 1_000);
        assert_eq!(settled[0].status, Status::Stable);
    }

    #[test]
    fn highlights_carry_over_a_quiet_refresh() {
        let (mut previous, _) = build(&parse(BASE));
        previous[0].status = Status::New { at: 1_000 };
        previous[1].status = Status::Changed { at: 1_000, old_cost: None };

        let (current, _) = build(&parse(BASE));
        let carried = carry_tombstones(&previous, current.clone(), 1_500, 1_000);
        assert_eq!(
            statuses(&carried),
            vec![
                ("1.1.1.1".to_string(), Status::New { at: 1_000 }),
                ("2.2.2.2".to_string(), Status::Changed { at: 1_000, old_cost: None }),
                ("3.3.3.3".to_string(), Status::Stable),
            ]
        );

        let later = carry_tombstones(&carried, current, 2_000, 1_000);
        assert!(later.iter().all(|n| n.status == Status::Stable));
    }
}
