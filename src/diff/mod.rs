//! Snapshot differ: semantic changes between two topologies.
//!
//! `diff` is a pure function of its two inputs plus an injected id
//! generator and timestamp. Links are compared by sorted endpoint pair, so
//! parallel links between the same endpoints are one identity.

pub mod annotate;

pub use annotate::{annotate_edges, annotate_nodes, carry_tombstones};

use crate::topology::{Link, Topology, link_key};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    RouterAdded,
    RouterRemoved,
    NetworkAdded,
    NetworkRemoved,
    LinkAdded,
    LinkRemoved,
    MetricChanged,
    AreaChanged,
}

impl ChangeKind {
    pub fn is_added(self) -> bool {
        matches!(
            self,
            ChangeKind::RouterAdded | ChangeKind::NetworkAdded | ChangeKind::LinkAdded
        )
    }

    pub fn is_removed(self) -> bool {
        matches!(
            self,
            ChangeKind::RouterRemoved | ChangeKind::NetworkRemoved | ChangeKind::LinkRemoved
        )
    }

    pub fn is_link(self) -> bool {
        matches!(
            self,
            ChangeKind::LinkAdded | ChangeKind::LinkRemoved | ChangeKind::MetricChanged
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub id: u64,
    pub kind: ChangeKind,
    /// Router/network id, or the link key for link changes.
    pub entity: String,
    /// Sorted endpoints for link changes.
    pub endpoints: Option<(String, String)>,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub timestamp: i64,
}

/// Monotonic change-id source, owned by whoever runs successive diffs.
#[derive(Debug, Clone, Default)]
pub struct ChangeIds {
    next: u64,
}

impl ChangeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

/// A change before it is stamped with id and time.
struct Pending {
    kind: ChangeKind,
    entity: String,
    endpoints: Option<(String, String)>,
    description: String,
    old_value: Option<String>,
    new_value: Option<String>,
}

impl Pending {
    fn entity(kind: ChangeKind, id: &str, description: String) -> Self {
        Self {
            kind,
            entity: id.to_string(),
            endpoints: None,
            description,
            old_value: None,
            new_value: None,
        }
    }

    fn link(kind: ChangeKind, link: &Link, description: String) -> Self {
        let (a, b) = link.endpoints();
        Self {
            kind,
            entity: link_key(a, b),
            endpoints: Some((a.to_string(), b.to_string())),
            description,
            old_value: None,
            new_value: None,
        }
    }

    fn values(mut self, old: impl ToString, new: impl ToString) -> Self {
        self.old_value = Some(old.to_string());
        self.new_value = Some(new.to_string());
        self
    }
}

/// Links keyed by sorted endpoint pair; the first link for a pair wins.
fn links_by_pair(topology: &Topology) -> BTreeMap<String, &Link> {
    let mut out = BTreeMap::new();
    for link in &topology.links {
        out.entry(link.key()).or_insert(link);
    }
    out
}

fn describe_link(link: &Link) -> String {
    let (a, b) = link.endpoints();
    format!("{} <-> {}", a, b)
}

/// Compare two snapshots. Changes come grouped by kind (in `ChangeKind`
/// order) and sorted by entity within each group.
pub fn diff(old: &Topology, new: &Topology, ids: &mut ChangeIds, now: i64) -> Vec<Change> {
    let mut pending = Vec::new();

    let old_routers: BTreeSet<&String> = old.routers.keys().collect();
    let new_routers: BTreeSet<&String> = new.routers.keys().collect();
    for id in new_routers.difference(&old_routers) {
        let area = &new.routers[*id].area;
        pending.push(Pending::entity(
            ChangeKind::RouterAdded,
            id,
            format!("Router {} joined (Area {})", id, area),
        ));
    }
    for id in old_routers.difference(&new_routers) {
        pending.push(Pending::entity(
            ChangeKind::RouterRemoved,
            id,
            format!("Router {} went down", id),
        ));
    }

    let old_networks: BTreeSet<&String> = old.networks.keys().collect();
    let new_networks: BTreeSet<&String> = new.networks.keys().collect();
    for id in new_networks.difference(&old_networks) {
        pending.push(Pending::entity(
            ChangeKind::NetworkAdded,
            id,
            format!("Network {} appeared", id),
        ));
    }
    for id in old_networks.difference(&new_networks) {
        pending.push(Pending::entity(
            ChangeKind::NetworkRemoved,
            id,
            format!("Network {} disappeared", id),
        ));
    }

    let old_links = links_by_pair(old);
    let new_links = links_by_pair(new);
    for (key, link) in &new_links {
        if !old_links.contains_key(key) {
            pending.push(Pending::link(
                ChangeKind::LinkAdded,
                link,
                format!("Link {} up (cost {})", describe_link(link), link.cost),
            ));
        }
    }
    for (key, link) in &old_links {
        if !new_links.contains_key(key) {
            pending.push(Pending::link(
                ChangeKind::LinkRemoved,
                link,
                format!("Link {} down", describe_link(link)),
            ));
        }
    }
    for (key, before) in &old_links {
        let Some(after) = new_links.get(key) else {
            continue;
        };
        if before.directed_costs() != after.directed_costs() {
            let (old_metric, new_metric) = (before.metric_label(), after.metric_label());
            pending.push(
                Pending::link(
                    ChangeKind::MetricChanged,
                    after,
                    format!("Metric {}: {} -> {}", describe_link(after), old_metric, new_metric),
                )
                .values(old_metric, new_metric),
            );
        }
    }

    for (id, before) in &old.routers {
        let Some(after) = new.routers.get(id) else {
            continue;
        };
        if before.area != after.area {
            pending.push(
                Pending::entity(
                    ChangeKind::AreaChanged,
                    id,
                    format!("Router {} moved from Area {} to Area {}", id, before.area, after.area),
                )
                .values(&before.area, &after.area),
            );
        }
    }

    // Stable order regardless of which loop produced an entry.
    pending.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.entity.cmp(&b.entity)));

    pending
        .into_iter()
        .map(|p| Change {
            id: ids.next_id(),
            kind: p.kind,
            entity: p.entity,
            endpoints: p.endpoints,
            description: p.description,
            old_value: p.old_value,
            new_value: p.new_value,
            timestamp: now,
        })
        .collect()
}
