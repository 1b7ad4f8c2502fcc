//! Topology layer: the structured result of parsing an LSA dump.
//!
//! A `Topology` is built once per input text and never mutated afterwards.
//! Everything downstream (graph builder, layout, differ) only reads it.
//!
//! It owns:
//! - Router / Network records and the role-upgrade merge
//! - Link records and the sorted-pair link identity

pub mod link;
pub mod router;

pub use link::{Link, LinkKind, link_key};
pub use router::{LsaType, Network, Router, RouterRole, merge_router};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Area id of the OSPF backbone.
pub const BACKBONE_AREA: &str = "0";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    pub routers: BTreeMap<String, Router>,
    pub networks: BTreeMap<String, Network>,
    pub links: Vec<Link>,
    /// Sorted union of router and network areas.
    pub areas: Vec<String>,
}

impl Topology {
    /// Assemble a topology and derive its area list.
    pub fn new(
        routers: BTreeMap<String, Router>,
        networks: BTreeMap<String, Network>,
        links: Vec<Link>,
    ) -> Self {
        let mut areas = BTreeSet::new();
        for r in routers.values() {
            areas.extend(r.areas.iter().cloned());
            areas.insert(r.area.clone());
        }
        for n in networks.values() {
            areas.insert(n.area.clone());
        }

        Self {
            routers,
            networks,
            links,
            areas: areas.into_iter().collect(),
        }
    }

    /// True when the parser recovered nothing usable from its input.
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty() && self.networks.is_empty() && self.links.is_empty()
    }
}
