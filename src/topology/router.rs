use serde::Serialize;
use std::collections::BTreeSet;

/// Router role inferred from the border-router flags.
///
/// Variants are declared in upgrade order so `Ord` is the upgrade lattice:
/// a role can move right but never left within one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouterRole {
    #[default]
    Internal,
    Abr,
    Asbr,
}

impl RouterRole {
    /// ABR+ASBR and ASBR-only both report as `Asbr`.
    pub fn from_flags(area_border: bool, as_boundary: bool) -> Self {
        match (area_border, as_boundary) {
            (_, true) => RouterRole::Asbr,
            (true, false) => RouterRole::Abr,
            (false, false) => RouterRole::Internal,
        }
    }

    pub fn upgrade(self, observed: RouterRole) -> RouterRole {
        self.max(observed)
    }
}

/// Which LSA kinds advertised something about a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LsaType {
    Router,
    Network,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Router {
    pub id: String,
    pub role: RouterRole,
    /// First area the router was observed in.
    pub area: String,
    /// Every area the router was observed in.
    pub areas: BTreeSet<String>,
    pub lsa_types: BTreeSet<LsaType>,
    pub neighbors: BTreeSet<String>,
    pub networks: BTreeSet<String>,
    pub sequence: Option<String>,
    pub age: Option<u32>,
    pub checksum: Option<String>,
    pub declared_links: Option<u32>,
}

impl Router {
    /// Minimal router known only by id and area.
    pub fn new(id: impl Into<String>, area: impl Into<String>) -> Self {
        let area = area.into();
        Self {
            id: id.into(),
            role: RouterRole::Internal,
            areas: BTreeSet::from([area.clone()]),
            area,
            lsa_types: BTreeSet::new(),
            neighbors: BTreeSet::new(),
            networks: BTreeSet::new(),
            sequence: None,
            age: None,
            checksum: None,
            declared_links: None,
        }
    }
}

/// Merge a newly observed record for the same router id into an existing one.
///
/// Role follows the upgrade lattice, set-valued attributes are unioned, and
/// scalar header fields keep the first value seen.
pub fn merge_router(existing: Router, observed: Router) -> Router {
    debug_assert_eq!(existing.id, observed.id);

    let mut merged = existing;
    merged.role = merged.role.upgrade(observed.role);
    merged.areas.extend(observed.areas);
    merged.lsa_types.extend(observed.lsa_types);
    merged.neighbors.extend(observed.neighbors);
    merged.networks.extend(observed.networks);
    merged.sequence = merged.sequence.or(observed.sequence);
    merged.age = merged.age.or(observed.age);
    merged.checksum = merged.checksum.or(observed.checksum);
    merged.declared_links = merged.declared_links.or(observed.declared_links);
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    /// Link State ID of the Network LSA (the DR interface address).
    pub id: String,
    pub mask: Option<String>,
    pub attached_routers: Vec<String>,
    pub designated_router: Option<String>,
    pub advertising_router: Option<String>,
    pub area: String,
}
