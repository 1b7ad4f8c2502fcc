use crate::Result;
use crate::lsa::block::{BlockMarkers, LsaBlock, segment};
use crate::topology::{
    Link, LinkKind, LsaType, Network, Router, RouterRole, Topology, link_key, merge_router,
};
use log::{debug, trace};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Best-effort parser for LSA dumps.
///
/// Parsing never fails: unrecognized lines are skipped and a block without
/// its Link State ID is dropped whole. Input with no usable blocks yields an
/// empty `Topology`, which callers report as "no data".
#[derive(Debug, Clone)]
pub struct LsaParser {
    markers: BlockMarkers,
    fields: FieldPatterns,
}

#[derive(Debug, Clone)]
struct FieldPatterns {
    router_links: Regex,
    network_links: Regex,
    link_state_id: Regex,
    advertising_router: Regex,
    sequence: Regex,
    checksum: Regex,
    area_border: Regex,
    as_boundary: Regex,
    number_of_links: Regex,
    network_mask: Regex,
    attached_router: Regex,
    link_connected: Regex,
    link_id: Regex,
    link_data: Regex,
    tos0_metric: Regex,
}

impl FieldPatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            router_links: Regex::new(r"(?i)LS Type:\s*Router Links")?,
            network_links: Regex::new(r"(?i)LS Type:\s*Network Links")?,
            link_state_id: Regex::new(r"(?i)^\s*Link State ID:\s*(\S+)")?,
            advertising_router: Regex::new(r"(?i)^\s*Advertising Router:\s*(\S+)")?,
            sequence: Regex::new(r"(?i)^\s*LS Seq Number:\s*(\S+)")?,
            checksum: Regex::new(r"(?i)^\s*Checksum:\s*(\S+)")?,
            area_border: Regex::new(r"(?i)^\s*Area Border Router\s*$")?,
            as_boundary: Regex::new(r"(?i)^\s*AS Boundary Router\s*$")?,
            number_of_links: Regex::new(r"(?i)^\s*Number of Links:\s*(\d+)")?,
            network_mask: Regex::new(r"(?i)^\s*Network Mask:\s*(\S+)")?,
            attached_router: Regex::new(r"(?i)^\s*Attached Router:\s*(\S+)")?,
            link_connected: Regex::new(r"(?i)^\s*Link connected to:\s*(.*?)\s*$")?,
            link_id: Regex::new(r"(?i)\(Link ID\)[^:]*:\s*(\S+)")?,
            link_data: Regex::new(r"(?i)\(Link Data\)[^:]*:\s*(\S+)")?,
            tos0_metric: Regex::new(r"(?i)TOS 0 Metrics?:\s*(\d+)")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Router,
    Network,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouterLinkKind {
    PointToPoint,
    Transit,
    Stub,
}

impl RouterLinkKind {
    fn classify(phrase: &str) -> Self {
        let phrase = phrase.to_ascii_lowercase();
        if phrase.contains("point-to-point") {
            RouterLinkKind::PointToPoint
        } else if phrase.contains("transit") {
            RouterLinkKind::Transit
        } else {
            RouterLinkKind::Stub
        }
    }
}

/// One `Link connected to:` record inside a Router LSA.
#[derive(Debug, Clone, PartialEq)]
struct RouterLinkRecord {
    kind: RouterLinkKind,
    link_id: String,
    link_data: Option<String>,
    cost: u32,
}

#[derive(Debug, Clone)]
struct RouterLsa {
    router: Router,
    links: Vec<RouterLinkRecord>,
}

impl LsaParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            markers: BlockMarkers::new()?,
            fields: FieldPatterns::new()?,
        })
    }

    /// Parse a full dump into a topology.
    pub fn parse(&self, text: &str) -> Topology {
        let blocks = segment(text, &self.markers);
        let mut acc = Accumulator::default();

        for block in &blocks {
            match self.classify(block) {
                BlockKind::Router => match self.parse_router(block) {
                    Some(lsa) => acc.add_router_lsa(lsa),
                    None => debug!(
                        "dropping Router LSA without Link State ID (area {})",
                        block.area
                    ),
                },
                BlockKind::Network => match self.parse_network(block) {
                    Some(network) => acc.add_network_lsa(network),
                    None => debug!(
                        "dropping Network LSA without Link State ID (area {})",
                        block.area
                    ),
                },
                BlockKind::Other => trace!("skipping unsupported LSA block in area {}", block.area),
            }
        }

        let topology = acc.finish();
        debug!(
            "parsed {} blocks: {} routers, {} networks, {} links, areas {:?}",
            blocks.len(),
            topology.routers.len(),
            topology.networks.len(),
            topology.links.len(),
            topology.areas
        );
        topology
    }

    fn classify(&self, block: &LsaBlock) -> BlockKind {
        if block.lines.iter().any(|l| self.fields.router_links.is_match(l)) {
            BlockKind::Router
        } else if block.lines.iter().any(|l| self.fields.network_links.is_match(l)) {
            BlockKind::Network
        } else {
            BlockKind::Other
        }
    }

    fn parse_router(&self, block: &LsaBlock) -> Option<RouterLsa> {
        let f = &self.fields;

        // Header lines end where the first link record begins.
        let split = block
            .lines
            .iter()
            .position(|l| f.link_connected.is_match(l))
            .unwrap_or(block.lines.len());
        let (header, body) = block.lines.split_at(split);

        let id = first_capture(&f.link_state_id, header)?;
        let area_border = header.iter().any(|l| f.area_border.is_match(l));
        let as_boundary = header.iter().any(|l| f.as_boundary.is_match(l));

        let mut router = Router::new(id, block.area.clone());
        router.role = RouterRole::from_flags(area_border, as_boundary);
        router.lsa_types.insert(LsaType::Router);
        router.age = block.age;
        router.sequence = first_capture(&f.sequence, header);
        router.checksum = first_capture(&f.checksum, header);
        router.declared_links =
            first_capture(&f.number_of_links, header).and_then(|n| n.parse().ok());

        let links = self.parse_link_records(body);
        Some(RouterLsa { router, links })
    }

    fn parse_link_records(&self, body: &[&str]) -> Vec<RouterLinkRecord> {
        let f = &self.fields;

        let mut starts: Vec<(usize, RouterLinkKind)> = Vec::new();
        for (i, line) in body.iter().enumerate() {
            if let Some(caps) = f.link_connected.captures(line) {
                starts.push((i, RouterLinkKind::classify(&caps[1])));
            }
        }

        let mut records = Vec::new();
        for (n, (start, kind)) in starts.iter().enumerate() {
            let end = starts.get(n + 1).map(|(s, _)| *s).unwrap_or(body.len());
            let lines = &body[*start..end];

            let Some(link_id) = first_capture(&f.link_id, lines) else {
                trace!("skipping link record without Link ID");
                continue;
            };
            records.push(RouterLinkRecord {
                kind: *kind,
                link_id,
                link_data: first_capture(&f.link_data, lines),
                cost: first_capture(&f.tos0_metric, lines)
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(0),
            });
        }
        records
    }

    fn parse_network(&self, block: &LsaBlock) -> Option<Network> {
        let f = &self.fields;
        let lines = block.lines.as_slice();

        let id = first_capture(&f.link_state_id, lines)?;
        let advertising_router = first_capture(&f.advertising_router, lines);

        let mut attached_routers: Vec<String> = Vec::new();
        for line in lines {
            if let Some(caps) = f.attached_router.captures(line) {
                let rid = caps[1].to_string();
                if !attached_routers.contains(&rid) {
                    attached_routers.push(rid);
                }
            }
        }

        Some(Network {
            id,
            mask: first_capture(&f.network_mask, lines),
            attached_routers,
            designated_router: advertising_router.clone(),
            advertising_router,
            area: block.area.clone(),
        })
    }
}

fn first_capture(re: &Regex, lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find_map(|l| re.captures(l).map(|c| c[1].to_string()))
}

/// Entities collected so far while walking blocks in input order.
#[derive(Debug, Default)]
struct Accumulator {
    routers: BTreeMap<String, Router>,
    networks: BTreeMap<String, Network>,
    links: Vec<Link>,
    /// Point-to-point pair key -> index into `links`.
    seen_pairs: HashMap<String, usize>,
    /// Pairs whose far end has already reported its metric.
    answered: HashSet<String>,
}

impl Accumulator {
    fn upsert_router(&mut self, observed: Router) {
        let merged = match self.routers.remove(&observed.id) {
            Some(existing) => merge_router(existing, observed),
            None => observed,
        };
        self.routers.insert(merged.id.clone(), merged);
    }

    fn add_router_lsa(&mut self, lsa: RouterLsa) {
        let RouterLsa { mut router, links } = lsa;
        let area = router.area.clone();

        for rec in links {
            match rec.kind {
                RouterLinkKind::PointToPoint => {
                    router.neighbors.insert(rec.link_id.clone());
                    self.add_point_to_point(&router.id, rec, &area);
                }
                RouterLinkKind::Transit => {
                    router.networks.insert(rec.link_id);
                }
                RouterLinkKind::Stub => {
                    router.networks.insert(format!(
                        "stub-{}-{}",
                        rec.link_id,
                        rec.link_data.unwrap_or_default()
                    ));
                }
            }
        }

        self.upsert_router(router);
    }

    fn add_point_to_point(&mut self, self_id: &str, rec: RouterLinkRecord, area: &str) {
        let key = link_key(self_id, &rec.link_id);

        if let Some(&idx) = self.seen_pairs.get(&key) {
            // Parallel circuits collapse into the first one. The far end's
            // first record for the pair supplies the reverse metric, kept
            // only when it differs from ours.
            let existing = &mut self.links[idx];
            if existing.source != self_id
                && self.answered.insert(key)
                && existing.cost != rec.cost
            {
                existing.reverse_cost = Some(rec.cost);
            }
            return;
        }

        self.seen_pairs.insert(key, self.links.len());
        self.links.push(Link {
            source: self_id.to_string(),
            target: rec.link_id,
            kind: LinkKind::PointToPoint,
            cost: rec.cost,
            reverse_cost: None,
            interface: rec.link_data,
            area: area.to_string(),
        });
    }

    fn add_network_lsa(&mut self, network: Network) {
        for rid in &network.attached_routers {
            self.links.push(Link {
                source: network.id.clone(),
                target: rid.clone(),
                kind: LinkKind::Transit,
                cost: 0,
                reverse_cost: None,
                interface: None,
                area: network.area.clone(),
            });

            let advertises = network.advertising_router.as_deref() == Some(rid.as_str());
            if advertises {
                let mut observed = Router::new(rid.clone(), network.area.clone());
                observed.lsa_types.insert(LsaType::Network);
                self.upsert_router(observed);
            } else if !self.routers.contains_key(rid) {
                self.routers
                    .insert(rid.clone(), Router::new(rid.clone(), network.area.clone()));
            }
        }

        match self.networks.get_mut(&network.id) {
            Some(existing) => {
                for rid in network.attached_routers {
                    if !existing.attached_routers.contains(&rid) {
                        existing.attached_routers.push(rid);
                    }
                }
            }
            None => {
                self.networks.insert(network.id.clone(), network);
            }
        }
    }

    fn finish(self) -> Topology {
        let mut seen: BTreeSet<(String, LinkKind)> = BTreeSet::new();
        let links: Vec<Link> = self
            .links
            .into_iter()
            .filter(|l| seen.insert((l.key(), l.kind)))
            .collect();

        Topology::new(self.routers, self.networks, links)
    }
}
