//! Synthetic "show ip ospf database" generator.
//!
//! Starts from a fixed three-area network and applies one random mutation per
//! round (router joins, router goes down, metric change, router restored), so
//! successive renders exercise the differ and the tombstone path.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
struct DemoRouter {
    area_border: bool,
    as_boundary: bool,
    areas: Vec<String>,
    seq: String,
    checksum: String,
}

#[derive(Debug, Clone, PartialEq)]
struct DemoLink {
    a: String,
    b: String,
    iface_a: String,
    iface_b: String,
    subnet: String,
    mask: String,
    metric: u32,
    area: String,
}

impl DemoLink {
    fn touches(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }

    fn same_pair(&self, other: &DemoLink) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

#[derive(Debug, Clone)]
struct TransitNet {
    dr: String,
    advertising: String,
    mask: String,
    area: String,
    metric: u32,
    /// Attached router -> its interface address on the segment.
    members: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy)]
struct Extra {
    id: &'static str,
    area: &'static str,
    connect_to: &'static str,
    iface_self: &'static str,
    iface_peer: &'static str,
    subnet: &'static str,
    metric: u32,
    stub: &'static str,
}

type Stub = (String, String, u32);

const CORE_ROUTERS: [&str; 3] = ["1.1.1.1", "2.2.2.2", "3.3.3.3"];
const METRIC_CHOICES: [u32; 7] = [5, 10, 15, 20, 30, 50, 100];
const P2P_MASK: &str = "255.255.255.252";
const STUB_MASK: &str = "255.255.255.0";

const EXTRAS: [Extra; 3] = [
    Extra {
        id: "6.6.6.6",
        area: "1",
        connect_to: "4.4.4.4",
        iface_self: "10.1.46.2",
        iface_peer: "10.1.46.1",
        subnet: "10.1.46.0",
        metric: 10,
        stub: "10.1.60.0",
    },
    Extra {
        id: "7.7.7.7",
        area: "2",
        connect_to: "5.5.5.5",
        iface_self: "10.2.57.2",
        iface_peer: "10.2.57.1",
        subnet: "10.2.57.0",
        metric: 15,
        stub: "10.2.70.0",
    },
    Extra {
        id: "8.8.8.8",
        area: "0",
        connect_to: "2.2.2.2",
        iface_self: "10.0.28.2",
        iface_peer: "10.0.28.1",
        subnet: "10.0.28.0",
        metric: 30,
        stub: "10.0.80.0",
    },
];

fn base_routers() -> BTreeMap<String, DemoRouter> {
    let rows: [(&str, bool, bool, &[&str], &str, &str); 5] = [
        ("1.1.1.1", true, false, &["0", "1"], "80000005", "0x3A9C"),
        ("2.2.2.2", true, true, &["0"], "80000007", "0x4B2E"),
        ("3.3.3.3", true, false, &["0", "2"], "80000003", "0x5D1F"),
        ("4.4.4.4", false, false, &["1"], "80000006", "0x6E3A"),
        ("5.5.5.5", false, false, &["2"], "80000008", "0x8D1C"),
    ];
    rows.into_iter()
        .map(|(id, abr, asbr, areas, seq, checksum)| {
            (
                id.to_string(),
                DemoRouter {
                    area_border: abr,
                    as_boundary: asbr,
                    areas: areas.iter().map(|a| a.to_string()).collect(),
                    seq: seq.to_string(),
                    checksum: checksum.to_string(),
                },
            )
        })
        .collect()
}

fn p2p(
    a: &str,
    b: &str,
    iface_a: &str,
    iface_b: &str,
    subnet: &str,
    metric: u32,
    area: &str,
) -> DemoLink {
    DemoLink {
        a: a.to_string(),
        b: b.to_string(),
        iface_a: iface_a.to_string(),
        iface_b: iface_b.to_string(),
        subnet: subnet.to_string(),
        mask: P2P_MASK.to_string(),
        metric,
        area: area.to_string(),
    }
}

fn base_links() -> Vec<DemoLink> {
    vec![
        p2p("1.1.1.1", "2.2.2.2", "10.0.12.1", "10.0.12.2", "10.0.12.0", 10, "0"),
        p2p("2.2.2.2", "3.3.3.3", "10.0.23.1", "10.0.23.2", "10.0.23.0", 20, "0"),
        p2p("1.1.1.1", "4.4.4.4", "10.1.14.1", "10.1.14.2", "10.1.14.0", 15, "1"),
        p2p("3.3.3.3", "5.5.5.5", "10.2.35.1", "10.2.35.2", "10.2.35.0", 25, "2"),
    ]
}

fn base_transit() -> TransitNet {
    TransitNet {
        dr: "10.0.123.2".to_string(),
        advertising: "2.2.2.2".to_string(),
        mask: "/24".to_string(),
        area: "0".to_string(),
        metric: 5,
        members: [
            ("1.1.1.1", "10.0.123.1"),
            ("2.2.2.2", "10.0.123.2"),
            ("3.3.3.3", "10.0.123.3"),
        ]
        .into_iter()
        .map(|(r, i)| (r.to_string(), i.to_string()))
        .collect(),
    }
}

fn base_stubs() -> BTreeMap<String, Vec<Stub>> {
    BTreeMap::from([
        (
            "4.4.4.4".to_string(),
            vec![("10.1.40.0".to_string(), STUB_MASK.to_string(), 1)],
        ),
        (
            "5.5.5.5".to_string(),
            vec![("10.2.50.0".to_string(), STUB_MASK.to_string(), 1)],
        ),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    AddRouter,
    RemoveRouter,
    ChangeMetric,
    RestoreRouter,
}

/// Weighted mutation table: add 30, remove 20, metric 35, restore 15.
const MUTATION_WEIGHTS: [(Mutation, u32); 4] = [
    (Mutation::AddRouter, 30),
    (Mutation::RemoveRouter, 20),
    (Mutation::ChangeMetric, 35),
    (Mutation::RestoreRouter, 15),
];

/// Mutable demo network with its own seeded RNG.
#[derive(Debug, Clone)]
pub struct DemoNetwork {
    routers: BTreeMap<String, DemoRouter>,
    links: Vec<DemoLink>,
    transit: TransitNet,
    stubs: BTreeMap<String, Vec<Stub>>,
    added_extras: BTreeSet<String>,
    seq_counter: u32,
    rng: StdRng,
}

impl DemoNetwork {
    pub fn new(seed: u64) -> Self {
        Self {
            routers: base_routers(),
            links: base_links(),
            transit: base_transit(),
            stubs: base_stubs(),
            added_extras: BTreeSet::new(),
            seq_counter: 10,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn next_seq(&mut self) -> String {
        self.seq_counter += 1;
        format!("8000{:04X}", self.seq_counter)
    }

    fn random_age(&mut self) -> u32 {
        self.rng.gen_range(50..=800)
    }

    fn random_checksum(&mut self) -> String {
        format!("0x{:04X}", self.rng.gen_range(0x1000..=0xFFFF))
    }

    /// Pick a weighted mutation and apply it, falling back to a metric change
    /// when the pick is not possible. Returns a description of what happened.
    pub fn step(&mut self) -> Option<String> {
        let total: u32 = MUTATION_WEIGHTS.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.gen_range(1..=total);
        let mut chosen = Mutation::ChangeMetric;
        for (mutation, weight) in MUTATION_WEIGHTS {
            if roll <= weight {
                chosen = mutation;
                break;
            }
            roll -= weight;
        }

        self.apply(chosen).or_else(|| self.change_random_metric())
    }

    pub fn apply(&mut self, mutation: Mutation) -> Option<String> {
        match mutation {
            Mutation::AddRouter => self.add_random_router(),
            Mutation::RemoveRouter => self.remove_random_router(),
            Mutation::ChangeMetric => self.change_random_metric(),
            Mutation::RestoreRouter => self.restore_random_router(),
        }
    }

    fn add_random_router(&mut self) -> Option<String> {
        let available: Vec<Extra> = EXTRAS
            .iter()
            .filter(|e| !self.routers.contains_key(e.id))
            .copied()
            .collect();
        let extra = *available.choose(&mut self.rng)?;

        let seq = self.next_seq();
        let checksum = self.random_checksum();
        self.routers.insert(
            extra.id.to_string(),
            DemoRouter {
                area_border: false,
                as_boundary: false,
                areas: vec![extra.area.to_string()],
                seq,
                checksum,
            },
        );
        self.links.push(p2p(
            extra.connect_to,
            extra.id,
            extra.iface_peer,
            extra.iface_self,
            extra.subnet,
            extra.metric,
            extra.area,
        ));
        self.stubs.insert(
            extra.id.to_string(),
            vec![(extra.stub.to_string(), STUB_MASK.to_string(), 1)],
        );
        self.added_extras.insert(extra.id.to_string());
        Some(format!("Router {} joined (Area {})", extra.id, extra.area))
    }

    fn remove_random_router(&mut self) -> Option<String> {
        let mut removable: Vec<String> = self
            .added_extras
            .iter()
            .filter(|r| self.routers.contains_key(*r))
            .cloned()
            .collect();
        if removable.is_empty() {
            removable = self
                .routers
                .keys()
                .filter(|r| !CORE_ROUTERS.contains(&r.as_str()))
                .cloned()
                .collect();
        }
        let rid = removable.choose(&mut self.rng)?.clone();

        self.routers.remove(&rid);
        self.links.retain(|l| !l.touches(&rid));
        self.stubs.remove(&rid);
        self.added_extras.remove(&rid);
        self.transit.members.remove(&rid);
        Some(format!("Router {} went DOWN", rid))
    }

    fn change_random_metric(&mut self) -> Option<String> {
        if self.links.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.links.len());
        let old = self.links[idx].metric;
        let choices: Vec<u32> = METRIC_CHOICES.iter().copied().filter(|m| *m != old).collect();
        let new = *choices.choose(&mut self.rng)?;

        let link = &mut self.links[idx];
        link.metric = new;
        Some(format!("Metric {}<->{}: {} -> {}", link.a, link.b, old, new))
    }

    fn restore_random_router(&mut self) -> Option<String> {
        let base = base_routers();
        let missing: Vec<String> = base
            .keys()
            .filter(|r| !self.routers.contains_key(*r))
            .cloned()
            .collect();
        let rid = missing.choose(&mut self.rng)?.clone();

        let mut router = base[&rid].clone();
        router.seq = self.next_seq();
        self.routers.insert(rid.clone(), router);

        for link in base_links() {
            if !link.touches(&rid) {
                continue;
            }
            let other = if link.a == rid { &link.b } else { &link.a };
            if self.routers.contains_key(other) && !self.links.iter().any(|l| l.same_pair(&link)) {
                self.links.push(link);
            }
        }
        if let Some(stubs) = base_stubs().remove(&rid) {
            self.stubs.insert(rid.clone(), stubs);
        }
        if let Some(iface) = base_transit().members.remove(&rid) {
            self.transit.members.entry(rid.clone()).or_insert(iface);
        }
        Some(format!("Router {} restored (back online)", rid))
    }

    /// Render the current state as an LSA dump.
    pub fn render(&mut self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "            OSPF Router with ID (1.1.1.1) (Process ID 1)\n");

        let areas: BTreeSet<String> = self
            .routers
            .values()
            .flat_map(|r| r.areas.iter().cloned())
            .collect();
        let routers = self.routers.clone();

        for area in &areas {
            let _ = writeln!(out, "                Router Link States (Area {})\n", area);
            for (rid, info) in routers.iter().filter(|(_, r)| r.areas.contains(area)) {
                self.render_router(&mut out, rid, info, area);
            }
        }

        if self.transit.members.len() >= 2 {
            self.render_transit(&mut out);
        }
        self.render_summaries(&mut out, &areas);
        out
    }

    fn render_router(&mut self, out: &mut String, rid: &str, info: &DemoRouter, area: &str) {
        // (neighbor, own interface, subnet, mask, metric)
        let p2p_links: Vec<(String, String, String, String, u32)> = self
            .links
            .iter()
            .filter(|l| l.area == area && l.touches(rid))
            .map(|l| {
                if l.a == rid {
                    (l.b.clone(), l.iface_a.clone(), l.subnet.clone(), l.mask.clone(), l.metric)
                } else {
                    (l.a.clone(), l.iface_b.clone(), l.subnet.clone(), l.mask.clone(), l.metric)
                }
            })
            .collect();
        let transit_iface = (area == self.transit.area)
            .then(|| self.transit.members.get(rid).cloned())
            .flatten();
        let stubs = self.stubs.get(rid).cloned().unwrap_or_default();

        let entries = p2p_links.len() * 2 + usize::from(transit_iface.is_some()) + stubs.len();
        let age = self.random_age();

        let _ = writeln!(out, "  LS age: {}", age);
        let _ = writeln!(out, "  Options: (No TOS-capability, DC)");
        let _ = writeln!(out, "  LS Type: Router Links");
        let _ = writeln!(out, "  Link State ID: {}", rid);
        let _ = writeln!(out, "  Advertising Router: {}", rid);
        let _ = writeln!(out, "  LS Seq Number: {}", info.seq);
        let _ = writeln!(out, "  Checksum: {}", info.checksum);
        let _ = writeln!(out, "  Length: {}", 24 + entries * 12);
        if info.area_border {
            let _ = writeln!(out, "  Area Border Router");
        }
        if info.as_boundary {
            let _ = writeln!(out, "  AS Boundary Router");
        }
        let _ = writeln!(out, "   Number of Links: {}\n", entries);

        for (neighbor, iface, subnet, mask, metric) in &p2p_links {
            link_record(
                out,
                "another Router (point-to-point)",
                "Neighboring Router ID",
                neighbor,
                "Router Interface address",
                iface,
                *metric,
            );
            link_record(
                out,
                "a Stub Network",
                "Network/subnet number",
                subnet,
                "Network Mask",
                mask,
                *metric,
            );
        }
        if let Some(iface) = &transit_iface {
            link_record(
                out,
                "a Transit Network",
                "Designated Router address",
                &self.transit.dr,
                "Router Interface address",
                iface,
                self.transit.metric,
            );
        }
        for (net, mask, metric) in &stubs {
            link_record(
                out,
                "a Stub Network",
                "Network/subnet number",
                net,
                "Network Mask",
                mask,
                *metric,
            );
        }
    }

    fn render_transit(&mut self, out: &mut String) {
        let age = self.random_age();
        let seq = self.next_seq();
        let checksum = self.random_checksum();
        let t = &self.transit;

        let _ = writeln!(out, "                Net Link States (Area {})\n", t.area);
        let _ = writeln!(out, "  LS age: {}", age);
        let _ = writeln!(out, "  Options: (No TOS-capability, DC)");
        let _ = writeln!(out, "  LS Type: Network Links");
        let _ = writeln!(out, "  Link State ID: {}", t.dr);
        let _ = writeln!(out, "  Advertising Router: {}", t.advertising);
        let _ = writeln!(out, "  LS Seq Number: {}", seq);
        let _ = writeln!(out, "  Checksum: {}", checksum);
        let _ = writeln!(out, "  Length: {}", 20 + t.members.len() * 4);
        let _ = writeln!(out, "  Network Mask: {}", t.mask);
        for rid in t.members.keys() {
            let _ = writeln!(out, "        Attached Router: {}", rid);
        }
        let _ = writeln!(out);
    }

    fn render_summaries(&mut self, out: &mut String, areas: &BTreeSet<String>) {
        let _ = writeln!(out, "                Summary Net Link States (Area 0)\n");
        let summaries = [("1", "10.1.0.0", "1.1.1.1", 15), ("2", "10.2.0.0", "3.3.3.3", 25)];
        for (area, prefix, advertiser, metric) in summaries {
            if !areas.contains(area) {
                continue;
            }
            let age = self.random_age();
            let seq = self.next_seq();
            let checksum = self.random_checksum();
            let _ = writeln!(out, "  LS age: {}", age);
            let _ = writeln!(out, "  Options: (No TOS-capability, DC)");
            let _ = writeln!(out, "  LS Type: Summary Links(Network)");
            let _ = writeln!(out, "  Link State ID: {}", prefix);
            let _ = writeln!(out, "  Advertising Router: {}", advertiser);
            let _ = writeln!(out, "  LS Seq Number: {}", seq);
            let _ = writeln!(out, "  Checksum: {}", checksum);
            let _ = writeln!(out, "  Length: 28");
            let _ = writeln!(out, "  Network Mask: /16");
            let _ = writeln!(out, "        TOS: 0  Metric: {}\n", metric);
        }
    }
}

fn link_record(
    out: &mut String,
    connected_to: &str,
    id_label: &str,
    id: &str,
    data_label: &str,
    data: &str,
    metric: u32,
) {
    let _ = writeln!(out, "    Link connected to: {}", connected_to);
    let _ = writeln!(out, "     (Link ID) {}: {}", id_label, id);
    let _ = writeln!(out, "     (Link Data) {}: {}", data_label, data);
    let _ = writeln!(out, "     Number of Metrics: 0");
    let _ = writeln!(out, "      TOS 0 Metrics: {}\n", metric);
}
