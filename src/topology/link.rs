//! Links between routers, or between a router and a transit network.
//!
//! A link is identified by its unordered endpoint pair. Two parallel circuits
//! between the same endpoints therefore collapse into one link.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    PointToPoint,
    Transit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    /// Metric advertised by `source`.
    pub cost: u32,
    /// Metric advertised by `target`, when it differs from `cost`.
    pub reverse_cost: Option<u32>,
    /// Interface address (Link Data) on the `source` side.
    pub interface: Option<String>,
    pub area: String,
}

impl Link {
    /// Sorted endpoint pair.
    pub fn endpoints(&self) -> (&str, &str) {
        sorted_pair(&self.source, &self.target)
    }

    pub fn key(&self) -> String {
        link_key(&self.source, &self.target)
    }

    /// Metric in each direction of the sorted endpoint pair, low to high
    /// first. A missing `reverse_cost` means both ends agree.
    pub fn directed_costs(&self) -> (u32, u32) {
        let reverse = self.reverse_cost.unwrap_or(self.cost);
        if self.source <= self.target {
            (self.cost, reverse)
        } else {
            (reverse, self.cost)
        }
    }

    /// "10" when both directions agree, otherwise "10/50" (low to high first).
    pub fn metric_label(&self) -> String {
        match self.directed_costs() {
            (up, down) if up == down => up.to_string(),
            (up, down) => format!("{}/{}", up, down),
        }
    }
}

fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Identity of the link between `a` and `b`, independent of direction.
pub fn link_key(a: &str, b: &str) -> String {
    let (lo, hi) = sorted_pair(a, b);
    format!("{}--{}", lo, hi)
}
