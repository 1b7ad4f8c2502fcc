//! Periodic refresh: fetch raw LSA text, re-parse, diff against the last
//! published snapshot and re-annotate.
//!
//! Ticks run one after another on the caller's thread, so two refreshes
//! never overlap. A failing tick turns into a `RefreshStatus` value and the
//! loop carries on.

use crate::Result;
use crate::demo::DemoNetwork;
use crate::diff::{Change, ChangeIds, annotate_edges, annotate_nodes, carry_tombstones, diff};
use crate::graph::{self, GraphEdge, GraphNode};
use crate::layout::{self, Canvas, LayoutConfig};
use crate::lsa::LsaParser;
use crate::topology::Topology;
use anyhow::Context;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Changes kept in the session history; older entries are dropped first.
pub const HISTORY_LIMIT: usize = 500;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Where raw "show ip ospf database" text comes from.
pub trait LsaSource {
    fn describe(&self) -> String;
    fn fetch(&mut self) -> Result<String>;
}

/// Re-reads a dump file on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: String,
}

impl FileSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl LsaSource for FileSource {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn fetch(&mut self) -> Result<String> {
        fs::read_to_string(&self.path).with_context(|| format!("read LSA dump {}", self.path))
    }
}

/// Synthetic network that mutates once per fetch after the first.
#[derive(Debug, Clone)]
pub struct DemoSource {
    network: DemoNetwork,
    fetched: bool,
}

impl DemoSource {
    pub fn new(seed: u64) -> Self {
        Self {
            network: DemoNetwork::new(seed),
            fetched: false,
        }
    }
}

impl LsaSource for DemoSource {
    fn describe(&self) -> String {
        "demo network".to_string()
    }

    fn fetch(&mut self) -> Result<String> {
        if self.fetched {
            match self.network.step() {
                Some(what) => info!(
                    "demo: {} ({} routers, {} links)",
                    what,
                    self.network.router_count(),
                    self.network.link_count()
                ),
                None => debug!("demo: no mutation applied"),
            }
        }
        self.fetched = true;
        Ok(self.network.render())
    }
}

/// Outcome of one refresh tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum RefreshStatus {
    /// First snapshot published.
    Initial { routers: usize, links: usize },
    Updated { changes: usize },
    Unchanged,
    /// Text parsed to an empty topology. The previous snapshot is kept.
    NoData,
    /// Fetch failed. The previous snapshot is kept.
    Failed { error: String },
}

impl RefreshStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, RefreshStatus::NoData | RefreshStatus::Failed { .. })
    }
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshStatus::Initial { routers, links } => {
                write!(f, "loaded {} routers, {} links", routers, links)
            }
            RefreshStatus::Updated { changes } => write!(f, "{} changes", changes),
            RefreshStatus::Unchanged => write!(f, "no changes"),
            RefreshStatus::NoData => write!(f, "no data found"),
            RefreshStatus::Failed { error } => write!(f, "refresh failed: {}", error),
        }
    }
}

/// The published snapshot plus everything needed to diff the next one.
pub struct Session {
    parser: LsaParser,
    layout: LayoutConfig,
    status_ttl_ms: i64,
    ids: ChangeIds,
    topology: Option<Topology>,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    canvas: Option<Canvas>,
    latest: Vec<Change>,
    history: Vec<Change>,
}

impl Session {
    pub fn new(layout: LayoutConfig, status_ttl_ms: i64) -> Result<Self> {
        Ok(Self {
            parser: LsaParser::new()?,
            layout,
            status_ttl_ms,
            ids: ChangeIds::new(),
            topology: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            canvas: None,
            latest: Vec::new(),
            history: Vec::new(),
        })
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Annotated nodes, tombstones included.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn canvas(&self) -> Option<Canvas> {
        self.canvas
    }

    /// Changes produced by the most recent successful refresh.
    pub fn latest_changes(&self) -> &[Change] {
        &self.latest
    }

    /// Every change seen so far, oldest first, capped at `HISTORY_LIMIT`.
    pub fn history(&self) -> &[Change] {
        &self.history
    }

    /// parse → build → layout → diff → annotate, publishing the result.
    pub fn refresh(&mut self, text: &str, now: i64) -> RefreshStatus {
        let topology = self.parser.parse(text);
        if topology.is_empty() {
            return RefreshStatus::NoData;
        }

        let (mut nodes, edges) = graph::build(&topology);
        let canvas = layout::layout(&mut nodes, &edges, &self.layout);

        let (status, changes) = match &self.topology {
            None => (
                RefreshStatus::Initial {
                    routers: topology.routers.len(),
                    links: topology.links.len(),
                },
                Vec::new(),
            ),
            Some(previous) => {
                let changes = diff(previous, &topology, &mut self.ids, now);
                let status = if changes.is_empty() {
                    RefreshStatus::Unchanged
                } else {
                    RefreshStatus::Updated {
                        changes: changes.len(),
                    }
                };
                (status, changes)
            }
        };

        let nodes = annotate_nodes(&nodes, &changes, &self.nodes);
        let edges = annotate_edges(&edges, &changes, &self.edges);
        self.nodes = carry_tombstones(&self.nodes, nodes, now, self.status_ttl_ms);
        self.edges = carry_tombstones(&self.edges, edges, now, self.status_ttl_ms);

        self.history.extend(changes.iter().cloned());
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        self.latest = changes;
        self.topology = Some(topology);
        self.canvas = Some(canvas);
        status
    }
}

/// Cancels a running `Refresher`. The tick in flight completes; no new
/// tick starts afterwards.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Refresher<S: LsaSource> {
    source: S,
    interval: Duration,
    max_rounds: Option<usize>,
    stop: StopHandle,
}

impl<S: LsaSource> Refresher<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            max_rounds: None,
            stop: StopHandle::default(),
        }
    }

    pub fn with_max_rounds(mut self, rounds: Option<usize>) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// One fetch + refresh. Fetch errors become `Failed`.
    pub fn tick(&mut self, session: &mut Session, now: i64) -> RefreshStatus {
        match self.source.fetch() {
            Ok(text) => session.refresh(&text, now),
            Err(e) => RefreshStatus::Failed {
                error: format!("{:#}", e),
            },
        }
    }

    /// Tick until stopped or `max_rounds` is reached, calling `on_tick` after
    /// every tick. Returns the number of ticks run. Only an error from
    /// `on_tick` ends the loop early.
    pub fn run<F>(&mut self, session: &mut Session, mut on_tick: F) -> Result<usize>
    where
        F: FnMut(&Session, &RefreshStatus) -> Result<()>,
    {
        let mut rounds = 0;
        while !self.stop.is_stopped() {
            let now = chrono::Utc::now().timestamp_millis();
            let status = self.tick(session, now);
            rounds += 1;

            if status.is_failure() {
                warn!("{} (tick {}): {}", self.source.describe(), rounds, status);
            } else {
                info!("{} (tick {}): {}", self.source.describe(), rounds, status);
            }
            on_tick(session, &status)?;

            if self.max_rounds.is_some_and(|max| rounds >= max) {
                break;
            }
            self.pause();
        }
        Ok(rounds)
    }

    fn pause(&self) {
        let mut left = self.interval;
        while !left.is_zero() && !self.stop.is_stopped() {
            let slice = left.min(SLEEP_SLICE);
            thread::sleep(slice);
            left -= slice;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeKind;
    use crate::diff::tests::{BASE, WITHOUT_R2};
    use crate::graph::Status;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        Session::new(LayoutConfig::default(), 10_000).unwrap()
    }

    /// Replays canned responses; `None` is a fetch error.
    struct Scripted {
        replies: Vec<Option<&'static str>>,
        next: usize,
    }

    impl LsaSource for Scripted {
        fn describe(&self) -> String {
            "scripted".to_string()
        }

        fn fetch(&mut self) -> Result<String> {
            let reply = self.replies.get(self.next).copied().flatten();
            self.next += 1;
            match reply {
                Some(text) => Ok(text.to_string()),
                None => anyhow::bail!("connection refused"),
            }
        }
    }

    #[test]
    fn first_refresh_is_initial_then_unchanged() {
        let mut s = session();
        assert_eq!(
            s.refresh(BASE, 0),
            RefreshStatus::Initial {
                routers: 3,
                links: 2
            }
        );
        assert!(s.nodes().iter().all(|n| n.status == Status::Stable));
        assert_eq!(s.refresh(BASE, 1_000), RefreshStatus::Unchanged);
        assert!(s.latest_changes().is_empty());
    }

    #[test]
    fn removed_router_stays_as_tombstone_across_ticks() {
        let mut s = session();
        s.refresh(BASE, 0);

        let status = s.refresh(WITHOUT_R2, 1_000);
        assert_eq!(status, RefreshStatus::Updated { changes: 2 });
        let kinds: Vec<ChangeKind> = s.latest_changes().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::RouterRemoved, ChangeKind::LinkRemoved]);

        let tombstone = |s: &Session| {
            s.nodes()
                .iter()
                .find(|n| n.id == "2.2.2.2")
                .map(|n| n.status)
        };
        assert_eq!(tombstone(&s), Some(Status::Removed { at: 1_000 }));

        // Quiet tick inside the TTL: still fading.
        assert_eq!(s.refresh(WITHOUT_R2, 5_000), RefreshStatus::Unchanged);
        assert_eq!(tombstone(&s), Some(Status::Removed { at: 1_000 }));

        // Past the TTL: gone.
        s.refresh(WITHOUT_R2, 12_000);
        assert_eq!(tombstone(&s), None);
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn no_data_keeps_previous_snapshot() {
        let mut s = session();
        s.refresh(BASE, 0);
        let before = s.nodes().to_vec();

        let status = s.refresh("% OSPF: No router process is running\n", 1_000);
        assert_eq!(status, RefreshStatus::NoData);
        assert_eq!(status.to_string(), "no data found");
        assert_eq!(s.nodes(), before.as_slice());
        assert_eq!(s.topology().map(|t| t.routers.len()), Some(3));
    }

    #[test]
    fn change_ids_keep_increasing_across_refreshes() {
        let mut s = session();
        s.refresh(BASE, 0);
        s.refresh(WITHOUT_R2, 1);
        s.refresh(BASE, 2);

        let ids: Vec<u64> = s.history().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn failed_fetch_does_not_stop_the_loop() {
        let source = Scripted {
            replies: vec![Some(BASE), None, Some(WITHOUT_R2)],
            next: 0,
        };
        let mut refresher = Refresher::new(source, Duration::ZERO).with_max_rounds(Some(3));
        let mut s = session();

        let mut seen = Vec::new();
        let rounds = refresher
            .run(&mut s, |_, status| {
                seen.push(status.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(rounds, 3);
        assert!(matches!(seen[0], RefreshStatus::Initial { .. }));
        assert_eq!(
            seen[1],
            RefreshStatus::Failed {
                error: "connection refused".to_string()
            }
        );
        assert_eq!(seen[2], RefreshStatus::Updated { changes: 2 });
    }

    #[test]
    fn stop_handle_ends_the_loop_after_the_current_tick() {
        let source = Scripted {
            replies: vec![Some(BASE); 10],
            next: 0,
        };
        let mut refresher = Refresher::new(source, Duration::from_secs(60));
        let stop = refresher.stop_handle();
        let mut s = session();

        let rounds = refresher
            .run(&mut s, |_, _| {
                stop.stop();
                Ok(())
            })
            .unwrap();

        assert_eq!(rounds, 1);
        assert!(stop.is_stopped());
    }

    #[test]
    fn callback_error_ends_the_loop() {
        let source = Scripted {
            replies: vec![Some(BASE); 3],
            next: 0,
        };
        let mut refresher = Refresher::new(source, Duration::ZERO);
        let mut s = session();

        let err = refresher
            .run(&mut s, |_, _| anyhow::bail!("disk full"))
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn demo_source_mutates_after_first_fetch() {
        let mut source = DemoSource::new(1);
        let first = source.fetch().unwrap();
        let again = DemoSource::new(1).fetch().unwrap();
        assert_eq!(first, again);

        let mut s = session();
        assert!(matches!(s.refresh(&first, 0), RefreshStatus::Initial { .. }));
        let second = source.fetch().unwrap();
        assert!(!s.refresh(&second, 1).is_failure());
    }
}
