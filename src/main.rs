use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use env_logger::{Builder, Env};
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::time::Duration;

mod config;
mod demo;
mod diff;
mod graph;
mod layout;
mod lsa;
mod model;
mod refresh;
mod render;
mod topology;

use crate::config::Config;
use crate::layout::LayoutAlgorithm;
use crate::refresh::{DemoSource, FileSource, LsaSource, RefreshStatus, Refresher, Session};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "ospf-topo")]
#[command(about = "OSPF LSA database parser, layout engine and topology differ", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one "show ip ospf database" dump and write a positioned graph.
    Report {
        #[arg(long)]
        lsa: String,

        #[arg(long, value_enum)]
        algorithm: Option<LayoutAlgorithm>,

        #[arg(short = 'o', long)]
        out: String,
    },
    /// Compare two dumps and print what changed.
    Diff {
        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,

        /// Also write the annotated report for the new dump.
        #[arg(short = 'o', long)]
        out: Option<String>,
    },
    /// Refresh periodically and rewrite the report after every tick.
    Watch {
        #[arg(long, conflicts_with = "demo", required_unless_present = "demo")]
        lsa: Option<String>,

        /// Use the built-in mutating demo network instead of a file.
        #[arg(long)]
        demo: bool,

        #[arg(long)]
        seed: Option<u64>,

        /// Seconds between ticks.
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many ticks.
        #[arg(long)]
        rounds: Option<usize>,

        #[arg(short = 'o', long)]
        out: String,
    },
    /// Write successive demo network dumps into a directory.
    Demo {
        #[arg(long, default_value_t = 1)]
        seed: u64,

        #[arg(long, default_value_t = 5)]
        rounds: usize,

        #[arg(short = 'o', long)]
        out: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.cmd {
        Commands::Report { lsa, algorithm, out } => {
            if let Some(algorithm) = algorithm {
                config.layout.algorithm = algorithm;
            }
            let text = FileSource::new(&lsa).fetch()?;

            let mut session = Session::new(config.layout, config.refresh.status_ttl_ms())?;
            let status = session.refresh(&text, now_ms());
            if status == RefreshStatus::NoData {
                bail!("no data found in {}", lsa);
            }

            let data = model::build_report_data(&lsa, &session, &status, chrono::Utc::now())?;
            render::write_report(&data, &out)?;
            println!("Wrote {}", out);
        }
        Commands::Diff { old, new, out } => {
            let mut session = Session::new(config.layout, config.refresh.status_ttl_ms())?;
            let mut status = RefreshStatus::NoData;
            for path in [&old, &new] {
                let text = FileSource::new(path).fetch()?;
                status = session.refresh(&text, now_ms());
                if status == RefreshStatus::NoData {
                    bail!("no data found in {}", path);
                }
            }

            if session.latest_changes().is_empty() {
                println!("No changes");
            }
            for c in session.latest_changes() {
                println!("[{}] {}", c.id, c.description);
            }

            if let Some(out) = out {
                let data = model::build_report_data(&new, &session, &status, chrono::Utc::now())?;
                render::write_report(&data, &out)?;
                println!("Wrote {}", out);
            }
        }
        Commands::Watch {
            lsa,
            demo,
            seed,
            interval,
            rounds,
            out,
        } => {
            let interval = Duration::from_secs(interval.unwrap_or(config.refresh.interval_secs));
            let seed = seed.unwrap_or(config.layout.seed);
            let session = Session::new(config.layout, config.refresh.status_ttl_ms())?;
            match (lsa, demo) {
                (Some(path), false) => {
                    watch(FileSource::new(path), session, interval, rounds, &out)?;
                }
                (None, true) => {
                    watch(DemoSource::new(seed), session, interval, rounds, &out)?;
                }
                _ => bail!("watch needs exactly one of --lsa or --demo"),
            }
        }
        Commands::Demo { seed, rounds, out } => {
            let dir = Path::new(&out);
            fs::create_dir_all(dir).with_context(|| format!("create directory {}", out))?;

            let mut source = DemoSource::new(seed);
            for round in 0..rounds.max(1) {
                let path = dir.join(format!("lsa-{:03}.txt", round));
                fs::write(&path, source.fetch()?)
                    .with_context(|| format!("write {}", path.display()))?;
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

fn watch<S: LsaSource>(
    source: S,
    mut session: Session,
    interval: Duration,
    rounds: Option<usize>,
    out: &str,
) -> Result<()> {
    let name = source.describe();
    let mut refresher = Refresher::new(source, interval).with_max_rounds(rounds);

    let stop = refresher.stop_handle();
    ctrlc::set_handler(move || {
        info!("interrupted, stopping after the current tick");
        stop.stop();
    })
    .context("install Ctrl-C handler")?;

    let ticks = refresher.run(&mut session, |session, status| {
        publish_tick(&name, session, status, out);
        Ok(())
    })?;

    info!("stopped after {} ticks", ticks);
    Ok(())
}

/// Print the tick's changes and rewrite the report. A failed write is logged
/// and the next tick tries again.
fn publish_tick(name: &str, session: &Session, status: &RefreshStatus, out: &str) -> bool {
    if session.topology().is_none() {
        // Nothing published yet; keep waiting for a usable dump.
        return false;
    }
    if let RefreshStatus::Updated { .. } = status {
        for c in session.latest_changes() {
            println!("[{}] {}", c.id, c.description);
        }
    }
    let written = model::build_report_data(name, session, status, chrono::Utc::now())
        .and_then(|data| render::write_report(&data, out));
    match written {
        Ok(()) => {
            println!("Wrote {} ({})", out, status);
            true
        }
        Err(e) => {
            warn!("report not written this tick: {:#}", e);
            false
        }
    }
}
