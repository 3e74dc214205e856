use std::io::Write;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver};

use halomatch::core::grid::Grid;
use halomatch::engine::builder::{build_footprints, ParticleSource};
use halomatch::io::cache::{self, CandidateTables};
use halomatch::io::catalog_file::load_catalog;
use halomatch::io::config::RunConfig;
use halomatch::io::report::{save_match_report, ReportInfo};
use halomatch::matcher::{Direction, MatchEvent};
use halomatch::HaloMatcher;

// --- CLI Definitions ---

#[derive(Parser, Debug)]
#[command(author, version, about = "Cross-identify halos between two simulation catalogs", long_about = None)]
struct Args {
    /// Path to the JSON run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Number of worker threads (overrides the config file)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Mass window multiplier (overrides the config file)
    #[arg(short, long)]
    mass_offset: Option<f64>,

    /// Maximum center displacement (overrides the config file)
    #[arg(short = 'd', long)]
    max_displacement: Option<f64>,
}

// --- Initialization Helpers ---

fn setup_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

fn load_run_config(args: &Args) -> Result<RunConfig> {
    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;

    if let Some(t) = args.threads {
        config.threads = t;
    }
    if let Some(m) = args.mass_offset {
        config.params.mass_offset = m;
    }
    if let Some(d) = args.max_displacement {
        config.params.max_displacement = d;
    }
    config.validate().context("Invalid command line override")?;
    Ok(config)
}

/// Drains matcher events and turns them into log lines.
fn spawn_reporter(rx: Receiver<MatchEvent>) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("Match-Reporter".to_string())
        .spawn(move || {
            let mut last_percent = None;
            for event in rx {
                match event {
                    MatchEvent::PassStarted { direction, total } => {
                        last_percent = None;
                        log::info!("{}: {} halos", describe(direction), total);
                    }
                    MatchEvent::Progress { direction, done, total } => {
                        let percent = done * 100 / total.max(1);
                        if last_percent.map_or(true, |p| percent >= p + 10) {
                            last_percent = Some(percent);
                            log::info!("{}: {}%", describe(direction), percent);
                        }
                    }
                    MatchEvent::PassFinished { direction } => {
                        log::info!("{}: [done]", describe(direction))
                    }
                    MatchEvent::CacheLoaded => log::info!("Candidate tables restored from cache"),
                    MatchEvent::Finished(stats) => log::debug!("Run statistics: {:?}", stats),
                }
            }
        })?;
    Ok(handle)
}

fn describe(direction: Direction) -> &'static str {
    match direction {
        Direction::PrimaryToSecondary => "Checking the 1st list of halos",
        Direction::SecondaryToPrimary => "Checking the 2nd list of halos",
        Direction::Combined => "Checking both lists of halos",
    }
}

// --- Main ---

fn main() -> Result<()> {
    // 1. Logging & Parsing
    setup_logging();
    let args = Args::parse();
    let config = load_run_config(&args)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .context("Failed to initialize worker pool")?;

    // 2. Load catalogs (sorted by mass on load)
    let (mut primary, primary_snap) = load_catalog(&config.primary_catalog)
        .context("Failed to load primary catalog")?
        .into_parts();
    let (mut secondary, secondary_snap) = load_catalog(&config.secondary_catalog)
        .context("Failed to load secondary catalog")?
        .into_parts();

    let matcher = HaloMatcher::new(config.params.clone());
    let (tx, rx) = unbounded();
    let reporter = spawn_reporter(rx)?;

    // 3. Candidate scan (or cache) and reciprocal resolution
    let outcome = match (&config.cache_path, config.load_cache) {
        (Some(path), true) => matcher
            .resolve_cached(path, &primary, &secondary, Some(tx))
            .with_context(|| format!("Failed to load match cache {}", path.display()))?,
        _ => {
            let grid = Grid::cubic(config.grid_resolution, *primary.box_size());
            build_footprints(&mut primary, &primary_snap, &grid)
                .context("Failed to build primary footprints")?;

            let secondary_source: &dyn ParticleSource = if config.internal_matching {
                &primary_snap
            } else {
                &secondary_snap
            };
            let grid = Grid::cubic(config.grid_resolution, *secondary.box_size());
            build_footprints(&mut secondary, secondary_source, &grid)
                .context("Failed to build secondary footprints")?;

            let outcome = matcher.run(&primary, &secondary, Some(tx));

            if let (Some(path), true) = (&config.cache_path, config.save_cache) {
                let tables = CandidateTables {
                    primary_best: outcome.primary_best.clone(),
                    secondary_best: outcome.secondary_best.clone(),
                };
                cache::save_matches(&tables, path)
                    .with_context(|| format!("Failed to save match cache {}", path.display()))?;
            }
            outcome
        }
    };
    if reporter.join().is_err() {
        log::warn!("Progress reporter thread panicked");
    }

    // 4. Results
    match &config.ascii_output_path {
        Some(path) => {
            let info = ReportInfo {
                primary_input: config.primary_catalog.clone(),
                secondary_input: config.secondary_catalog.clone(),
                grid_resolution: config.grid_resolution,
                params: config.params.clone(),
            };
            save_match_report(path, &info, &primary, &secondary, &outcome.table)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
        }
        None => {
            println!(
                "{} of {} primary halos matched ({} unmatched)",
                outcome.stats.matched,
                outcome.stats.num_primary,
                outcome.table.unmatched().len()
            );
        }
    }

    Ok(())
}
