//! basilisk-sim - Simulated Dashboard Engine
//!
//! Usage:
//!   basilisk-sim run --duration 30s --views dashboard,brain
//!   basilisk-sim hunt --count 10 --seed 7
//!   basilisk-sim allocate --hunting 50
//!   basilisk-sim live --duration 10s
//!   basilisk-sim views
//!   basilisk-sim routes

use basilisk_sim::api::{create_shared_engine, lock, print_api_docs};
use basilisk_sim::driver::{DriverConfig, RealtimeDriver};
use basilisk_sim::{
    BasiliskEngine, EngineConfig, EngineError, EngineEvent, PartialAllocation, Result, Snapshot,
    View,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "basilisk-sim")]
#[command(about = "Simulated state-evolution engine for the Basilisk dashboard")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine on virtual time and print what happens
    Run {
        /// Simulated duration (e.g., 500ms, 30s, 5m)
        #[arg(short, long, default_value = "30s")]
        duration: String,

        /// Virtual milliseconds per advance
        #[arg(long, default_value = "100")]
        tick_ms: u64,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,

        /// Views to mount (comma-separated)
        #[arg(long, default_value = "loading,dashboard,brain,scanner")]
        views: String,

        /// Start a scanner sweep right away
        #[arg(long)]
        scan: bool,
    },

    /// Run a series of hunts
    Hunt {
        #[arg(short = 'n', long, default_value = "5")]
        count: u32,

        #[arg(long)]
        seed: Option<u64>,

        /// Virtual time between hunts, lets energy regenerate
        #[arg(long, default_value = "0")]
        interval_ms: u64,
    },

    /// Rebalance the default resource split
    Allocate {
        #[arg(long)]
        hunting: Option<f64>,

        #[arg(long)]
        defense: Option<f64>,

        #[arg(long)]
        evolution: Option<f64>,
    },

    /// Drive the engine on wall-clock time
    Live {
        #[arg(short, long, default_value = "10s")]
        duration: String,

        /// Wall-clock milliseconds between advances
        #[arg(long, default_value = "100")]
        resolution_ms: u64,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// List views and the periodic tasks they register
    Views,

    /// List the control API actions
    Routes,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            duration,
            tick_ms,
            seed,
            config,
            format,
            views,
            scan,
        } => run_simulation(&duration, tick_ms, seed, config, format, &views, scan),
        Commands::Hunt {
            count,
            seed,
            interval_ms,
        } => run_hunts(count, seed, interval_ms),
        Commands::Allocate {
            hunting,
            defense,
            evolution,
        } => run_allocate(PartialAllocation {
            hunting,
            defense,
            evolution,
        }),
        Commands::Live {
            duration,
            resolution_ms,
            seed,
        } => run_live(&duration, resolution_ms, seed),
        Commands::Views => {
            run_views();
            Ok(())
        }
        Commands::Routes => {
            print_api_docs();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<PathBuf>, seed: Option<u64>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(config)
}

fn parse_views(raw: &str) -> Result<Vec<View>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn run_simulation(
    duration: &str,
    tick_ms: u64,
    seed: Option<u64>,
    config: Option<PathBuf>,
    format: OutputFormat,
    views: &str,
    scan: bool,
) -> Result<()> {
    let duration_ms = parse_duration(duration)?;
    let tick_ms = tick_ms.max(1);
    let views = parse_views(views)?;

    let mut engine = BasiliskEngine::new(load_config(config, seed)?)?;
    engine.start();
    for view in &views {
        engine.mount_view(*view)?;
    }
    if scan {
        engine.toggle_scan()?;
    }

    info!(duration_ms, tick_ms, views = views.len(), "Simulation started");

    while engine.now_ms() < duration_ms {
        let step = tick_ms.min(duration_ms - engine.now_ms());
        let summary = engine.advance(step);
        for event in &summary.events {
            match format {
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "time_ms": summary.time_ms, "event": event }))?
                }
                OutputFormat::Pretty => println!("[{:>8}ms] {}", summary.time_ms, describe(event)),
            }
        }
    }

    let snapshot = engine.snapshot();
    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Pretty => print_summary(&snapshot, engine.stats().firings),
    }
    Ok(())
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::LoadingComplete => "Loading complete".to_string(),
        EngineEvent::ScanComplete { discovery } => format!(
            "Scan found {} [{}] {}",
            discovery.kind.as_str(),
            discovery.severity.as_str(),
            discovery.title
        ),
        EngineEvent::CapabilityEvolved { name, level, capped } => {
            let suffix = if *capped { " (max)" } else { "" };
            format!("{} -> level {}{}", name, level, suffix)
        }
    }
}

fn print_summary(snapshot: &Snapshot, firings: u64) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Simulation Complete                       ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║ Virtual time: {:>44}ms ║", snapshot.time_ms);
    println!("║ Task firings: {:>46} ║", firings);
    println!("║ Energy: {:>52.1} ║", snapshot.energy);
    println!("║ Discoveries: {:>47} ║", snapshot.discoveries.len());
    println!("╠══════════════════════════════════════════════════════════════╣");
    for metric in &snapshot.metrics {
        println!("║ {:<20} {:>39.1} ║", metric.label, metric.value);
    }
    println!("╠══════════════════════════════════════════════════════════════╣");
    for capability in &snapshot.capabilities {
        println!(
            "║ {:<20} level {:>2}/{:<2} {:>28.1}% ║",
            capability.name, capability.current_level, capability.max_level, capability.progress
        );
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
}

fn run_hunts(count: u32, seed: Option<u64>, interval_ms: u64) -> Result<()> {
    let mut engine = BasiliskEngine::new(load_config(None, seed)?)?;
    engine.start();
    engine.mount_view(View::Brain)?;

    for _ in 0..count {
        let outcome = engine.start_hunt()?;
        print_json(&outcome)?;
        engine.advance(interval_ms);
    }

    let stats = engine.stats();
    info!(
        attempts = stats.hunt_attempts,
        performed = engine.dashboard().hunter.hunts(),
        discoveries = stats.discoveries,
        "Hunts finished"
    );
    Ok(())
}

fn run_allocate(partial: PartialAllocation) -> Result<()> {
    let mut engine = BasiliskEngine::new(EngineConfig::default())?;
    let allocation = engine.set_resource_allocation(partial)?;
    print_json(&allocation)
}

fn run_live(duration: &str, resolution_ms: u64, seed: Option<u64>) -> Result<()> {
    let duration_ms = parse_duration(duration)?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        let engine = create_shared_engine(load_config(None, seed)?)?;
        {
            let mut engine = lock(&engine);
            engine.start();
            for view in View::ALL {
                engine.mount_view(view)?;
            }
        }

        let driver = RealtimeDriver::spawn(engine, DriverConfig { resolution_ms });
        let mut snapshots = driver.subscribe();
        let deadline = tokio::time::sleep(Duration::from_millis(duration_ms));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    println!(
                        "[{:>8}ms] {:<34} energy {:>5.1}  {}",
                        snapshot.time_ms,
                        snapshot.loading.step_label,
                        snapshot.energy,
                        snapshot.terminal_line
                    );
                }
            }
        }

        let stats = driver.shutdown().await;
        info!(
            ticks = stats.ticks.load(std::sync::atomic::Ordering::Relaxed),
            "Live run finished"
        );
        Ok::<(), EngineError>(())
    })
}

fn run_views() {
    let config = EngineConfig::default();
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Dashboard Views                           ║");
    println!("╠══════════════════════════════════════════════════════════════╣");

    for view in View::ALL {
        for spec in view.tasks(&config.cadence) {
            println!(
                "║ {:10} {:28} every {:>12}ms ║",
                view.as_str(),
                spec.name,
                spec.period_ms
            );
        }
    }

    println!("╚══════════════════════════════════════════════════════════════╝");
}

/// Parse `500ms`, `30s`, `5m`, `1h` or a bare number of seconds into milliseconds
fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim();
    let invalid = || EngineError::Config(format!("invalid duration '{}'", s));

    let (digits, scale) = if let Some(v) = s.strip_suffix("ms") {
        (v, 1)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3_600_000)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60_000)
    } else if let Some(v) = s.strip_suffix('s') {
        (v, 1_000)
    } else {
        (s, 1_000)
    };

    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    value.checked_mul(scale).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), 500);
        assert_eq!(parse_duration("30s").unwrap(), 30_000);
        assert_eq!(parse_duration("5m").unwrap(), 300_000);
        assert_eq!(parse_duration("1h").unwrap(), 3_600_000);
        assert_eq!(parse_duration("12").unwrap(), 12_000);
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_views() {
        assert_eq!(
            parse_views("dashboard, brain").unwrap(),
            vec![View::Dashboard, View::Brain]
        );
        assert!(parse_views("dashboard,wallet").is_err());
    }
}
