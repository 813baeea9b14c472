//! PyDynDS CLI
//!
//! Runs one algorithm against a DynDCOP file until the DynDCOP is exhausted
//! or the wall-clock limit is hit.

use clap::Parser;
use pydynds_core::DynDcop;
use pydynds_sim::{AlgorithmRegistry, RunSummary, SimConfig, SimError, SimulationController};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// PyDynDS dynamic DCOP simulator
#[derive(Parser, Debug)]
#[command(name = "pydynds")]
#[command(about = "Simulate a DCOP algorithm on a dynamic DCOP", long_about = None)]
struct Args {
    /// Registered algorithm name (sample_algorithm, random_exchange)
    algorithm: String,

    /// Cycles a message takes to be delivered
    #[arg(short, long, default_value = "1")]
    message_delay: u64,

    /// Cycles a computation takes
    #[arg(short, long, default_value = "1")]
    computation_delay: u64,

    /// DynDCOP JSON file
    #[arg(short, long)]
    dyndcop: String,

    /// Wall-clock limit in seconds
    #[arg(long, default_value = "10", value_parser = parse_wall_clock)]
    max_secs: Duration,

    /// Seed for randomized algorithms
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output
    #[arg(long)]
    json: bool,

    /// Also write the JSON summary to this file
    #[arg(long)]
    export: Option<String>,
}

/// Parses a non-negative, finite number of seconds.
fn parse_wall_clock(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|err| format!("invalid number of seconds '{}': {}", value, err))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|err| format!("invalid wall-clock limit '{}': {}", value, err))
}

async fn run(args: &Args) -> Result<RunSummary, SimError> {
    let dyn_dcop = DynDcop::from_json_file(&args.dyndcop)?;
    info!("Loaded {} snapshots from {}", dyn_dcop.len(), args.dyndcop);

    let config = SimConfig::default().with_seed(args.seed);
    let mut controller = SimulationController::new(AlgorithmRegistry::with_builtin(), config);
    let mut summary =
        RunSummary::new(&args.algorithm, args.seed, args.message_delay, args.computation_delay);

    controller
        .setup(&args.algorithm, dyn_dcop, args.message_delay, args.computation_delay)
        .await?;
    summary.run_id = controller.run_id().map(|id| id.to_string());
    controller.start().await?;

    let began = Instant::now();
    let limit = args.max_secs;
    let mut last_cycle = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(20)).await;
        match controller.get_progress().await {
            Ok(progress) => {
                if progress.current_cycle != last_cycle {
                    debug!("cycle={} active={:?}", progress.current_cycle, progress.active_start_cycle);
                    last_cycle = progress.current_cycle;
                }
                summary.record_progress(&progress);
                if progress.finished {
                    break;
                }
            }
            Err(err) => warn!("Progress query failed: {}", err),
        }
        if began.elapsed() >= limit {
            warn!("Wall-clock limit of {:.1}s reached", limit.as_secs_f64());
            break;
        }
    }

    controller.pause().await?;
    match controller.get_current_stats().await {
        Ok(stats) => summary.record_stats(&stats),
        Err(err) => warn!("Final stats query failed: {}", err),
    }
    summary.algorithm_cycles = controller.algorithm_cycles();
    summary.elapsed_secs = began.elapsed().as_secs_f64();
    controller.stop().await?;

    Ok(summary)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let registry = AlgorithmRegistry::with_builtin();
    if !registry.contains(&args.algorithm) {
        eprintln!("Error: unknown algorithm '{}'", args.algorithm);
        eprintln!("Available algorithms: {}", registry.names().join(", "));
        std::process::exit(1);
    }

    if !args.json {
        info!("PyDynDS simulator v{}", env!("CARGO_PKG_VERSION"));
    }

    let summary = match run(&args).await {
        Ok(summary) => summary,
        Err(err) => {
            error!("Run failed: {}", err);
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.export {
        match summary.write_to_file(path) {
            Ok(()) => info!("Summary written to {}", path),
            Err(err) => error!("Failed to write summary: {:?}", err),
        }
    }

    if args.json {
        match summary.to_json() {
            Ok(json) => println!("{}", json),
            Err(err) => {
                error!("Failed to serialize summary: {}", err);
                std::process::exit(1);
            }
        }
    } else {
        info!(
            "{} finished={} cycle={} messages={} computations={} ({:.2}s)",
            summary.algorithm,
            summary.finished,
            summary.final_cycle,
            summary.total_messages,
            summary.total_computations,
            summary.elapsed_secs
        );
    }
}
