//! ATM Ledger Simulator
//!
//! Drives the ledger from many threads at once and checks that the end state
//! matches a serial history.

use std::collections::BTreeMap;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod controller;
mod metrics;
mod scenario;

use atm_ledger::LockGranularity;
use controller::SimulationController;
use scenario::Scenario;

/// ATM Ledger Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Concurrent load simulator for the ATM ledger")]
struct Args {
    /// Scenario to run (deposit-storm, mixed, drain)
    #[arg(short, long, default_value = "mixed")]
    scenario: String,

    /// Number of concurrent workers
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Operations issued by each worker
    #[arg(short, long, default_value = "1000")]
    operations: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Ledger lock granularity (global, per-account)
    #[arg(long, default_value = "global")]
    locking: LockGranularity,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Per-call ledger events would drown the report.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atm_ledger=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting ATM Ledger Simulator");
    info!("Workers: {}", args.workers);
    info!("Operations per worker: {}", args.operations);

    let scenario = Scenario::load(&args.scenario)?;
    let mut controller =
        SimulationController::new(args.locking, args.workers, args.operations, args.seed)?;

    let report = controller.run_scenario(scenario).await?;
    let metrics = &report.metrics;

    info!("Simulation complete");
    info!("Total operations: {}", metrics.total_operations);
    info!("Successful: {}", metrics.successful_operations);
    info!("Rejected: {}", metrics.rejected_operations);
    for (code, count) in &metrics.rejections {
        info!("  {}: {}", code, count);
    }
    info!("Success rate: {:.1}%", metrics.success_rate() * 100.0);
    info!("Throughput: {:.0} ops/s", metrics.throughput(report.elapsed));
    info!("Average latency: {}µs", metrics.average_latency_us());
    info!("p99 latency: {}µs", metrics.p99_latency_us());

    let balances: BTreeMap<_, _> = controller.balances().into_iter().collect();
    for (account, balance) in balances {
        info!("Final balance {}: {}", account, balance);
    }

    Ok(())
}
