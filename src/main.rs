//! Ledger membership scanner and payout daemon
//!
//! Scans blocks for transactions touching the watched deposit-plan
//! contracts, keeps the membership table current, and runs the
//! scheduled batched payout job.

use anyhow::{Context, Result};
use clap::Parser;
use dripscan::airdrop::{AirdropConfig, AirdropService};
use dripscan::config::{load_contracts, parse_address};
use dripscan::events::EventBus;
use dripscan::extractor::EventExtractor;
use dripscan::rpc::RpcClient;
use dripscan::scanner::{Scanner, ScannerConfig};
use dripscan::store::RocksLedgerStore;
use dripscan::submitter::NodeSigner;
use dripscan::tracker::MembershipTracker;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_cron_scheduler::JobScheduler;
use tracing::{info, Level};

/// Ledger membership scanner and payout daemon
#[derive(Parser)]
#[command(name = "dripscand")]
#[command(about = "Scan ledger blocks for membership events and run scheduled batch payouts")]
struct Args {
    /// RPC endpoint URL
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Per-call RPC timeout in seconds
    #[arg(long, default_value_t = 30)]
    rpc_timeout_secs: u64,

    /// Path to watched contracts file (one address per line)
    #[arg(short, long, default_value = "contracts.txt")]
    contracts: PathBuf,

    /// Path to RocksDB database directory
    #[arg(short, long, default_value = "./scan_db")]
    db_path: PathBuf,

    /// Blocks to stay behind the chain tip
    #[arg(long, default_value_t = 5)]
    confirmation_depth: u64,

    /// Polling interval in milliseconds once caught up
    #[arg(long, default_value_t = 5000)]
    poll_interval_ms: u64,

    /// Fixed start height overriding the persisted checkpoint
    #[arg(long)]
    start_block: Option<u64>,

    /// Maximum members per payout transaction
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Cron expression for payout runs (seconds field included)
    #[arg(long, default_value = "0 0 1 * * *")]
    payout_schedule: String,

    /// Wall-clock bound on one payout run, in seconds
    #[arg(long, default_value_t = 3600)]
    payout_deadline_secs: u64,

    /// Node-unlocked account the payout transactions are sent from
    #[arg(long)]
    payout_sender: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    info!("Starting ledger membership scanner");
    info!("RPC URL: {}", args.rpc_url);
    info!("Contracts: {:?}", args.contracts);
    info!("Database: {:?}", args.db_path);

    let contracts = load_contracts(&args.contracts).context("Failed to load contracts file")?;
    info!("Watching {} contract addresses", contracts.len());

    let payout_sender =
        parse_address(&args.payout_sender).context("Invalid payout sender address")?;

    let rpc = Arc::new(
        RpcClient::new(
            args.rpc_url,
            Duration::from_secs(args.rpc_timeout_secs),
        )
        .context("Failed to create RPC client")?,
    );

    let store = Arc::new(
        RocksLedgerStore::open(&args.db_path)
            .with_context(|| format!("Failed to open database at {:?}", args.db_path))?,
    );

    // The tracker is the only membership writer; it subscribes to the
    // scanner's block-completed events.
    let mut bus = EventBus::new();
    bus.subscribe(Arc::new(MembershipTracker::new(rpc.clone(), store.clone())));

    let extractor = EventExtractor::new(rpc.clone(), &contracts);
    let scanner_config = ScannerConfig {
        confirmation_depth: args.confirmation_depth,
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        start_height: args.start_block,
    };
    let mut scanner = Scanner::initialize(rpc.clone(), store.clone(), extractor, bus, scanner_config)
        .await
        .context("Failed to initialize scanner")?;

    // Payout scheduler, independent of the scanning loop.
    let submitter = Arc::new(NodeSigner::new(rpc.clone(), payout_sender));
    let airdrop = Arc::new(AirdropService::new(
        rpc,
        store,
        submitter,
        contracts,
        AirdropConfig {
            batch_size: args.batch_size,
            schedule: args.payout_schedule,
            run_deadline: Duration::from_secs(args.payout_deadline_secs),
        },
    ));
    let mut scheduler = JobScheduler::new()
        .await
        .context("Failed to create job scheduler")?;
    airdrop.start(&scheduler).await?;
    scheduler.start().await.context("Failed to start job scheduler")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut scanner_task = tokio::spawn(async move { scanner.run(shutdown_rx).await });

    // Handle Ctrl+C gracefully: the scanner stops between iterations,
    // never mid-checkpoint.
    tokio::select! {
        result = &mut scanner_task => {
            result.context("Scanner task failed")??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown_tx.send(true);
            scanner_task.await.context("Scanner task failed")??;
        }
    }

    scheduler
        .shutdown()
        .await
        .context("Failed to shut down job scheduler")?;

    info!("Scanner stopped");
    Ok(())
}
