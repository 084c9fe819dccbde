//! Block scanner loop
//!
//! Polls the ledger tip and advances through blocks one at a time,
//! staying `confirmation_depth` behind the observed tip so reorganized
//! blocks near the tip are never dispatched. The checkpoint is written
//! immediately after a block is fetched and before its events are
//! dispatched, so a crash mid-dispatch skips that block on restart
//! rather than reprocessing it.

use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::extractor::EventExtractor;
use crate::rpc::LedgerClient;
use crate::store::CheckpointStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Log a note after this long without a new block.
const INFO_INTERVAL: Duration = Duration::from_secs(60);
/// Escalate to a warning after this long without a new block.
const WARN_INTERVAL: Duration = Duration::from_secs(120);

/// Scanner tuning knobs.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Blocks to stay behind the observed tip.
    pub confirmation_depth: u64,
    /// Sleep between polls once caught up.
    pub poll_interval: Duration,
    /// Fixed start height overriding any persisted checkpoint.
    pub start_height: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            confirmation_depth: 5,
            poll_interval: Duration::from_secs(5),
            start_height: None,
        }
    }
}

/// The polling/catch-up state machine.
pub struct Scanner {
    rpc: Arc<dyn LedgerClient>,
    checkpoints: Arc<dyn CheckpointStore>,
    extractor: EventExtractor,
    bus: EventBus,
    config: ScannerConfig,
    last_processed: u64,
    observed_height: u64,
    last_progress: Instant,
}

impl Scanner {
    /// Create and initialize a scanner.
    ///
    /// Resolves the resume point: a configured start height overrides the
    /// persisted checkpoint; with neither, the scanner bootstraps to
    /// `current height - confirmation depth` and persists that as the
    /// checkpoint.
    pub async fn initialize(
        rpc: Arc<dyn LedgerClient>,
        checkpoints: Arc<dyn CheckpointStore>,
        extractor: EventExtractor,
        bus: EventBus,
        config: ScannerConfig,
    ) -> Result<Self> {
        if let Some(start) = config.start_height {
            info!("Overriding persisted checkpoint with configured start height {}", start);
            checkpoints.set_checkpoint(start)?;
        }

        let syncing = rpc.syncing().await?;
        let observed_height = rpc.current_height().await?;

        let last_processed = match checkpoints.checkpoint()? {
            Some(height) => height,
            None => {
                let bootstrap = observed_height.saturating_sub(config.confirmation_depth);
                checkpoints.set_checkpoint(bootstrap)?;
                bootstrap
            }
        };

        info!(
            "Node {}, latest block is {} but next is {}.",
            if syncing { "syncing" } else { "synced" },
            observed_height,
            last_processed + 1
        );

        Ok(Self {
            rpc,
            checkpoints,
            extractor,
            bus,
            config,
            last_processed,
            observed_height,
            last_progress: Instant::now(),
        })
    }

    /// Run the scanning loop until the shutdown flag flips.
    ///
    /// Connectivity and decode failures are logged and retried after the
    /// polling interval; only a checkpoint persistence failure ends the
    /// loop with an error. The shutdown flag is checked between
    /// iterations only, never between checkpoint write and dispatch.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("Starting scanner loop");
        loop {
            if *shutdown.borrow() {
                info!("Scanner received shutdown signal, stopping");
                return Ok(());
            }

            match self.iterate().await {
                // Catch-up fast path: a block was processed, loop again
                // without waiting.
                Ok(true) => continue,
                Ok(false) => {
                    let idle = self.last_progress.elapsed();
                    if idle > WARN_INTERVAL {
                        warn!("There is no block from {:?}!", idle);
                    } else if idle > INFO_INTERVAL {
                        info!("There is no block from {:?}.", idle);
                    }
                    debug!("All blocks processed, wait new one.");
                }
                Err(e @ Error::Persistence(_)) => {
                    error!("Checkpoint persistence failed, stopping scanner: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Scanner iteration failed at height {}: {}. Continue.", self.last_processed + 1, e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    /// One scanning iteration.
    ///
    /// Returns Ok(true) if a block was processed (caller should loop
    /// immediately), Ok(false) if caught up. Any error leaves the
    /// checkpoint untouched so the same height is retried.
    async fn iterate(&mut self) -> Result<bool> {
        self.observed_height = self.rpc.current_height().await?;

        if self.observed_height.saturating_sub(self.last_processed) <= self.config.confirmation_depth {
            return Ok(false);
        }

        let next = self.last_processed + 1;
        let block = self
            .rpc
            .fetch_block(next)
            .await?
            .ok_or_else(|| Error::connectivity(format!("node returned no block at height {}", next)))?;

        debug!("New block received {} ({:?})", block.number, block.hash);

        // Write-ahead: the checkpoint is durable before dispatch, so a
        // crash between the two skips this block instead of replaying it.
        self.checkpoints.set_checkpoint(next)?;
        self.last_processed = next;
        self.last_progress = Instant::now();

        self.extractor.process_block(&block, &self.bus).await;
        Ok(true)
    }

    /// Height of the last fully processed block.
    pub fn last_processed(&self) -> u64 {
        self.last_processed
    }
}
