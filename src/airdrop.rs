//! Payout scheduler
//!
//! Cron-triggered batch payout executor. Each run reads one reference
//! time from the ledger, recomputes eligibility for every tracked member
//! against it, and submits payouts in batches. Failures are isolated per
//! batch; nothing is recorded as paid, so the next run naturally retries
//! whatever the ledger still reports as owed.

use crate::rpc::LedgerClient;
use crate::store::MembershipStore;
use crate::submitter::PayoutSubmitter;
use alloy_primitives::{Address, U256};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};

/// Payout scheduler tuning knobs.
#[derive(Debug, Clone)]
pub struct AirdropConfig {
    /// Maximum members per payout transaction.
    pub batch_size: usize,
    /// Cron expression for run triggers (seconds field included).
    pub schedule: String,
    /// Wall-clock bound on one run; remaining work is abandoned after it.
    pub run_deadline: Duration,
}

impl Default for AirdropConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            // 01:00:00 every day.
            schedule: "0 0 1 * * *".to_string(),
            run_deadline: Duration::from_secs(3600),
        }
    }
}

/// Executes scheduled payout runs over the tracked membership.
pub struct AirdropService {
    rpc: Arc<dyn LedgerClient>,
    store: Arc<dyn MembershipStore>,
    submitter: Arc<dyn PayoutSubmitter>,
    contracts: Vec<Address>,
    config: AirdropConfig,
}

impl AirdropService {
    pub fn new(
        rpc: Arc<dyn LedgerClient>,
        store: Arc<dyn MembershipStore>,
        submitter: Arc<dyn PayoutSubmitter>,
        contracts: Vec<Address>,
        config: AirdropConfig,
    ) -> Self {
        Self {
            rpc,
            store,
            submitter,
            contracts,
            config,
        }
    }

    /// Register the cron job on a scheduler.
    pub async fn start(self: Arc<Self>, scheduler: &JobScheduler) -> anyhow::Result<()> {
        let schedule = self.config.schedule.clone();
        let deadline = self.config.run_deadline;
        let service = self;

        let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
            let service = service.clone();
            Box::pin(async move {
                if tokio::time::timeout(deadline, service.run_once()).await.is_err() {
                    warn!(
                        "Payout run exceeded its {:?} deadline, remaining batches abandoned until next run.",
                        deadline
                    );
                }
            })
        })
        .context("Failed to create payout job")?;

        scheduler.add(job).await.context("Failed to schedule payout job")?;
        info!("Scheduled payout job with cron '{}'", schedule);
        Ok(())
    }

    /// One payout run over all watched contracts.
    pub async fn run_once(&self) {
        match self.rpc.syncing().await {
            Ok(true) => {
                info!("Skipping payout run because node is still syncing.");
                return;
            }
            Ok(false) => {}
            // The original probe failure is advisory only; the run proceeds.
            Err(e) => warn!("Error when checking node sync status: {}", e),
        }

        // One reference time shared across every contract in this run so
        // all eligibility math uses the same basis.
        let reference_time = match self.rpc.latest_block_timestamp().await {
            Ok(timestamp) => timestamp,
            Err(e) => {
                warn!("Error getting last block time: {}. Abandoning run.", e);
                return;
            }
        };

        for contract_addr in &self.contracts {
            self.run_contract(*contract_addr, reference_time).await;
        }
    }

    /// Payout run for one contract: list members, filter eligible, batch,
    /// submit. Every failure past the member listing narrows scope (one
    /// member, one batch) instead of aborting the contract.
    async fn run_contract(&self, contract_addr: Address, reference_time: u64) {
        let members = match self.store.members(contract_addr) {
            Ok(members) => members,
            Err(e) => {
                warn!("Error listing members of {:?}: {}. Skip contract.", contract_addr, e);
                return;
            }
        };

        let eligible = self.eligible_members(contract_addr, &members, reference_time).await;
        if eligible.is_empty() {
            return;
        }

        debug!(
            "Starting payout for contract {:?} for {} members.",
            contract_addr,
            eligible.len()
        );
        for batch in eligible.chunks(self.config.batch_size) {
            match self.submitter.submit_payout(contract_addr, batch).await {
                Ok(tx_hash) => {
                    info!(
                        "Executed payout for {} members of {:?}, tx hash: {:?}",
                        batch.len(),
                        contract_addr,
                        tx_hash
                    );
                }
                Err(e) => {
                    warn!(
                        "Error when executing payout batch of {} for {:?}: {}",
                        batch.len(),
                        contract_addr,
                        e
                    );
                }
            }
        }
    }

    /// Members with a non-zero payout at the reference time. A failed
    /// computation excludes the member for this run only.
    async fn eligible_members(
        &self,
        contract_addr: Address,
        members: &[Address],
        reference_time: u64,
    ) -> Vec<Address> {
        let mut eligible = Vec::new();
        for member in members {
            match self
                .rpc
                .compute_payout(contract_addr, *member, reference_time)
                .await
            {
                Ok(amount) if amount != U256::ZERO => eligible.push(*member),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "Error calculating {:?} payouts in {:?}: {}",
                        member, contract_addr, e
                    );
                }
            }
        }
        eligible
    }
}
