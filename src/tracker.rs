//! Membership tracker
//!
//! Event-bus subscriber that turns block-completed events into durable
//! membership rows. For each transaction associated with a watched
//! contract it fetches the receipt, decodes that contract's add/remove
//! logs in emission order, and applies them to the membership table.
//! Within one receipt the later log wins. Reverted transactions are
//! skipped outright.

use crate::contract::{self, MembershipEvent};
use crate::error::Result;
use crate::events::{ScanEvent, Subscriber};
use crate::rpc::LedgerClient;
use crate::store::MembershipStore;
use crate::types::Receipt;
use alloy_primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies decoded membership events to the membership table.
pub struct MembershipTracker {
    rpc: Arc<dyn LedgerClient>,
    store: Arc<dyn MembershipStore>,
}

impl MembershipTracker {
    pub fn new(rpc: Arc<dyn LedgerClient>, store: Arc<dyn MembershipStore>) -> Self {
        Self { rpc, store }
    }

    /// Apply one receipt's membership events in log order.
    ///
    /// Both directions are idempotent: re-adding an existing member and
    /// removing an absent one are no-ops.
    fn apply_receipt(&self, contract_addr: Address, receipt: &Receipt) -> Result<()> {
        for event in contract::decode_membership_events(contract_addr, receipt) {
            match event {
                MembershipEvent::Added(member) => {
                    info!("Saving member {:?} of contract {:?}", member, contract_addr);
                    self.store.upsert_member(contract_addr, member)?;
                }
                MembershipEvent::Removed(member) => {
                    info!("Removing member {:?} of contract {:?}", member, contract_addr);
                    self.store.remove_member(contract_addr, member)?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for MembershipTracker {
    fn name(&self) -> &'static str {
        "membership-tracker"
    }

    async fn handle(&self, event: &ScanEvent) -> Result<()> {
        let completed = match event {
            ScanEvent::BlockCompleted(completed) => completed,
            _ => return Ok(()),
        };

        for (contract_addr, txs) in &completed.transactions_by_address {
            for tx in txs {
                debug!(
                    "Found transaction {:?} touching contract {:?} in block {}",
                    tx.hash, contract_addr, completed.block_number
                );
                let receipt = match self.rpc.fetch_receipt(tx.hash).await {
                    Ok(Some(receipt)) => receipt,
                    Ok(None) => {
                        warn!("Empty receipt for transaction {:?}. Skip it.", tx.hash);
                        continue;
                    }
                    Err(e) => {
                        warn!("Error while getting receipt for {:?}: {}. Skip it.", tx.hash, e);
                        continue;
                    }
                };
                if !receipt.is_success() {
                    debug!("Transaction {:?} reverted. Skip its logs.", tx.hash);
                    continue;
                }
                self.apply_receipt(*contract_addr, &receipt)?;
            }
        }
        Ok(())
    }
}
