//! Event extractor
//!
//! Derives the set of addresses touched by each transaction in a block
//! (sender, recipient, or created contract, the latter resolved through
//! the receipt when the node does not report it inline), matches them
//! against the watched contract set, and publishes one transaction event
//! per watched association plus exactly one block-completed event per
//! block.

use crate::events::{BlockCompletedEvent, EventBus, ScanEvent, WatchedTransactionEvent};
use crate::rpc::LedgerClient;
use crate::types::{Block, Transaction};
use alloy_primitives::Address;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Groups block transactions by watched address and feeds the event bus.
pub struct EventExtractor {
    rpc: Arc<dyn LedgerClient>,
    watched: HashSet<Address>,
}

impl EventExtractor {
    pub fn new(rpc: Arc<dyn LedgerClient>, watched: &[Address]) -> Self {
        Self {
            rpc,
            watched: watched.iter().copied().collect(),
        }
    }

    /// Process one block: publish a transaction event for every watched
    /// association and a single block-completed event at the end.
    ///
    /// Receipt lookup failures only cost the affected transaction its
    /// created-address association; the rest of the block still goes
    /// through.
    pub async fn process_block(&self, block: &Block, bus: &EventBus) {
        let mut by_address: HashMap<Address, Vec<Transaction>> = HashMap::new();

        for tx in &block.transactions {
            for address in self.touched_addresses(tx).await {
                if !self.watched.contains(&address) {
                    continue;
                }
                by_address.entry(address).or_default().push(tx.clone());
                bus.publish(&ScanEvent::Transaction(WatchedTransactionEvent {
                    block_number: block.number,
                    watched_address: address,
                    tx: tx.clone(),
                }))
                .await;
            }
        }

        bus.publish(&ScanEvent::BlockCompleted(BlockCompletedEvent {
            block_number: block.number,
            block_hash: block.hash,
            transactions_by_address: by_address,
        }))
        .await;
    }

    /// All distinct addresses touched by a transaction, resolving the
    /// created contract address via the receipt when needed.
    async fn touched_addresses(&self, tx: &Transaction) -> Vec<Address> {
        let (mut touched, needs_receipt) = inline_touched_addresses(tx);
        if needs_receipt {
            match self.rpc.fetch_receipt(tx.hash).await {
                Ok(Some(receipt)) => match receipt.contract_address {
                    Some(created) => {
                        if !touched.contains(&created) {
                            touched.push(created);
                        }
                    }
                    None => {
                        warn!(
                            "Receipt for creation tx {:?} reports no contract address. Skip it.",
                            tx.hash
                        );
                    }
                },
                Ok(None) => {
                    warn!("Empty receipt for transaction {:?}. Skip created-address association.", tx.hash);
                }
                Err(e) => {
                    tracing::error!("Error on getting transaction {:?} receipt: {}", tx.hash, e);
                }
            }
        }
        touched
    }
}

/// Touched addresses derivable without a receipt, plus whether a receipt
/// lookup is still required (creation tx with no inline created address).
fn inline_touched_addresses(tx: &Transaction) -> (Vec<Address>, bool) {
    let mut touched = Vec::new();
    match tx.from {
        Some(from) => touched.push(from),
        None => warn!("Empty from field for transaction {:?}. Skip it.", tx.hash),
    }

    let mut needs_receipt = false;
    if tx.is_contract_creation() {
        if let Some(creates) = tx.creates {
            if !touched.contains(&creates) {
                touched.push(creates);
            }
        } else {
            needs_receipt = true;
        }
    } else if let Some(to) = tx.to {
        if !touched.contains(&to) {
            touched.push(to);
        }
    }
    (touched, needs_receipt)
}
