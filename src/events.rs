//! In-process event bus
//!
//! Synchronous publish/subscribe fan-out from the scanner/extractor to
//! interested subscribers. Delivery happens in registration order; a
//! failing handler is logged and does not prevent delivery to later
//! subscribers or fail the scanner's iteration. No queuing, no
//! persistence.

use crate::error::Result;
use crate::types::Transaction;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Event raised when a transaction touches a watched contract address.
#[derive(Debug, Clone)]
pub struct WatchedTransactionEvent {
    pub block_number: u64,
    pub watched_address: Address,
    pub tx: Transaction,
}

/// Event raised exactly once per processed block, whether or not any
/// watched address matched. Carries the watched-address grouping so
/// subscribers don't re-derive touched addresses.
#[derive(Debug, Clone)]
pub struct BlockCompletedEvent {
    pub block_number: u64,
    pub block_hash: B256,
    pub transactions_by_address: HashMap<Address, Vec<Transaction>>,
}

/// Events published by the scanning pipeline.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Transaction(WatchedTransactionEvent),
    BlockCompleted(BlockCompletedEvent),
}

/// Event bus subscriber.
///
/// A subscriber receives every published event and decides for itself
/// which kinds it reacts to.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Handle one event.
    async fn handle(&self, event: &ScanEvent) -> Result<()>;
}

/// In-process publish/subscribe registry.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Delivery order follows registration order.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Deliver an event to every subscriber in registration order.
    ///
    /// Handler failures are logged here and swallowed so one subscriber
    /// cannot break delivery to the rest.
    pub async fn publish(&self, event: &ScanEvent) {
        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.handle(event).await {
                tracing::error!("Subscriber '{}' failed to handle event: {}", subscriber.name(), e);
            }
        }
    }
}
