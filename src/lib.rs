//! dripscan - ledger membership scanner and batched payout executor
//!
//! Watches an append-only block ledger for transactions touching a fixed
//! set of contract addresses, derives membership events from their
//! receipts, maintains a durable membership table, and periodically
//! executes batched payout transactions for eligible members.

pub mod airdrop;
pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod extractor;
pub mod keys;
pub mod rpc;
pub mod scanner;
pub mod store;
pub mod submitter;
pub mod tracker;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export the main types for convenience
pub use error::{Error, Result};
pub use rpc::{LedgerClient, RpcClient};
pub use scanner::{Scanner, ScannerConfig};
pub use store::{CheckpointStore, MembershipStore, RocksLedgerStore};
