//! Shared test fixtures
//!
//! A scripted in-memory ledger plus block/receipt builders, used by the
//! scanner, extractor, tracker, and scheduler tests.

use crate::contract;
use crate::error::{Error, Result};
use crate::rpc::LedgerClient;
use crate::types::{Block, Log, Receipt, Transaction};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

pub(crate) fn addr(byte: u8) -> Address {
    Address::from_slice(&[byte; 20])
}

pub(crate) fn tx_hash(byte: u8) -> B256 {
    B256::from_slice(&[byte; 32])
}

pub(crate) fn make_tx(hash: u8, from: Option<Address>, to: Option<Address>) -> Transaction {
    Transaction {
        hash: tx_hash(hash),
        from,
        to,
        creates: None,
    }
}

pub(crate) fn make_block(number: u64, timestamp: u64, transactions: Vec<Transaction>) -> Block {
    Block {
        number,
        hash: B256::from_slice(&[number as u8; 32]),
        timestamp,
        transactions,
    }
}

fn investor_topic(investor: Address) -> String {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(investor.as_slice());
    format!("0x{}", hex::encode(word))
}

fn membership_log(contract_addr: Address, topic0: B256, investor: Address) -> Log {
    Log {
        address: contract_addr,
        topics: vec![
            format!("0x{}", hex::encode(topic0.as_slice())),
            investor_topic(investor),
        ],
        data: Vec::new(),
    }
}

pub(crate) fn add_log(contract_addr: Address, investor: Address) -> Log {
    membership_log(contract_addr, contract::add_investor_topic(), investor)
}

pub(crate) fn remove_log(contract_addr: Address, investor: Address) -> Log {
    membership_log(contract_addr, contract::remove_investor_topic(), investor)
}

pub(crate) fn receipt_with_logs(logs: Vec<Log>) -> Receipt {
    Receipt {
        status: 1,
        contract_address: None,
        logs,
    }
}

/// Scripted ledger used in place of a live node.
#[derive(Default)]
pub(crate) struct MockLedger {
    pub height: AtomicU64,
    pub timestamp: AtomicU64,
    pub syncing: AtomicBool,
    /// When set, `syncing()` reports a connectivity error instead.
    pub fail_syncing: AtomicBool,
    pub blocks: Mutex<HashMap<u64, Block>>,
    /// Heights that report a null block for the first N fetches.
    pub null_fetches: Mutex<HashMap<u64, u32>>,
    pub receipts: Mutex<HashMap<B256, Receipt>>,
    pub payouts: Mutex<HashMap<(Address, Address), U256>>,
    pub payout_failures: Mutex<HashSet<(Address, Address)>>,
    /// Every height handed to `fetch_block`, in call order.
    pub fetched: Mutex<Vec<u64>>,
}

impl MockLedger {
    pub fn new(height: u64) -> Self {
        let ledger = Self::default();
        ledger.height.store(height, Ordering::SeqCst);
        ledger
    }

    pub fn insert_block(&self, block: Block) {
        self.blocks.lock().unwrap().insert(block.number, block);
    }

    pub fn insert_receipt(&self, hash: B256, receipt: Receipt) {
        self.receipts.lock().unwrap().insert(hash, receipt);
    }

    pub fn fail_fetches(&self, height: u64, times: u32) {
        self.null_fetches.lock().unwrap().insert(height, times);
    }

    pub fn set_payout(&self, contract_addr: Address, member: Address, amount: U256) {
        self.payouts
            .lock()
            .unwrap()
            .insert((contract_addr, member), amount);
    }

    pub fn fail_payout(&self, contract_addr: Address, member: Address) {
        self.payout_failures
            .lock()
            .unwrap()
            .insert((contract_addr, member));
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn current_height(&self) -> Result<u64> {
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn fetch_block(&self, height: u64) -> Result<Option<Block>> {
        self.fetched.lock().unwrap().push(height);
        let mut nulls = self.null_fetches.lock().unwrap();
        if let Some(remaining) = nulls.get_mut(&height) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(self.blocks.lock().unwrap().get(&height).cloned())
    }

    async fn fetch_receipt(&self, hash: B256) -> Result<Option<Receipt>> {
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }

    async fn syncing(&self) -> Result<bool> {
        if self.fail_syncing.load(Ordering::SeqCst) {
            return Err(Error::connectivity("scripted syncing probe failure"));
        }
        Ok(self.syncing.load(Ordering::SeqCst))
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        Ok(self.timestamp.load(Ordering::SeqCst))
    }

    async fn compute_payout(
        &self,
        contract_addr: Address,
        member: Address,
        _reference_time: u64,
    ) -> Result<U256> {
        if self
            .payout_failures
            .lock()
            .unwrap()
            .contains(&(contract_addr, member))
        {
            return Err(Error::computation("scripted computation failure"));
        }
        Ok(self
            .payouts
            .lock()
            .unwrap()
            .get(&(contract_addr, member))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}
