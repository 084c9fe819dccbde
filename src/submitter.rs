//! Payout transaction submission
//!
//! Single abstraction point for the signing strategy: the payout
//! scheduler only sees `PayoutSubmitter`. The shipped implementation
//! signs node-side via `eth_sendTransaction` from an unlocked account;
//! a key-holding submitter can slot in behind the same trait.

use crate::contract;
use crate::error::{Error, Result};
use crate::rpc::RpcClient;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::sync::Arc;

/// Submits one payout transaction naming a batch of members.
#[async_trait]
pub trait PayoutSubmitter: Send + Sync {
    async fn submit_payout(&self, contract_addr: Address, members: &[Address]) -> Result<B256>;
}

/// Node-side signing: the payout transaction is sent from an account
/// the node itself holds unlocked.
pub struct NodeSigner {
    rpc: Arc<RpcClient>,
    from: Address,
}

impl NodeSigner {
    pub fn new(rpc: Arc<RpcClient>, from: Address) -> Self {
        Self { rpc, from }
    }
}

#[async_trait]
impl PayoutSubmitter for NodeSigner {
    async fn submit_payout(&self, contract_addr: Address, members: &[Address]) -> Result<B256> {
        let data = contract::encode_airdrop(members);
        self.rpc
            .send_transaction(self.from, contract_addr, &data)
            .await
            .map_err(|e| {
                Error::submission(format!(
                    "airdrop of {} members to {:?}: {}",
                    members.len(),
                    contract_addr,
                    e
                ))
            })
    }
}
