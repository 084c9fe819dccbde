//! JSON-RPC client for Ethereum nodes
//!
//! Provides a typed interface to Ethereum JSON-RPC endpoints.
//! Handles hex string parsing and error handling. The `LedgerClient`
//! trait is the seam the scanner, tracker, and payout scheduler depend
//! on, so tests can substitute a scripted ledger.

use crate::contract;
use crate::error::{Error, Result};
use crate::types::{Block, Receipt};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Read-side ledger operations consumed by the scanner and scheduler.
///
/// `fetch_block` and `fetch_receipt` return `None` when the node reports
/// no data at that height/hash; callers treat that as retryable, not as
/// success.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current chain height.
    async fn current_height(&self) -> Result<u64>;

    /// Fetch a block by number with full transaction details.
    async fn fetch_block(&self, height: u64) -> Result<Option<Block>>;

    /// Fetch a transaction receipt by hash.
    async fn fetch_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>>;

    /// Whether the node reports itself as still syncing.
    async fn syncing(&self) -> Result<bool>;

    /// Timestamp of the latest block, Unix epoch seconds.
    async fn latest_block_timestamp(&self) -> Result<u64>;

    /// Payout amount owed to `member` by `contract` as of `reference_time`.
    async fn compute_payout(
        &self,
        contract: Address,
        member: Address,
        reference_time: u64,
    ) -> Result<U256>;
}

/// JSON-RPC client for Ethereum nodes.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client.
    ///
    /// `timeout` bounds every individual call so one unresponsive RPC
    /// cannot stall the scanning loop or a scheduler run.
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::connectivity(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::connectivity(format!("{} request failed: {}", method, e)))?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::connectivity(format!("{} response unreadable: {}", method, e)))?;

        if let Some(error) = json.get("error") {
            return Err(Error::connectivity(format!("{} node error: {}", method, error)));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| Error::connectivity(format!("{} response missing 'result'", method)))
    }

    /// Execute a read-only contract call (`eth_call`) at the latest block.
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let params = json!([
            {
                "to": format!("0x{:x}", to),
                "data": format!("0x{}", hex::encode(data)),
            },
            "latest"
        ]);
        let result = self.call("eth_call", params).await?;
        let ret = result
            .as_str()
            .ok_or_else(|| Error::decode("eth_call result is not a string".to_string()))?;
        let ret = ret.strip_prefix("0x").unwrap_or(ret);
        hex::decode(ret).map_err(|e| Error::decode(format!("eth_call return data: {}", e)))
    }

    /// Submit a transaction signed node-side by an unlocked account.
    pub async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: &[u8],
    ) -> Result<B256> {
        let params = json!([{
            "from": format!("0x{:x}", from),
            "to": format!("0x{:x}", to),
            "data": format!("0x{}", hex::encode(data)),
        }]);
        let result = self.call("eth_sendTransaction", params).await?;
        let hash = result
            .as_str()
            .ok_or_else(|| Error::decode("eth_sendTransaction result is not a string".to_string()))?;
        parse_b256(hash)
    }

    /// Extract the hex u64 field `name` from a block object.
    fn block_field_u64(result: &Value, name: &str) -> Result<u64> {
        let field = result
            .get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::decode(format!("block missing '{}' field", name)))?;
        parse_hex_u64(field)
    }
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn current_height(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let s = result
            .as_str()
            .ok_or_else(|| Error::decode("eth_blockNumber result is not a string".to_string()))?;
        parse_hex_u64(s)
    }

    async fn fetch_block(&self, height: u64) -> Result<Option<Block>> {
        let params = json!([format!("0x{:x}", height), true]);
        let result = self.call("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        let block = serde_json::from_value(result)
            .map_err(|e| Error::decode(format!("block {}: {}", height, e)))?;
        Ok(Some(block))
    }

    async fn fetch_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>> {
        let params = json!([format!("0x{:x}", tx_hash)]);
        let result = self.call("eth_getTransactionReceipt", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        let receipt = serde_json::from_value(result)
            .map_err(|e| Error::decode(format!("receipt {:?}: {}", tx_hash, e)))?;
        Ok(Some(receipt))
    }

    async fn syncing(&self) -> Result<bool> {
        // eth_syncing returns `false` when synced, a status object otherwise.
        let result = self.call("eth_syncing", json!([])).await?;
        Ok(!matches!(result, Value::Bool(false)))
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        let params = json!(["latest", false]);
        let result = self.call("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            return Err(Error::connectivity("node returned no latest block".to_string()));
        }
        Self::block_field_u64(&result, "timestamp")
    }

    async fn compute_payout(
        &self,
        contract: Address,
        member: Address,
        reference_time: u64,
    ) -> Result<U256> {
        let data = contract::encode_payout_query(member, reference_time);
        let ret = self
            .eth_call(contract, &data)
            .await
            .map_err(|e| Error::computation(format!("{:?}/{:?}: {}", contract, member, e)))?;
        contract::decode_uint256(&ret)
            .map_err(|e| Error::computation(format!("{:?}/{:?}: {}", contract, member, e)))
    }
}

/// Parse a 0x-prefixed hex quantity into u64.
fn parse_hex_u64(s: &str) -> Result<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Err(Error::decode("empty hex quantity".to_string()));
    }
    u64::from_str_radix(s, 16).map_err(|e| Error::decode(format!("hex quantity '{}': {}", s, e)))
}

/// Parse a 0x-prefixed 32-byte hex string.
fn parse_b256(s: &str) -> Result<B256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| Error::decode(format!("hash '{}': {}", s, e)))?;
    if bytes.len() != 32 {
        return Err(Error::decode(format!(
            "expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}
