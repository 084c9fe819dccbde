//! Deposit-plan contract ABI helpers
//!
//! Decodes the contract's membership events (`AddInvestor` /
//! `RemoveInvestor`) from receipt logs and encodes calldata for the
//! read-only payout query and the batched `airdrop` call. Log parsing
//! is deliberately tolerant: a malformed log is skipped, not fatal.

use crate::error::{Error, Result};
use crate::types::Receipt;
use alloy_primitives::{keccak256, Address, B256, U256};
use std::sync::OnceLock;

static ADD_INVESTOR_TOPIC: OnceLock<B256> = OnceLock::new();
static REMOVE_INVESTOR_TOPIC: OnceLock<B256> = OnceLock::new();

/// Topic of the contract's `AddInvestor(address)` event.
pub fn add_investor_topic() -> B256 {
    *ADD_INVESTOR_TOPIC.get_or_init(|| keccak256(b"AddInvestor(address)"))
}

/// Topic of the contract's `RemoveInvestor(address)` event.
pub fn remove_investor_topic() -> B256 {
    *REMOVE_INVESTOR_TOPIC.get_or_init(|| keccak256(b"RemoveInvestor(address)"))
}

/// Membership change decoded from one receipt log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipEvent {
    Added(Address),
    Removed(Address),
}

/// Decode the membership events a contract emitted in one receipt.
///
/// Returns events in log emission order, so a caller applying them
/// sequentially gets last-write-wins semantics when one receipt both
/// adds and removes the same member. Logs from other contracts and
/// logs that fail to parse are skipped.
pub fn decode_membership_events(contract: Address, receipt: &Receipt) -> Vec<MembershipEvent> {
    let mut events = Vec::new();
    for log in &receipt.logs {
        if log.address != contract {
            continue;
        }
        let topic0 = match log.topics.first().and_then(|t| parse_topic(t)) {
            Some(t) => t,
            None => continue,
        };
        let kind: fn(Address) -> MembershipEvent = if topic0 == add_investor_topic() {
            MembershipEvent::Added
        } else if topic0 == remove_investor_topic() {
            MembershipEvent::Removed
        } else {
            continue;
        };
        match log.topics.get(1).map(|t| parse_address_from_topic(t)) {
            Some(Ok(investor)) => events.push(kind(investor)),
            Some(Err(e)) => {
                tracing::warn!("Skipping malformed membership log from {:?}: {}", contract, e);
            }
            None => {
                tracing::warn!("Membership log from {:?} has no investor topic", contract);
            }
        }
    }
    events
}

/// Member addresses added by `contract` in this receipt, in log order.
pub fn decode_add_events(contract: Address, receipt: &Receipt) -> Vec<Address> {
    decode_membership_events(contract, receipt)
        .into_iter()
        .filter_map(|e| match e {
            MembershipEvent::Added(a) => Some(a),
            MembershipEvent::Removed(_) => None,
        })
        .collect()
}

/// Member addresses removed by `contract` in this receipt, in log order.
pub fn decode_remove_events(contract: Address, receipt: &Receipt) -> Vec<Address> {
    decode_membership_events(contract, receipt)
        .into_iter()
        .filter_map(|e| match e {
            MembershipEvent::Removed(a) => Some(a),
            MembershipEvent::Added(_) => None,
        })
        .collect()
}

/// Calldata for `calculateInvestorPayoutsForTime(address,uint256)`.
pub fn encode_payout_query(member: Address, reference_time: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&selector("calculateInvestorPayoutsForTime(address,uint256)"));
    data.extend_from_slice(&encode_address(member));
    data.extend_from_slice(&encode_u64(reference_time));
    data
}

/// Calldata for `airdrop(address[])`.
pub fn encode_airdrop(members: &[Address]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64 + members.len() * 32);
    data.extend_from_slice(&selector("airdrop(address[])"));
    // Head: offset of the dynamic array, then its length, then elements.
    data.extend_from_slice(&encode_u64(0x20));
    data.extend_from_slice(&encode_u64(members.len() as u64));
    for member in members {
        data.extend_from_slice(&encode_address(*member));
    }
    data
}

/// Decode a single uint256 return value.
pub fn decode_uint256(ret: &[u8]) -> Result<U256> {
    if ret.len() < 32 {
        return Err(Error::decode(format!(
            "expected 32-byte uint256 return, got {} bytes",
            ret.len()
        )));
    }
    Ok(U256::from_be_slice(&ret[..32]))
}

/// First 4 bytes of keccak256 over the canonical function signature.
fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode an address as a 32-byte left-padded ABI word.
fn encode_address(addr: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_slice());
    word
}

/// Encode a u64 as a 32-byte big-endian ABI word.
fn encode_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Parse a 32-byte hex topic string.
fn parse_topic(topic: &str) -> Option<B256> {
    let s = topic.strip_prefix("0x").unwrap_or(topic);
    if s.len() != 64 {
        return None;
    }
    let bytes = hex::decode(s).ok()?;
    Some(B256::from_slice(&bytes))
}

/// Parse a 32-byte hex topic into an Address (last 20 bytes).
fn parse_address_from_topic(topic: &str) -> Result<Address> {
    let s = topic.strip_prefix("0x").unwrap_or(topic);
    let bytes =
        hex::decode(s).map_err(|e| Error::decode(format!("invalid hex in topic: {}", e)))?;
    if bytes.len() < 20 {
        return Err(Error::decode("topic too short for address".to_string()));
    }
    let start = bytes.len() - 20;
    Ok(Address::from_slice(&bytes[start..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Log;

    fn addr(byte: u8) -> Address {
        Address::from_slice(&[byte; 20])
    }

    fn topic_hex(hash: B256) -> String {
        format!("0x{}", hex::encode(hash.as_slice()))
    }

    fn investor_topic(investor: Address) -> String {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(investor.as_slice());
        format!("0x{}", hex::encode(word))
    }

    fn membership_log(contract: Address, topic0: B256, investor: Address) -> Log {
        let json = format!(
            r#"{{"address": "0x{:x}", "topics": ["{}", "{}"], "data": "0x"}}"#,
            contract,
            topic_hex(topic0),
            investor_topic(investor)
        );
        serde_json::from_str(&json).unwrap()
    }

    fn receipt_with_logs(logs: Vec<Log>) -> Receipt {
        let mut receipt: Receipt = serde_json::from_str(r#"{"status": "0x1"}"#).unwrap();
        receipt.logs = logs;
        receipt
    }

    #[test]
    fn test_topics_are_distinct() {
        assert_ne!(add_investor_topic(), remove_investor_topic());
    }

    #[test]
    fn test_decode_preserves_log_order() {
        let contract = addr(0xaa);
        let member = addr(0xbb);
        let receipt = receipt_with_logs(vec![
            membership_log(contract, add_investor_topic(), member),
            membership_log(contract, remove_investor_topic(), member),
        ]);
        let events = decode_membership_events(contract, &receipt);
        assert_eq!(
            events,
            vec![
                MembershipEvent::Added(member),
                MembershipEvent::Removed(member)
            ]
        );
    }

    #[test]
    fn test_decode_ignores_other_contracts() {
        let contract = addr(0xaa);
        let other = addr(0xcc);
        let receipt = receipt_with_logs(vec![membership_log(
            other,
            add_investor_topic(),
            addr(0xbb),
        )]);
        assert!(decode_membership_events(contract, &receipt).is_empty());
        assert!(decode_add_events(contract, &receipt).is_empty());
    }

    #[test]
    fn test_decode_add_and_remove_wrappers() {
        let contract = addr(0xaa);
        let receipt = receipt_with_logs(vec![
            membership_log(contract, add_investor_topic(), addr(0x01)),
            membership_log(contract, remove_investor_topic(), addr(0x02)),
            membership_log(contract, add_investor_topic(), addr(0x03)),
        ]);
        assert_eq!(decode_add_events(contract, &receipt), vec![addr(0x01), addr(0x03)]);
        assert_eq!(decode_remove_events(contract, &receipt), vec![addr(0x02)]);
    }

    #[test]
    fn test_encode_payout_query_layout() {
        let data = encode_payout_query(addr(0xbb), 1_700_000_000);
        assert_eq!(data.len(), 4 + 32 + 32);
        // Address word is left-padded.
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], addr(0xbb).as_slice());
        assert_eq!(&data[60..68], &1_700_000_000u64.to_be_bytes());
    }

    #[test]
    fn test_encode_airdrop_layout() {
        let members = vec![addr(0x01), addr(0x02)];
        let data = encode_airdrop(&members);
        assert_eq!(data.len(), 4 + 32 + 32 + 2 * 32);
        // Offset word points just past itself, length word holds the count.
        assert_eq!(data[4 + 31], 0x20);
        assert_eq!(data[4 + 32 + 31], 2);
        assert_eq!(&data[4 + 64 + 12..4 + 64 + 32], addr(0x01).as_slice());
        assert_eq!(&data[4 + 96 + 12..4 + 96 + 32], addr(0x02).as_slice());
    }

    #[test]
    fn test_decode_uint256() {
        let mut ret = [0u8; 32];
        ret[31] = 42;
        assert_eq!(decode_uint256(&ret).unwrap(), U256::from(42u64));
        assert!(decode_uint256(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_parse_address_from_topic() {
        let topic = "0x00000000000000000000000070997970c51812dc3a010c7d01b50e0d17dc79c8";
        let parsed = parse_address_from_topic(topic).unwrap();
        let expected =
            Address::from_slice(&hex::decode("70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap());
        assert_eq!(parsed, expected);
    }
}
