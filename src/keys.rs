//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! This ensures deterministic, lexicographically ordered keys in RocksDB,
//! so all members of one contract sit in a contiguous key range.

use crate::error::{Error, Result};
use alloy_primitives::Address;

/// Meta ID for the scanner checkpoint (last fully processed block height).
pub const META_CHECKPOINT: u8 = 0x01;

/// Encode a meta key.
///
/// Format: byte 'M' (0x4D) + meta_id (1 byte)
/// Total length: 2 bytes
pub fn encode_meta_key(meta_id: u8) -> Vec<u8> {
    vec![b'M', meta_id]
}

/// Encode a membership row key.
///
/// Format: byte 'I' (0x49) + contract (20 bytes) + member (20 bytes)
/// Total length: 41 bytes
pub fn encode_member_key(contract: Address, member: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(41);
    key.push(b'I');
    key.extend_from_slice(contract.as_slice());
    key.extend_from_slice(member.as_slice());
    key
}

/// Key prefix covering every membership row of one contract.
pub fn member_key_prefix(contract: Address) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(21);
    prefix.push(b'I');
    prefix.extend_from_slice(contract.as_slice());
    prefix
}

/// Decode a membership row key back into (contract, member).
pub fn decode_member_key(key: &[u8]) -> Result<(Address, Address)> {
    if key.len() != 41 || key[0] != b'I' {
        return Err(Error::persistence(format!(
            "malformed membership key of {} bytes",
            key.len()
        )));
    }
    let contract = Address::from_slice(&key[1..21]);
    let member = Address::from_slice(&key[21..41]);
    Ok((contract, member))
}
