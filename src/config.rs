//! Configuration and watched-contract loading
//!
//! Handles loading the watched contract list from a file.
//! Each line should contain one contract address in hex format.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load the watched contract list from a file.
///
/// Each line should contain one address in hex format (with or without
/// 0x prefix, any letter case). Empty lines and lines starting with '#'
/// are ignored. Addresses are canonicalized by parsing, so all later
/// comparisons are case-insensitive and display is lower-case hex.
pub fn load_contracts(path: &Path) -> Result<Vec<Address>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read contracts file: {:?}", path))?;

    let mut addresses = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let addr = parse_address(line)
            .with_context(|| format!("Invalid address on line {}: {}", line_num + 1, line))?;

        if !addresses.contains(&addr) {
            addresses.push(addr);
        }
    }

    if addresses.is_empty() {
        anyhow::bail!("Contracts file is empty (no valid addresses found)");
    }

    Ok(addresses)
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!(
            "Address must be 20 bytes (40 hex chars), got {} bytes",
            bytes.len()
        );
    }

    Ok(Address::from_slice(&bytes))
}
