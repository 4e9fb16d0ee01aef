//! Ether amount helpers.
//!
//! Amounts are kept as wei (`U256`) everywhere; these helpers convert at the
//! edges (webhook input, metadata and JSON output).

use alloy_primitives::utils::{format_ether as format_ether_padded, parse_ether as parse_ether_raw};
use alloy_primitives::{Address, U256};

use crate::constants::ETHER_DECIMALS;
use crate::error::CoreError;

/// Parse a decimal ether string (e.g. `"1.5"`) into wei.
///
/// Negative, empty, or malformed amounts are rejected, as are amounts
/// finer than one wei.
pub fn parse_ether(amount: &str) -> Result<U256, CoreError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(CoreError::InvalidAmount(amount.to_string()));
    }
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > ETHER_DECIMALS as usize {
            return Err(CoreError::InvalidAmount(amount.to_string()));
        }
    }
    parse_ether_raw(trimmed).map_err(|_| CoreError::InvalidAmount(amount.to_string()))
}

/// Render wei as a decimal ether string with trailing zeros trimmed.
///
/// Always keeps at least one fractional digit: `1e18` → `"1.0"`,
/// `5e17` → `"0.5"`, `0` → `"0.0"`.
pub fn format_ether(wei: U256) -> String {
    let padded = format_ether_padded(wei);
    match padded.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => format!("{}.0", padded),
    }
}

/// Parse a hex address (with or without `0x`).
pub fn parse_address(input: &str) -> Result<Address, CoreError> {
    input
        .trim()
        .parse::<Address>()
        .map_err(|_| CoreError::InvalidAddress(input.to_string()))
}

/// Convert whole ether to wei.
pub fn ether(whole: u64) -> U256 {
    U256::from(whole) * U256::from(crate::constants::WEI_PER_ETHER)
}
