//! Wallet address checks and batch input parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SmartAddress;

/// Source tag the backend uses for Solana wallets.
pub const SOLANA_SOURCE: &str = "Solana";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[default]
    Solana,
    #[serde(alias = "eip155")]
    Evm,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Chain::Solana => "solana",
            Chain::Evm => "eip155",
        })
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solana" | "sol" => Ok(Chain::Solana),
            "evm" | "eip155" | "eth" => Ok(Chain::Evm),
            other => Err(format!("unknown chain {other}")),
        }
    }
}

/// Whether `address` is well formed for `chain`.
///
/// Solana keys are base58 strings decoding to exactly 32 bytes. EVM
/// addresses are `0x` followed by 40 hex digits; checksum case is not
/// verified.
pub fn is_valid_address(address: &str, chain: Chain) -> bool {
    match chain {
        Chain::Solana => bs58::decode(address)
            .into_vec()
            .is_ok_and(|bytes| bytes.len() == 32),
        Chain::Evm => address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("{address:?} is not a valid {chain} address")]
    Invalid { chain: Chain, address: String },
}

/// [`is_valid_address`] with a reason, for single user-supplied addresses.
pub fn check_address(address: &str, chain: Chain) -> Result<(), AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if !is_valid_address(address, chain) {
        return Err(AddressError::Invalid {
            chain,
            address: address.to_string(),
        });
    }
    Ok(())
}

/// Parse one `address [alias]` entry per line.
///
/// Lines whose first word is not a valid Solana address are dropped. Words
/// after the alias are ignored.
pub fn parse_address_lines(input: &str) -> Vec<SmartAddress> {
    input
        .trim()
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let addr = parts.next()?;
            if !is_valid_address(addr, Chain::Solana) {
                return None;
            }
            Some(SmartAddress {
                source: SOLANA_SOURCE.to_string(),
                addr: addr.to_string(),
                alias: parts.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Collapse entries sharing an address. The later entry replaces the
/// earlier one in place, so first-seen order is kept.
pub fn dedup_by_addr(items: Vec<SmartAddress>) -> Vec<SmartAddress> {
    let mut out: Vec<SmartAddress> = Vec::with_capacity(items.len());
    for item in items {
        match out.iter_mut().find(|existing| existing.addr == item.addr) {
            Some(existing) => *existing = item,
            None => out.push(item),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SOL_A: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const SOL_B: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn solana_validation() {
        assert!(is_valid_address(SOL_A, Chain::Solana));
        assert!(is_valid_address(SOL_B, Chain::Solana));
        // 0, O, I and l are outside the base58 alphabet
        assert!(!is_valid_address("0WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM", Chain::Solana));
        assert!(!is_valid_address("abc", Chain::Solana));
        assert!(!is_valid_address("", Chain::Solana));
    }

    #[test]
    fn evm_validation() {
        assert!(is_valid_address(
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            Chain::Evm
        ));
        assert!(!is_valid_address("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266", Chain::Evm));
        assert!(!is_valid_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226", Chain::Evm));
        assert!(!is_valid_address("0xz39Fd6e51aad88F6F4ce6aB8827279cffFb92266", Chain::Evm));
    }

    #[test]
    fn parses_lines_with_optional_alias() {
        let input = format!("  {SOL_A} whale extra\n\nnot-an-address foo\n{SOL_B}\n");
        let parsed = parse_address_lines(&input);
        assert_eq!(
            parsed,
            vec![
                SmartAddress {
                    source: "Solana".into(),
                    addr: SOL_A.into(),
                    alias: "whale".into(),
                },
                SmartAddress {
                    source: "Solana".into(),
                    addr: SOL_B.into(),
                    alias: String::new(),
                },
            ]
        );
    }

    #[test]
    fn dedup_keeps_last_alias_in_first_position() {
        let input = format!("{SOL_A} one\n{SOL_B} two\n{SOL_A} three");
        let deduped = dedup_by_addr(parse_address_lines(&input));
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].addr, SOL_A);
        assert_eq!(deduped[0].alias, "three");
        assert_eq!(deduped[1].alias, "two");
    }

    #[test]
    fn check_address_reasons() {
        assert_eq!(check_address(" ", Chain::Solana), Err(AddressError::Empty));
        assert_eq!(check_address(SOL_A, Chain::Solana), Ok(()));
        let err = check_address(SOL_A, Chain::Evm).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("\"{SOL_A}\" is not a valid eip155 address")
        );
    }

    #[test]
    fn chain_names() {
        assert_eq!("EVM".parse::<Chain>().unwrap(), Chain::Evm);
        assert_eq!(Chain::Solana.to_string(), "solana");
        assert!("btc".parse::<Chain>().is_err());
    }
}
