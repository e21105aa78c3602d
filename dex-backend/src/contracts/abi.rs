//! Calldata encoding for the token, vault, pool and position manager contracts
//!
//! Manual selector + ABI encoding, no abigen.

use ethers::abi::Token;
use ethers::types::{Address, U256};
use ethers::utils::{ParseUnits, parse_units};

use super::client::ContractError;

/// approve(address,uint256)
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// deposit(uint256)
const DEPOSIT_SELECTOR: [u8; 4] = [0xb6, 0xb5, 0x5f, 0x25];

/// withdraw(uint256)
const WITHDRAW_SELECTOR: [u8; 4] = [0x2e, 0x1a, 0x7d, 0x4d];

/// openPosition(string,bool,uint256,uint256)
const OPEN_POSITION_SELECTOR: [u8; 4] = [0xfb, 0xa7, 0x20, 0xda];

/// closePosition(uint256)
const CLOSE_POSITION_SELECTOR: [u8; 4] = [0xa1, 0x26, 0xd6, 0x01];

/// mint(address,uint256) - testnet faucet token
const MINT_SELECTOR: [u8; 4] = [0x40, 0xc1, 0x0f, 0x19];

fn with_selector(selector: [u8; 4], args: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend_from_slice(&ethers::abi::encode(args));
    data
}

pub fn encode_approve(spender: Address, amount: U256) -> Vec<u8> {
    with_selector(
        APPROVE_SELECTOR,
        &[Token::Address(spender), Token::Uint(amount)],
    )
}

pub fn encode_deposit(amount: U256) -> Vec<u8> {
    with_selector(DEPOSIT_SELECTOR, &[Token::Uint(amount)])
}

pub fn encode_withdraw(shares: U256) -> Vec<u8> {
    with_selector(WITHDRAW_SELECTOR, &[Token::Uint(shares)])
}

pub fn encode_open_position(symbol: &str, is_long: bool, size: U256, collateral: U256) -> Vec<u8> {
    with_selector(
        OPEN_POSITION_SELECTOR,
        &[
            Token::String(symbol.to_string()),
            Token::Bool(is_long),
            Token::Uint(size),
            Token::Uint(collateral),
        ],
    )
}

pub fn encode_close_position(position_id: U256) -> Vec<u8> {
    with_selector(CLOSE_POSITION_SELECTOR, &[Token::Uint(position_id)])
}

pub fn encode_mint(to: Address, amount: U256) -> Vec<u8> {
    with_selector(MINT_SELECTOR, &[Token::Address(to), Token::Uint(amount)])
}

/// Convert a human-readable decimal amount ("12.5") to base units
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ContractError> {
    let trimmed = amount.trim();
    let parsed = parse_units(trimmed, decimals as u32)
        .map_err(|e| ContractError::InvalidAmount(format!("{}: {}", trimmed, e)))?;
    let ParseUnits::U256(value) = parsed else {
        return Err(ContractError::InvalidAmount(format!(
            "{}: must not be negative",
            trimmed
        )));
    };
    if value.is_zero() {
        return Err(ContractError::InvalidAmount(format!(
            "{}: must be greater than zero",
            trimmed
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::keccak256;
    use std::str::FromStr;

    fn spender() -> Address {
        Address::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap()
    }

    #[test]
    fn test_selectors() {
        assert_eq!(APPROVE_SELECTOR, keccak256(b"approve(address,uint256)")[0..4]);
        assert_eq!(DEPOSIT_SELECTOR, keccak256(b"deposit(uint256)")[0..4]);
        assert_eq!(WITHDRAW_SELECTOR, keccak256(b"withdraw(uint256)")[0..4]);
        assert_eq!(
            OPEN_POSITION_SELECTOR,
            keccak256(b"openPosition(string,bool,uint256,uint256)")[0..4]
        );
        assert_eq!(CLOSE_POSITION_SELECTOR, keccak256(b"closePosition(uint256)")[0..4]);
        assert_eq!(MINT_SELECTOR, keccak256(b"mint(address,uint256)")[0..4]);
    }

    #[test]
    fn test_encode_approve() {
        let data = encode_approve(spender(), U256::from(1_000_000u64));
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[0..4], &APPROVE_SELECTOR);
        // address is right-aligned in the first word
        assert_eq!(&data[16..36], spender().as_bytes());
        assert_eq!(U256::from_big_endian(&data[36..68]), U256::from(1_000_000u64));
    }

    #[test]
    fn test_encode_open_position_has_dynamic_string() {
        let data = encode_open_position("ETH-USD", true, U256::from(10u8), U256::from(5u8));
        // 4 head words + string length word + one padded data word
        assert_eq!(data.len(), 4 + 6 * 32);
        // string offset points past the 4 head words
        assert_eq!(U256::from_big_endian(&data[4..36]), U256::from(128u8));
        assert_eq!(U256::from_big_endian(&data[36..68]), U256::one());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.5", 6).unwrap(), U256::from(12_500_000u64));
        assert_eq!(parse_amount(" 1 ", 18).unwrap(), U256::exp10(18));
        assert!(matches!(parse_amount("0", 6), Err(ContractError::InvalidAmount(_))));
        assert!(matches!(parse_amount("abc", 6), Err(ContractError::InvalidAmount(_))));
        assert!(matches!(parse_amount("-3", 6), Err(ContractError::InvalidAmount(_))));
    }
}
