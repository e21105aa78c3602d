//! Contract gateway: calldata encoding, chain access and the vault/pool service

pub mod abi;
mod client;
mod vault;

pub use client::{ChainClient, ContractError, SimulatedChain};
pub use vault::VaultService;
