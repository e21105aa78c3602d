//! Chain access
//!
//! [`ChainClient`] is the boundary to the wallet/RPC. The backend ships with
//! [`SimulatedChain`], which mines transactions after a random delay and
//! reverts a configurable share of them.

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::{Address, U256};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain_types::AddressError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractError {
    #[error("wallet not connected")]
    WalletNotConnected,
    #[error("wrong network: connected to chain {actual}, expected {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("invalid amount {0}")]
    InvalidAmount(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Raw error from the wallet or node
    #[error("{0}")]
    Transaction(String),
    #[error("transaction {0} reverted")]
    Reverted(String),
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TxReceipt {
    pub hash: String,
    pub block_number: u64,
    pub gas_used: U256,
    pub success: bool,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Sign and broadcast a call, returning the transaction hash
    async fn send_transaction(&self, to: Address, data: Vec<u8>) -> Result<String, ContractError>;

    /// Wait until the transaction is mined
    async fn wait_for_receipt(&self, hash: &str) -> Result<TxReceipt, ContractError>;
}

/// Base cost of any transaction plus a per-calldata-byte charge
const BASE_GAS: u64 = 21_000;
const GAS_PER_BYTE: u64 = 16;

pub struct SimulatedChain {
    chain_id: u64,
    latency_min: Duration,
    latency_max: Duration,
    /// Probability a mined transaction reverts
    failure_rate: f64,
    block_number: AtomicU64,
    /// Submitted, not yet mined: hash -> calldata length
    submitted: DashMap<String, usize>,
}

impl SimulatedChain {
    pub fn new(chain_id: u64, latency_min: Duration, latency_max: Duration, failure_rate: f64) -> Self {
        Self {
            chain_id,
            latency_min,
            latency_max: latency_max.max(latency_min),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            block_number: AtomicU64::new(5_000_000),
            submitted: DashMap::new(),
        }
    }

    fn latency(&self) -> Duration {
        if self.latency_max == self.latency_min {
            return self.latency_min;
        }
        rand::thread_rng().gen_range(self.latency_min..=self.latency_max)
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn send_transaction(&self, to: Address, data: Vec<u8>) -> Result<String, ContractError> {
        if to.is_zero() {
            return Err(ContractError::Transaction(
                "cannot send to the zero address".to_string(),
            ));
        }
        let bytes: [u8; 32] = rand::thread_rng().r#gen();
        let hash = format!("0x{}", hex::encode(bytes));
        log::debug!("[Chain] Submitted {} to {:?} ({} bytes)", hash, to, data.len());
        self.submitted.insert(hash.clone(), data.len());
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<TxReceipt, ContractError> {
        let Some((_, data_len)) = self.submitted.remove(hash) else {
            return Err(ContractError::Transaction(format!(
                "transaction {} not found",
                hash
            )));
        };

        tokio::time::sleep(self.latency()).await;

        let (success, extra_gas) = {
            let mut rng = rand::thread_rng();
            (!rng.gen_bool(self.failure_rate), rng.gen_range(0..20_000u64))
        };
        let block_number = self.block_number.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(TxReceipt {
            hash: hash.to_string(),
            block_number,
            gas_used: U256::from(BASE_GAS + GAS_PER_BYTE * data_len as u64 + extra_gas),
            success,
        })
    }
}
