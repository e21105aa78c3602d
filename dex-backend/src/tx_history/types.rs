//! Transaction history data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trade_queue_types::{TxRecordStatus, TxType};

/// A submitted chain transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub hash: String,
    pub tx_type: TxType,
    pub status: TxRecordStatus,
    /// Token amount as a decimal string
    pub amount: String,
    /// Vault/pool shares minted or burned, when known
    pub shares: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Owning user address (compared case-insensitively)
    pub user_address: String,
    pub block_number: Option<u64>,
    pub gas_used: Option<String>,
    pub error: Option<String>,
}

/// Data needed to record a new transaction
#[derive(Debug, Clone)]
pub struct NewTransactionRecord {
    pub hash: String,
    pub tx_type: TxType,
    pub status: TxRecordStatus,
    pub amount: String,
    pub shares: Option<String>,
    pub user_address: String,
}

impl NewTransactionRecord {
    /// A freshly submitted transaction awaiting its receipt
    pub fn pending(hash: &str, tx_type: TxType, amount: &str, user_address: &str) -> Self {
        Self {
            hash: hash.to_string(),
            tx_type,
            status: TxRecordStatus::Pending,
            amount: amount.to_string(),
            shares: None,
            user_address: user_address.to_string(),
        }
    }
}

/// Partial update merged into an existing record. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionRecordUpdate {
    pub status: Option<TxRecordStatus>,
    pub shares: Option<String>,
    pub block_number: Option<u64>,
    pub gas_used: Option<String>,
    pub error: Option<String>,
}

impl TransactionRecordUpdate {
    pub fn confirmed(block_number: u64, gas_used: &str) -> Self {
        Self {
            status: Some(TxRecordStatus::Success),
            block_number: Some(block_number),
            gas_used: Some(gas_used.to_string()),
            ..Default::default()
        }
    }

    pub fn failed(error: &str) -> Self {
        Self {
            status: Some(TxRecordStatus::Failed),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

impl TransactionRecord {
    pub(super) fn from_new(id: String, req: NewTransactionRecord) -> Self {
        Self {
            id,
            hash: req.hash,
            tx_type: req.tx_type,
            status: req.status,
            amount: req.amount,
            shares: req.shares,
            timestamp: Utc::now(),
            user_address: req.user_address,
            block_number: None,
            gas_used: None,
            error: None,
        }
    }

    pub(crate) fn apply(&mut self, update: TransactionRecordUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if update.shares.is_some() {
            self.shares = update.shares;
        }
        if update.block_number.is_some() {
            self.block_number = update.block_number;
        }
        if update.gas_used.is_some() {
            self.gas_used = update.gas_used;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
    }
}
