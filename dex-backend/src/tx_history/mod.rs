//! Transaction history
//!
//! Durable, user-scoped audit log of submitted chain transactions.
//! Stored as a single JSON blob under a fixed key, newest record first,
//! bounded to a configured number of records.

mod store;
mod types;

pub use store::TxHistoryStore;
pub use types::{NewTransactionRecord, TransactionRecord, TransactionRecordUpdate};
