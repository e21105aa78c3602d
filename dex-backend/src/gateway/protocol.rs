//! Events published to API clients

use chrono::{DateTime, Utc};
use serde::Serialize;
use trade_queue_types::{ExecutionStep, SecurityReport};

use crate::trade_queue::QueuedTrade;
use crate::wallet::WalletState;

/// Everything the backend reports asynchronously
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DexEvent {
    TradeQueued(QueuedTrade),
    TradeStarted { id: String },
    TradeStep { id: String, step: ExecutionStep },
    TradeCompleted(QueuedTrade),
    /// Attempt failed but an automatic retry is scheduled
    TradeRetryScheduled(QueuedTrade),
    /// Attempt failed and retries are exhausted
    TradeFailed(QueuedTrade),
    TradeInterrupted { id: String },
    TradeCancelled { id: String },
    TradeRemoved { id: String },
    QueueSwept { removed: usize },
    SecurityReport(SecurityReport),
    WalletChanged(WalletState),
}

impl DexEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DexEvent::TradeQueued(_) => "trade_queued",
            DexEvent::TradeStarted { .. } => "trade_started",
            DexEvent::TradeStep { .. } => "trade_step",
            DexEvent::TradeCompleted(_) => "trade_completed",
            DexEvent::TradeRetryScheduled(_) => "trade_retry_scheduled",
            DexEvent::TradeFailed(_) => "trade_failed",
            DexEvent::TradeInterrupted { .. } => "trade_interrupted",
            DexEvent::TradeCancelled { .. } => "trade_cancelled",
            DexEvent::TradeRemoved { .. } => "trade_removed",
            DexEvent::QueueSwept { .. } => "queue_swept",
            DexEvent::SecurityReport(_) => "security_report",
            DexEvent::WalletChanged(_) => "wallet_changed",
        }
    }
}

/// An event with the time it was published
#[derive(Debug, Clone, Serialize)]
pub struct StampedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DexEvent,
}
