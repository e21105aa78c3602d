//! Trade queue data types and the trade status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trade_queue_types::{
    ExecutionStep, NewTradeRequest, OrderKind, TradePriority, TradeSide, TradeStatus,
};

/// Inputs that move a trade between statuses
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    /// Picked up by the queue worker
    Start,
    /// All steps finished
    Succeed { tx_hash: String },
    /// An attempt failed. `retry_at` is used only if retries remain.
    Fail {
        error: String,
        retry_at: DateTime<Utc>,
    },
    /// Execution stopped mid-step (wallet disconnected)
    Interrupt,
    /// Scheduled re-attempt of a failed trade
    Retry,
    Cancel,
}

impl TradeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TradeEvent::Start => "start",
            TradeEvent::Succeed { .. } => "succeed",
            TradeEvent::Fail { .. } => "fail",
            TradeEvent::Interrupt => "interrupt",
            TradeEvent::Retry => "retry",
            TradeEvent::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event} a {from} trade")]
pub struct TransitionError {
    pub from: TradeStatus,
    pub event: &'static str,
}

/// Status-level transition table.
///
/// | from       | event     | to         |
/// |------------|-----------|------------|
/// | pending    | start     | processing |
/// | processing | succeed   | completed  |
/// | processing | fail      | failed     |
/// | processing | interrupt | pending    |
/// | failed     | retry     | pending    |
/// | pending    | cancel    | cancelled  |
/// | failed     | cancel    | cancelled  |
///
/// Whether a failed trade may still retry or be cancelled depends on its
/// retry bookkeeping and is checked by [`QueuedTrade::apply`].
pub fn next_status(from: TradeStatus, event: &TradeEvent) -> Result<TradeStatus, TransitionError> {
    use TradeStatus::*;

    let to = match (from, event) {
        (Pending, TradeEvent::Start) => Processing,
        (Processing, TradeEvent::Succeed { .. }) => Completed,
        (Processing, TradeEvent::Fail { .. }) => Failed,
        (Processing, TradeEvent::Interrupt) => Pending,
        (Failed, TradeEvent::Retry) => Pending,
        (Pending, TradeEvent::Cancel) | (Failed, TradeEvent::Cancel) => Cancelled,
        _ => {
            return Err(TransitionError {
                from,
                event: event.name(),
            });
        }
    };
    Ok(to)
}

/// A trade intent waiting in, or processed by, the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedTrade {
    pub id: String,
    pub kind: OrderKind,
    pub side: TradeSide,
    pub symbol: String,
    pub amount: f64,
    pub price: Option<f64>,
    pub stop_price: Option<f64>,
    pub priority: TradePriority,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    /// Step in progress while processing
    pub current_step: Option<ExecutionStep>,
    /// Set while a failed trade waits for its automatic re-attempt
    pub next_retry_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tx_hash: Option<String>,
}

impl QueuedTrade {
    pub fn new(id: String, req: NewTradeRequest, default_max_retries: u32) -> Self {
        Self {
            id,
            kind: req.kind,
            side: req.side,
            symbol: req.symbol.trim().to_string(),
            amount: req.amount,
            price: req.price,
            stop_price: req.stop_price,
            priority: req.priority,
            status: TradeStatus::Pending,
            created_at: Utc::now(),
            retry_count: 0,
            max_retries: req.max_retries.unwrap_or(default_max_retries),
            last_error: None,
            current_step: None,
            next_retry_at: None,
            completed_at: None,
            tx_hash: None,
        }
    }

    /// True for a failed trade that still has an automatic retry scheduled
    pub fn awaiting_retry(&self) -> bool {
        self.status == TradeStatus::Failed && self.next_retry_at.is_some()
    }

    /// Completed, cancelled, or failed with no retry left
    pub fn is_terminal(&self) -> bool {
        match self.status {
            TradeStatus::Completed | TradeStatus::Cancelled => true,
            TradeStatus::Failed => self.next_retry_at.is_none(),
            TradeStatus::Pending | TradeStatus::Processing => false,
        }
    }

    /// Apply `event`, updating status and bookkeeping. On error the trade is unchanged.
    pub fn apply(&mut self, event: TradeEvent) -> Result<(), TransitionError> {
        let to = next_status(self.status, &event)?;

        let guard_failed = matches!(event, TradeEvent::Retry | TradeEvent::Cancel)
            && self.status == TradeStatus::Failed
            && !self.awaiting_retry();
        if guard_failed {
            return Err(TransitionError {
                from: self.status,
                event: event.name(),
            });
        }

        match event {
            TradeEvent::Start => {
                self.current_step = None;
            }
            TradeEvent::Succeed { tx_hash } => {
                self.current_step = None;
                self.tx_hash = Some(tx_hash);
                self.completed_at = Some(Utc::now());
            }
            TradeEvent::Fail { error, retry_at } => {
                self.current_step = None;
                self.retry_count += 1;
                self.last_error = Some(error);
                if self.retry_count < self.max_retries {
                    self.next_retry_at = Some(retry_at);
                } else {
                    self.next_retry_at = None;
                    self.completed_at = Some(Utc::now());
                }
            }
            TradeEvent::Interrupt => {
                self.current_step = None;
            }
            TradeEvent::Retry => {
                self.next_retry_at = None;
            }
            TradeEvent::Cancel => {
                self.next_retry_at = None;
                self.completed_at = Some(Utc::now());
            }
        }

        self.status = to;
        Ok(())
    }
}
