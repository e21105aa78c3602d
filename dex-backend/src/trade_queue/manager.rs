//! Trade queue manager
//!
//! Ordered, thread-safe storage of queued trades. All status changes go through
//! [`QueuedTrade::apply`] under a single lock, which is what keeps at most one
//! trade in `processing`.

use chrono::Utc;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use trade_queue_types::{ExecutionStep, NewTradeRequest, QueueStats, TradeStatus};

use super::types::{QueuedTrade, TradeEvent, TransitionError};
use crate::config::QueueConfig;
use crate::gateway::{DexEvent, EventBroadcaster};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueueError {
    #[error("invalid trade: {0}")]
    Validation(String),
    #[error("trade {0} not found")]
    NotFound(String),
    #[error("trade {0} is processing")]
    Processing(String),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

/// Sort key: processing first, then pending by priority (FIFO within a
/// priority), then failed trades waiting to retry, then terminal entries.
fn queue_order(trade: &QueuedTrade) -> (u8, Reverse<u8>, chrono::DateTime<Utc>) {
    let group = match trade.status {
        TradeStatus::Processing => 0,
        TradeStatus::Pending => 1,
        _ if trade.awaiting_retry() => 2,
        _ => 3,
    };
    (group, Reverse(trade.priority.rank()), trade.created_at)
}

fn validate(req: &NewTradeRequest) -> Result<(), QueueError> {
    if req.symbol.trim().is_empty() {
        return Err(QueueError::Validation("symbol is required".to_string()));
    }
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(QueueError::Validation("amount must be greater than zero".to_string()));
    }
    let positive = |v: Option<f64>| v.is_some_and(|p| p.is_finite() && p > 0.0);
    if req.kind.requires_price() && !positive(req.price) {
        return Err(QueueError::Validation(format!("{} orders require a price", req.kind)));
    }
    if req.kind.requires_stop_price() && !positive(req.stop_price) {
        return Err(QueueError::Validation(format!(
            "{} orders require a stop price",
            req.kind
        )));
    }
    Ok(())
}

pub struct TradeQueueManager {
    /// Kept sorted by `queue_order`
    trades: Mutex<Vec<QueuedTrade>>,
    default_max_retries: u32,
    retry_delay: Duration,
    /// Wakes the drain worker when new work may be available
    work_available: Notify,
    broadcaster: Option<Arc<EventBroadcaster>>,
}

impl TradeQueueManager {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            trades: Mutex::new(Vec::new()),
            default_max_retries: config.default_max_retries,
            retry_delay: config.retry_delay,
            work_available: Notify::new(),
            broadcaster: None,
        }
    }

    pub fn with_broadcaster(config: &QueueConfig, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            broadcaster: Some(broadcaster),
            ..Self::new(config)
        }
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    fn emit(&self, event: DexEvent) {
        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.broadcast(event);
        }
    }

    fn signal_work(&self) {
        self.work_available.notify_one();
    }

    /// Wait until work may have become available
    pub async fn wait_for_work(&self) {
        self.work_available.notified().await;
    }

    /// Apply `event` to trade `id` and restore queue order
    fn transition(&self, id: &str, event: TradeEvent) -> Result<QueuedTrade, QueueError> {
        let mut trades = self.trades.lock();
        let trade = trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        trade.apply(event)?;
        let updated = trade.clone();
        trades.sort_by_key(queue_order);
        Ok(updated)
    }

    /// Validate and queue a new trade
    pub fn enqueue(&self, req: NewTradeRequest) -> Result<QueuedTrade, QueueError> {
        validate(&req)?;

        let trade = QueuedTrade::new(uuid::Uuid::new_v4().to_string(), req, self.default_max_retries);
        log::info!(
            "[TradeQueue] Queuing {} {} {} {} ({} priority) as {}",
            trade.kind,
            trade.side,
            trade.amount,
            trade.symbol,
            trade.priority,
            trade.id
        );

        {
            let mut trades = self.trades.lock();
            trades.push(trade.clone());
            trades.sort_by_key(queue_order);
        }

        self.emit(DexEvent::TradeQueued(trade.clone()));
        self.signal_work();
        Ok(trade)
    }

    pub fn get(&self, id: &str) -> Option<QueuedTrade> {
        self.trades.lock().iter().find(|t| t.id == id).cloned()
    }

    /// All trades in queue order
    pub fn list(&self) -> Vec<QueuedTrade> {
        self.trades.lock().clone()
    }

    pub fn list_by_status(&self, status: TradeStatus) -> Vec<QueuedTrade> {
        self.trades
            .lock()
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        let trades = self.trades.lock();
        let mut stats = QueueStats {
            total: trades.len(),
            ..Default::default()
        };
        for trade in trades.iter() {
            match trade.status {
                TradeStatus::Pending => stats.pending += 1,
                TradeStatus::Processing => stats.processing += 1,
                TradeStatus::Completed => stats.completed += 1,
                TradeStatus::Failed => stats.failed += 1,
                TradeStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    pub fn has_pending(&self) -> bool {
        self.trades
            .lock()
            .iter()
            .any(|t| t.status == TradeStatus::Pending)
    }

    pub fn count(&self) -> usize {
        self.trades.lock().len()
    }

    /// Move the highest-priority pending trade to `processing`.
    ///
    /// Returns `None` if nothing is pending or another trade is already processing.
    pub fn start_next(&self) -> Option<QueuedTrade> {
        let mut trades = self.trades.lock();
        if trades.iter().any(|t| t.status == TradeStatus::Processing) {
            return None;
        }

        let trade = trades.iter_mut().find(|t| t.status == TradeStatus::Pending)?;
        if let Err(e) = trade.apply(TradeEvent::Start) {
            log::error!("[TradeQueue] Failed to start {}: {}", trade.id, e);
            return None;
        }
        let started = trade.clone();
        trades.sort_by_key(queue_order);
        drop(trades);

        log::info!("[TradeQueue] Processing {} ({})", started.id, started.symbol);
        self.emit(DexEvent::TradeStarted {
            id: started.id.clone(),
        });
        Some(started)
    }

    /// Record the step a processing trade has reached
    pub fn set_step(&self, id: &str, step: ExecutionStep) -> bool {
        let mut trades = self.trades.lock();
        let Some(trade) = trades
            .iter_mut()
            .find(|t| t.id == id && t.status == TradeStatus::Processing)
        else {
            return false;
        };
        trade.current_step = Some(step);
        drop(trades);

        log::debug!("[TradeQueue] {} -> {}", id, step);
        self.emit(DexEvent::TradeStep {
            id: id.to_string(),
            step,
        });
        true
    }

    /// Mark a processing trade completed
    pub fn complete(&self, id: &str, tx_hash: &str) -> Result<QueuedTrade, QueueError> {
        let trade = self.transition(
            id,
            TradeEvent::Succeed {
                tx_hash: tx_hash.to_string(),
            },
        )?;
        log::info!("[TradeQueue] Trade {} completed ({})", id, tx_hash);
        self.emit(DexEvent::TradeCompleted(trade.clone()));
        self.signal_work();
        Ok(trade)
    }

    /// Record a failed attempt. The returned trade has `next_retry_at` set when
    /// an automatic retry should be scheduled.
    pub fn fail(&self, id: &str, error: &str) -> Result<QueuedTrade, QueueError> {
        let retry_at = Utc::now()
            + chrono::Duration::from_std(self.retry_delay).unwrap_or(chrono::Duration::zero());
        let trade = self.transition(
            id,
            TradeEvent::Fail {
                error: error.to_string(),
                retry_at,
            },
        )?;

        if trade.awaiting_retry() {
            log::warn!(
                "[TradeQueue] Trade {} failed (attempt {}/{}): {}. Retrying in {:?}",
                id,
                trade.retry_count,
                trade.max_retries,
                error,
                self.retry_delay
            );
            self.emit(DexEvent::TradeRetryScheduled(trade.clone()));
        } else {
            log::warn!(
                "[TradeQueue] Trade {} failed permanently after {} attempts: {}",
                id,
                trade.retry_count,
                error
            );
            self.emit(DexEvent::TradeFailed(trade.clone()));
        }
        self.signal_work();
        Ok(trade)
    }

    /// Put a trade interrupted mid-step back to `pending` without using a retry
    pub fn interrupt(&self, id: &str) -> Result<QueuedTrade, QueueError> {
        let trade = self.transition(id, TradeEvent::Interrupt)?;
        log::info!("[TradeQueue] Trade {} interrupted, back to pending", id);
        self.emit(DexEvent::TradeInterrupted { id: id.to_string() });
        Ok(trade)
    }

    /// Re-queue a failed trade whose retry delay elapsed. Returns false if the
    /// trade was removed, cancelled, or is otherwise no longer waiting.
    pub fn retry(&self, id: &str) -> bool {
        match self.transition(id, TradeEvent::Retry) {
            Ok(_) => {
                log::info!("[TradeQueue] Trade {} re-queued for retry", id);
                self.signal_work();
                true
            }
            Err(e) => {
                log::debug!("[TradeQueue] Skipping retry of {}: {}", id, e);
                false
            }
        }
    }

    /// Cancel a pending trade (or a failed one waiting to retry)
    pub fn cancel(&self, id: &str) -> Result<QueuedTrade, QueueError> {
        let trade = {
            let mut trades = self.trades.lock();
            let trade = trades
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
            if trade.status == TradeStatus::Processing {
                return Err(QueueError::Processing(id.to_string()));
            }
            trade.apply(TradeEvent::Cancel)?;
            let cancelled = trade.clone();
            trades.sort_by_key(queue_order);
            cancelled
        };
        log::info!("[TradeQueue] Trade {} cancelled", id);
        self.emit(DexEvent::TradeCancelled { id: id.to_string() });
        Ok(trade)
    }

    /// Delete a trade. Not allowed while it is processing.
    pub fn remove(&self, id: &str) -> Result<QueuedTrade, QueueError> {
        let mut trades = self.trades.lock();
        let index = trades
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        if trades[index].status == TradeStatus::Processing {
            return Err(QueueError::Processing(id.to_string()));
        }
        let removed = trades.remove(index);
        drop(trades);

        log::info!("[TradeQueue] Removed trade {}", id);
        self.emit(DexEvent::TradeRemoved { id: id.to_string() });
        Ok(removed)
    }

    /// Drop every completed and cancelled trade
    pub fn clear_completed(&self) -> usize {
        let mut trades = self.trades.lock();
        let before = trades.len();
        trades.retain(|t| !matches!(t.status, TradeStatus::Completed | TradeStatus::Cancelled));
        before - trades.len()
    }

    /// Evict terminal trades created more than `max_age` ago. Pending and
    /// processing trades, and failed trades waiting to retry, are never evicted.
    pub fn cleanup_old(&self, max_age: Duration) -> usize {
        let cutoff =
            Utc::now() - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        let mut trades = self.trades.lock();
        let before = trades.len();
        trades.retain(|t| !(t.is_terminal() && t.created_at < cutoff));
        let count = before - trades.len();
        drop(trades);

        if count > 0 {
            log::info!("[TradeQueue] Cleaned up {} old trades", count);
            self.emit(DexEvent::QueueSwept { removed: count });
        }
        count
    }
}
