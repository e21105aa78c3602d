//! Background workers for the trade queue
//!
//! - drain worker: single consumer that executes pending trades while the
//!   wallet is connected
//! - sweeper: periodic eviction of old terminal trades

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::executor::{ExecutionResult, TradeExecutor, execute_trade};
use super::manager::TradeQueueManager;
use crate::config::QueueConfig;
use crate::wallet::WalletSession;

/// Spawn the drain worker and the sweeper. Both stop when `shutdown` is cancelled.
pub fn spawn_queue_workers(
    queue: Arc<TradeQueueManager>,
    executor: Arc<dyn TradeExecutor>,
    wallet: Arc<WalletSession>,
    config: QueueConfig,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let drain = tokio::spawn(run_drain_worker(
        queue.clone(),
        executor,
        wallet,
        config.drain_delay,
        shutdown.clone(),
    ));
    let sweeper = tokio::spawn(run_sweeper(
        queue,
        config.sweep_interval,
        config.retention,
        shutdown,
    ));
    vec![drain, sweeper]
}

/// Waits for pending work and a connected wallet, then drains the queue one
/// trade at a time.
pub async fn run_drain_worker(
    queue: Arc<TradeQueueManager>,
    executor: Arc<dyn TradeExecutor>,
    wallet: Arc<WalletSession>,
    drain_delay: Duration,
    shutdown: CancellationToken,
) {
    log::info!("[TradeQueue] Drain worker started");
    let mut wallet_rx = wallet.subscribe();

    loop {
        if !(queue.has_pending() && wallet.is_connected()) {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = queue.wait_for_work() => {}
                changed = wallet_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            continue;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(drain_delay) => {}
        }

        drain(&queue, executor.as_ref(), &wallet, &shutdown).await;
    }

    log::info!("[TradeQueue] Drain worker stopped");
}

/// Execute pending trades until none remain or the wallet disconnects
async fn drain(
    queue: &Arc<TradeQueueManager>,
    executor: &dyn TradeExecutor,
    wallet: &WalletSession,
    shutdown: &CancellationToken,
) {
    let cancel = shutdown.child_token();

    // Trip `cancel` as soon as the wallet disconnects
    let mut wallet_rx = wallet.subscribe();
    let watcher_cancel = cancel.clone();
    let watcher = tokio::spawn(async move {
        loop {
            if !wallet_rx.borrow_and_update().connected {
                watcher_cancel.cancel();
                return;
            }
            tokio::select! {
                _ = watcher_cancel.cancelled() => return,
                changed = wallet_rx.changed() => {
                    if changed.is_err() {
                        watcher_cancel.cancel();
                        return;
                    }
                }
            }
        }
    });

    let mut processed = 0usize;
    while !cancel.is_cancelled() && wallet.is_connected() {
        let Some(trade) = queue.start_next() else {
            break;
        };

        let result = execute_trade(executor, queue, &trade, &cancel).await;
        let applied = match result {
            ExecutionResult::Completed { tx_hash } => {
                queue.complete(&trade.id, &tx_hash).map(|_| ())
            }
            ExecutionResult::Failed(error) => queue.fail(&trade.id, &error).map(|updated| {
                if updated.awaiting_retry() {
                    schedule_retry(queue.clone(), updated.id.clone(), queue.retry_delay());
                }
            }),
            ExecutionResult::Interrupted => queue.interrupt(&trade.id).map(|_| ()),
        };
        if let Err(e) = applied {
            log::error!("[TradeQueue] Failed to record result for {}: {}", trade.id, e);
        }
        processed += 1;
    }

    if cancel.is_cancelled() {
        log::info!("[TradeQueue] Draining halted after {} trade(s)", processed);
    } else if processed > 0 {
        log::debug!("[TradeQueue] Drained {} trade(s)", processed);
    }

    cancel.cancel();
    let _ = watcher.await;
}

/// Re-queue a failed trade after `delay`
fn schedule_retry(queue: Arc<TradeQueueManager>, id: String, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        queue.retry(&id);
    });
}

/// Evicts terminal trades older than `retention` every `interval`
pub async fn run_sweeper(
    queue: Arc<TradeQueueManager>,
    interval: Duration,
    retention: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick fires immediately; skip it
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                queue.cleanup_old(retention);
            }
        }
    }
}
