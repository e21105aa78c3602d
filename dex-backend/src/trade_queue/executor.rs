//! Trade execution
//!
//! A trade runs through the fixed sequence of [`ExecutionStep`]s. Each step is
//! raced against a cancellation token so a wallet disconnect stops the trade
//! mid-step rather than after the step completes.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trade_queue_types::ExecutionStep;

use super::manager::TradeQueueManager;
use super::types::QueuedTrade;
use crate::config::QueueConfig;

/// Runs individual execution steps for a trade
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Execute one step. The submit step returns the transaction hash.
    async fn execute_step(
        &self,
        trade: &QueuedTrade,
        step: ExecutionStep,
    ) -> Result<Option<String>, String>;
}

/// Errors the simulated submit step picks from
const SIMULATED_ERRORS: &[&str] = &[
    "Network congestion, transaction not accepted",
    "Gas estimation failed",
    "Transaction underpriced",
    "Nonce too low",
];

/// Executor with randomized step latency and randomized failure at submit
pub struct SimulatedExecutor {
    step_delay_min: Duration,
    step_delay_max: Duration,
    failure_rate: f64,
}

impl SimulatedExecutor {
    pub fn new(step_delay_min: Duration, step_delay_max: Duration, failure_rate: f64) -> Self {
        Self {
            step_delay_min,
            step_delay_max: step_delay_max.max(step_delay_min),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.step_delay_min, config.step_delay_max, config.failure_rate)
    }

    fn random_delay(&self) -> Duration {
        if self.step_delay_max == self.step_delay_min {
            return self.step_delay_min;
        }
        let mut rng = rand::thread_rng();
        rng.gen_range(self.step_delay_min..=self.step_delay_max)
    }
}

#[async_trait]
impl TradeExecutor for SimulatedExecutor {
    async fn execute_step(
        &self,
        trade: &QueuedTrade,
        step: ExecutionStep,
    ) -> Result<Option<String>, String> {
        let delay = self.random_delay();
        tokio::time::sleep(delay).await;

        if step != ExecutionStep::Submit {
            return Ok(None);
        }

        let (failed, error, hash) = {
            let mut rng = rand::thread_rng();
            let failed = rng.gen_bool(self.failure_rate);
            let error = SIMULATED_ERRORS[rng.gen_range(0..SIMULATED_ERRORS.len())];
            let hash: [u8; 32] = rng.r#gen();
            (failed, error, hash)
        };

        if failed {
            log::debug!("[TradeQueue] Simulated submit failure for {}: {}", trade.id, error);
            return Err(error.to_string());
        }
        Ok(Some(format!("0x{}", hex::encode(hash))))
    }
}

/// How one execution attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Completed { tx_hash: String },
    Failed(String),
    /// Cancelled before all steps finished
    Interrupted,
}

/// Run every step of `trade` in order, reporting progress to `queue`.
/// Does not change the trade's status; the caller applies the result.
pub async fn execute_trade(
    executor: &dyn TradeExecutor,
    queue: &TradeQueueManager,
    trade: &QueuedTrade,
    cancel: &CancellationToken,
) -> ExecutionResult {
    let mut tx_hash = None;

    for step in ExecutionStep::ALL {
        if cancel.is_cancelled() {
            return ExecutionResult::Interrupted;
        }
        queue.set_step(&trade.id, step);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ExecutionResult::Interrupted,
            outcome = executor.execute_step(trade, step) => outcome,
        };

        match outcome {
            Ok(Some(hash)) => tx_hash = Some(hash),
            Ok(None) => {}
            Err(e) => return ExecutionResult::Failed(e),
        }
    }

    ExecutionResult::Completed {
        tx_hash: tx_hash.unwrap_or_default(),
    }
}
