//! Priority trade queue
//!
//! Trades are queued with a priority, drained one at a time by a background
//! worker while the wallet is connected, retried after a delay on failure and
//! evicted by a periodic sweeper once they are old and terminal.

mod executor;
mod manager;
mod types;
mod worker;

pub use executor::SimulatedExecutor;
pub use manager::{QueueError, TradeQueueManager};
pub use types::QueuedTrade;
pub use worker::spawn_queue_workers;
