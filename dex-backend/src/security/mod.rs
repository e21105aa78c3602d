//! Security checklist
//!
//! A fixed battery of independent checks against the wallet session. Each run
//! produces a [`SecurityReport`](trade_queue_types::SecurityReport) with a
//! score and an overall validity flag, published on the event bus.

mod checklist;
mod checks;
mod monitor;

pub use checklist::SecurityChecklist;
#[cfg(test)]
pub use checks::FixedGasPrice;
pub use checks::SimulatedGasPrice;
pub use monitor::run_security_monitor;
