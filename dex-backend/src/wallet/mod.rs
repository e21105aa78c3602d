//! Wallet session
//!
//! Tracks whether the user's wallet is connected, and with which address and
//! chain. Background tasks (trade drain worker, security monitor) subscribe to
//! state changes instead of polling.

mod session;

pub use session::{WalletSession, WalletState};
