//! Background task that keeps the security report fresh while a wallet is connected

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::checklist::SecurityChecklist;
use crate::wallet::{WalletSession, WalletState};

/// Re-runs the checklist whenever the wallet connects (or changes address or
/// chain while connected) and every `interval` while it stays connected.
///
/// Each run is spawned on its own task, so a slow run never delays the next one.
pub async fn run_security_monitor(
    checklist: Arc<SecurityChecklist>,
    wallet: Arc<WalletSession>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    log::info!("[Security] Monitor started (interval: {:?})", interval);
    let mut wallet_rx = wallet.subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_state = WalletState::default();

    loop {
        let state = wallet_rx.borrow_and_update().clone();
        if state.connected && state != last_state {
            spawn_run(&checklist, state.clone());
            ticker.reset();
        }
        last_state = state;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = wallet_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick(), if last_state.connected => {
                spawn_run(&checklist, last_state.clone());
            }
        }
    }

    log::info!("[Security] Monitor stopped");
}

fn spawn_run(checklist: &Arc<SecurityChecklist>, state: WalletState) {
    let checklist = checklist.clone();
    tokio::spawn(async move {
        checklist.run(&state).await;
    });
}
