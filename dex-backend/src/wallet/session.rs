use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Snapshot of the wallet connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub connected: bool,
    pub address: Option<String>,
    pub chain_id: Option<u64>,
}

pub struct WalletSession {
    state: watch::Sender<WalletState>,
}

impl WalletSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(WalletState::default());
        Self { state }
    }

    /// Mark the wallet connected. The address is stored as given; format
    /// problems are reported by the security checklist, not rejected here.
    pub fn connect(&self, address: &str, chain_id: u64) {
        log::info!("[Wallet] Connected {} on chain {}", address, chain_id);
        self.state.send_replace(WalletState {
            connected: true,
            address: Some(address.trim().to_string()),
            chain_id: Some(chain_id),
        });
    }

    pub fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }
        log::info!("[Wallet] Disconnected");
        self.state.send_replace(WalletState::default());
    }

    /// Update the chain id of a connected wallet. No-op while disconnected.
    pub fn switch_chain(&self, chain_id: u64) -> bool {
        let mut switched = false;
        self.state.send_if_modified(|state| {
            if state.connected && state.chain_id != Some(chain_id) {
                log::info!("[Wallet] Switched to chain {}", chain_id);
                state.chain_id = Some(chain_id);
                switched = true;
            }
            switched
        });
        switched
    }

    pub fn state(&self) -> WalletState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn address(&self) -> Option<String> {
        self.state.borrow().address.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state.subscribe()
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}
