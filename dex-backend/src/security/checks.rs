//! Individual security checks run by the checklist

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use trade_queue_types::CheckOutcome;

use crate::domain_types::DomainEthAddress;
use crate::wallet::WalletState;

/// What a check gets to look at
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub wallet: WalletState,
    /// Chain id the backend expects the wallet to be on
    pub expected_chain_id: u64,
}

/// One independent validation. Checks never block each other; a failing
/// check only lowers the score (and validity, if critical).
#[async_trait]
pub trait SecurityCheck: Send + Sync {
    /// Stable identifier, used in reports
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// A failed critical check makes the whole report invalid
    fn critical(&self) -> bool;

    async fn run(&self, ctx: &CheckContext) -> (CheckOutcome, String);
}

pub struct WalletConnectedCheck;

#[async_trait]
impl SecurityCheck for WalletConnectedCheck {
    fn id(&self) -> &str {
        "wallet_connected"
    }

    fn name(&self) -> &str {
        "Wallet connected"
    }

    fn critical(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &CheckContext) -> (CheckOutcome, String) {
        if ctx.wallet.connected {
            (CheckOutcome::Passed, "Wallet is connected".to_string())
        } else {
            (CheckOutcome::Failed, "No wallet connected".to_string())
        }
    }
}

pub struct AddressFormatCheck;

#[async_trait]
impl SecurityCheck for AddressFormatCheck {
    fn id(&self) -> &str {
        "address_format"
    }

    fn name(&self) -> &str {
        "Address format"
    }

    fn critical(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &CheckContext) -> (CheckOutcome, String) {
        let Some(address) = ctx.wallet.address.as_deref() else {
            return (CheckOutcome::Failed, "No wallet address".to_string());
        };
        match DomainEthAddress::parse(address) {
            Ok(_) => (CheckOutcome::Passed, "Valid Ethereum address".to_string()),
            Err(e) => (CheckOutcome::Failed, format!("Invalid address: {}", e)),
        }
    }
}

pub struct NetworkCheck;

#[async_trait]
impl SecurityCheck for NetworkCheck {
    fn id(&self) -> &str {
        "network"
    }

    fn name(&self) -> &str {
        "Network"
    }

    fn critical(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &CheckContext) -> (CheckOutcome, String) {
        match ctx.wallet.chain_id {
            Some(id) if id == ctx.expected_chain_id => {
                (CheckOutcome::Passed, format!("Connected to chain {}", id))
            }
            Some(id) => (
                CheckOutcome::Failed,
                format!("Wrong network: chain {}, expected {}", id, ctx.expected_chain_id),
            ),
            None => (CheckOutcome::Failed, "Network unknown".to_string()),
        }
    }
}

/// Source of the current gas price, in gwei
#[async_trait]
pub trait GasPriceSource: Send + Sync {
    async fn gas_price_gwei(&self) -> Result<f64, String>;
}

/// Random reading between `min` and `max` gwei
pub struct SimulatedGasPrice {
    pub min: f64,
    pub max: f64,
}

impl Default for SimulatedGasPrice {
    fn default() -> Self {
        Self { min: 5.0, max: 80.0 }
    }
}

#[async_trait]
impl GasPriceSource for SimulatedGasPrice {
    async fn gas_price_gwei(&self) -> Result<f64, String> {
        if self.max <= self.min {
            return Ok(self.min);
        }
        Ok(rand::thread_rng().gen_range(self.min..self.max))
    }
}

/// Always reports the same price
pub struct FixedGasPrice(pub f64);

#[async_trait]
impl GasPriceSource for FixedGasPrice {
    async fn gas_price_gwei(&self) -> Result<f64, String> {
        Ok(self.0)
    }
}

/// Warns when gas is expensive. Never fails.
pub struct GasLevelCheck {
    source: Arc<dyn GasPriceSource>,
    warning_gwei: f64,
}

impl GasLevelCheck {
    pub fn new(source: Arc<dyn GasPriceSource>, warning_gwei: f64) -> Self {
        Self {
            source,
            warning_gwei,
        }
    }
}

#[async_trait]
impl SecurityCheck for GasLevelCheck {
    fn id(&self) -> &str {
        "gas_level"
    }

    fn name(&self) -> &str {
        "Gas price"
    }

    fn critical(&self) -> bool {
        false
    }

    async fn run(&self, _ctx: &CheckContext) -> (CheckOutcome, String) {
        match self.source.gas_price_gwei().await {
            Ok(gwei) if gwei > self.warning_gwei => (
                CheckOutcome::Warning,
                format!("High gas price: {:.1} gwei", gwei),
            ),
            Ok(gwei) => (CheckOutcome::Passed, format!("Gas price normal: {:.1} gwei", gwei)),
            Err(e) => (CheckOutcome::Warning, format!("Could not read gas price: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(connected: bool, address: Option<&str>, chain_id: Option<u64>) -> CheckContext {
        CheckContext {
            wallet: WalletState {
                connected,
                address: address.map(str::to_string),
                chain_id,
            },
            expected_chain_id: 11155111,
        }
    }

    #[tokio::test]
    async fn test_wallet_connected() {
        let (outcome, _) = WalletConnectedCheck.run(&ctx(true, None, None)).await;
        assert_eq!(outcome, CheckOutcome::Passed);
        let (outcome, msg) = WalletConnectedCheck.run(&ctx(false, None, None)).await;
        assert_eq!(outcome, CheckOutcome::Failed);
        assert_eq!(msg, "No wallet connected");
    }

    #[tokio::test]
    async fn test_address_format() {
        let good = ctx(true, Some("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"), None);
        assert_eq!(AddressFormatCheck.run(&good).await.0, CheckOutcome::Passed);

        let short = ctx(true, Some("0x1234"), None);
        let (outcome, msg) = AddressFormatCheck.run(&short).await;
        assert_eq!(outcome, CheckOutcome::Failed);
        assert!(msg.contains("40 hex characters"));

        assert_eq!(AddressFormatCheck.run(&ctx(true, None, None)).await.0, CheckOutcome::Failed);
    }

    #[tokio::test]
    async fn test_network() {
        assert_eq!(NetworkCheck.run(&ctx(true, None, Some(11155111))).await.0, CheckOutcome::Passed);
        let (outcome, msg) = NetworkCheck.run(&ctx(true, None, Some(1))).await;
        assert_eq!(outcome, CheckOutcome::Failed);
        assert!(msg.contains("expected 11155111"));
        assert_eq!(NetworkCheck.run(&ctx(false, None, None)).await.0, CheckOutcome::Failed);
    }

    #[tokio::test]
    async fn test_gas_level_warns_above_threshold() {
        let cheap = GasLevelCheck::new(Arc::new(FixedGasPrice(20.0)), 50.0);
        assert_eq!(cheap.run(&ctx(true, None, None)).await.0, CheckOutcome::Passed);

        let pricey = GasLevelCheck::new(Arc::new(FixedGasPrice(75.5)), 50.0);
        let (outcome, msg) = pricey.run(&ctx(true, None, None)).await;
        assert_eq!(outcome, CheckOutcome::Warning);
        assert_eq!(msg, "High gas price: 75.5 gwei");
        assert!(!pricey.critical());
    }

    #[tokio::test]
    async fn test_simulated_gas_in_range() {
        let source = SimulatedGasPrice { min: 10.0, max: 20.0 };
        for _ in 0..20 {
            let gwei = source.gas_price_gwei().await.unwrap();
            assert!((10.0..20.0).contains(&gwei));
        }
    }
}
