//! Checklist runner and report scoring

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use trade_queue_types::{CheckOutcome, SecurityCheckResult, SecurityReport};

use super::checks::{
    AddressFormatCheck, CheckContext, GasLevelCheck, GasPriceSource, NetworkCheck,
    SecurityCheck, WalletConnectedCheck,
};
use crate::config::SecurityConfig;
use crate::gateway::{DexEvent, EventBroadcaster};
use crate::wallet::WalletState;

/// Combine check results into a report.
///
/// Score is passed checks as a rounded percentage. Warnings count against the
/// score but not against validity, which needs every critical check passed.
pub fn build_report(checks: Vec<SecurityCheckResult>) -> SecurityReport {
    let total = checks.len();
    let passed = checks
        .iter()
        .filter(|c| c.outcome == CheckOutcome::Passed)
        .count();
    let score = if total == 0 {
        0
    } else {
        ((passed as f64 / total as f64) * 100.0).round() as u8
    };
    let is_valid = checks
        .iter()
        .filter(|c| c.critical)
        .all(|c| c.outcome == CheckOutcome::Passed);

    SecurityReport {
        checks,
        score,
        is_valid,
        checked_at: Utc::now(),
    }
}

/// Runs every registered check and keeps the most recent report
pub struct SecurityChecklist {
    checks: Vec<Arc<dyn SecurityCheck>>,
    expected_chain_id: u64,
    latest: RwLock<Option<SecurityReport>>,
    broadcaster: Option<Arc<EventBroadcaster>>,
}

impl SecurityChecklist {
    pub fn new(expected_chain_id: u64) -> Self {
        Self {
            checks: Vec::new(),
            expected_chain_id,
            latest: RwLock::new(None),
            broadcaster: None,
        }
    }

    /// Checklist with the standard battery: wallet connected, address format,
    /// network and gas level
    pub fn with_default_checks(
        expected_chain_id: u64,
        config: &SecurityConfig,
        gas_source: Arc<dyn GasPriceSource>,
    ) -> Self {
        let mut checklist = Self::new(expected_chain_id);
        checklist.register(Arc::new(WalletConnectedCheck));
        checklist.register(Arc::new(AddressFormatCheck));
        checklist.register(Arc::new(NetworkCheck));
        checklist.register(Arc::new(GasLevelCheck::new(gas_source, config.gas_warning_gwei)));
        checklist
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<EventBroadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn register(&mut self, check: Arc<dyn SecurityCheck>) {
        log::debug!("[Security] Registered check '{}'", check.id());
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run all checks against `wallet`, store and publish the report.
    ///
    /// Runs are independent; when two overlap, whichever finishes last becomes
    /// the latest report.
    pub async fn run(&self, wallet: &WalletState) -> SecurityReport {
        let ctx = CheckContext {
            wallet: wallet.clone(),
            expected_chain_id: self.expected_chain_id,
        };

        let mut results = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            let (outcome, message) = check.run(&ctx).await;
            if outcome != CheckOutcome::Passed {
                log::debug!("[Security] {} -> {:?}: {}", check.id(), outcome, message);
            }
            results.push(SecurityCheckResult {
                id: check.id().to_string(),
                name: check.name().to_string(),
                outcome,
                message,
                critical: check.critical(),
            });
        }

        let report = build_report(results);
        if report.is_valid {
            log::info!("[Security] Checklist passed (score {})", report.score);
        } else {
            log::warn!("[Security] Checklist failed (score {})", report.score);
        }

        *self.latest.write() = Some(report.clone());
        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.broadcast(DexEvent::SecurityReport(report.clone()));
        }
        report
    }

    pub fn latest(&self) -> Option<SecurityReport> {
        self.latest.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::checks::FixedGasPrice;

    const ADDR: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    fn result(id: &str, outcome: CheckOutcome, critical: bool) -> SecurityCheckResult {
        SecurityCheckResult {
            id: id.to_string(),
            name: id.to_string(),
            outcome,
            message: String::new(),
            critical,
        }
    }

    fn checklist(gwei: f64) -> SecurityChecklist {
        SecurityChecklist::with_default_checks(
            11155111,
            &SecurityConfig::default(),
            Arc::new(FixedGasPrice(gwei)),
        )
    }

    fn connected(chain_id: u64) -> WalletState {
        WalletState {
            connected: true,
            address: Some(ADDR.to_string()),
            chain_id: Some(chain_id),
        }
    }

    #[test]
    fn test_score_and_validity_mixed() {
        let report = build_report(vec![
            result("a", CheckOutcome::Passed, true),
            result("b", CheckOutcome::Passed, true),
            result("c", CheckOutcome::Warning, false),
        ]);
        assert_eq!(report.score, 67);
        assert!(report.is_valid);

        let report = build_report(vec![
            result("a", CheckOutcome::Passed, true),
            result("b", CheckOutcome::Failed, true),
            result("c", CheckOutcome::Passed, false),
            result("d", CheckOutcome::Passed, false),
        ]);
        assert_eq!(report.score, 75);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(Vec::new());
        assert_eq!(report.score, 0);
        assert!(report.is_valid);
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let checklist = checklist(10.0);
        assert_eq!(checklist.len(), 4);
        assert!(checklist.latest().is_none());

        let report = checklist.run(&connected(11155111)).await;
        assert_eq!(report.score, 100);
        assert!(report.is_valid);
        assert_eq!(checklist.latest().unwrap().score, 100);
    }

    #[tokio::test]
    async fn test_gas_warning_keeps_report_valid() {
        let report = checklist(120.0).run(&connected(11155111)).await;
        assert_eq!(report.score, 75);
        assert!(report.is_valid);
        let gas = report.checks.iter().find(|c| c.id == "gas_level").unwrap();
        assert_eq!(gas.outcome, CheckOutcome::Warning);
    }

    #[tokio::test]
    async fn test_wrong_network_invalidates() {
        let report = checklist(10.0).run(&connected(1)).await;
        assert!(!report.is_valid);
        assert_eq!(report.score, 75);
    }

    #[tokio::test]
    async fn test_disconnected_wallet() {
        let report = checklist(10.0).run(&WalletState::default()).await;
        assert!(!report.is_valid);
        // only the gas check passes
        assert_eq!(report.score, 25);
    }

    #[tokio::test]
    async fn test_report_is_published() {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let checklist = checklist(10.0).with_broadcaster(broadcaster.clone());
        checklist.run(&connected(11155111)).await;

        let events = broadcaster.get_recent_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.name(), "security_report");
    }
}
