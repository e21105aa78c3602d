//! Shared types for the DEX trade queue, transaction history and security checklist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =====================================================
// Trade Queue
// =====================================================

/// Order kind of a queued trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderKind {
    /// Whether this kind needs a limit price
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderKind::Limit | OrderKind::StopLimit)
    }

    /// Whether this kind needs a stop (trigger) price
    pub fn requires_stop_price(&self) -> bool {
        matches!(self, OrderKind::Stop | OrderKind::StopLimit)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Stop => write!(f, "stop"),
            OrderKind::StopLimit => write!(f, "stop_limit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn is_long(&self) -> bool {
        matches!(self, TradeSide::Buy)
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// Queue priority. Higher rank is executed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TradePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TradePriority {
    pub fn rank(&self) -> u8 {
        match self {
            TradePriority::Low => 0,
            TradePriority::Medium => 1,
            TradePriority::High => 2,
            TradePriority::Urgent => 3,
        }
    }
}

impl fmt::Display for TradePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradePriority::Low => write!(f, "low"),
            TradePriority::Medium => write!(f, "medium"),
            TradePriority::High => write!(f, "high"),
            TradePriority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Status of a queued trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Waiting to be picked up by the queue worker
    Pending,
    /// Currently executing (at most one trade at a time)
    Processing,
    /// Executed and confirmed
    Completed,
    /// Last attempt failed. Terminal once retries are exhausted.
    Failed,
    /// Cancelled by the user before execution
    Cancelled,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Pending => write!(f, "pending"),
            TradeStatus::Processing => write!(f, "processing"),
            TradeStatus::Completed => write!(f, "completed"),
            TradeStatus::Failed => write!(f, "failed"),
            TradeStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TradeStatus::Pending),
            "processing" => Ok(TradeStatus::Processing),
            "completed" => Ok(TradeStatus::Completed),
            "failed" => Ok(TradeStatus::Failed),
            "cancelled" => Ok(TradeStatus::Cancelled),
            _ => Err(format!("Unknown trade status: {}", s)),
        }
    }
}

/// Named steps a trade goes through while processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStep {
    Validate,
    CheckBalance,
    EstimateGas,
    Submit,
    WaitForConfirmation,
}

impl ExecutionStep {
    /// Steps in execution order
    pub const ALL: [ExecutionStep; 5] = [
        ExecutionStep::Validate,
        ExecutionStep::CheckBalance,
        ExecutionStep::EstimateGas,
        ExecutionStep::Submit,
        ExecutionStep::WaitForConfirmation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExecutionStep::Validate => "Validating order",
            ExecutionStep::CheckBalance => "Checking balance",
            ExecutionStep::EstimateGas => "Estimating gas",
            ExecutionStep::Submit => "Submitting transaction",
            ExecutionStep::WaitForConfirmation => "Waiting for confirmation",
        }
    }
}

impl fmt::Display for ExecutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Request body for queueing a trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTradeRequest {
    pub kind: OrderKind,
    pub side: TradeSide,
    pub symbol: String,
    pub amount: f64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stop_price: Option<f64>,
    #[serde(default)]
    pub priority: TradePriority,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Per-status counts of the queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

// =====================================================
// Transaction History
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Deposit,
    Withdraw,
    PoolDeposit,
    PoolWithdraw,
    Approve,
    OpenPosition,
    ClosePosition,
    /// Testnet faucet mint
    Mint,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Deposit => write!(f, "deposit"),
            TxType::Withdraw => write!(f, "withdraw"),
            TxType::PoolDeposit => write!(f, "pool_deposit"),
            TxType::PoolWithdraw => write!(f, "pool_withdraw"),
            TxType::Approve => write!(f, "approve"),
            TxType::OpenPosition => write!(f, "open_position"),
            TxType::ClosePosition => write!(f, "close_position"),
            TxType::Mint => write!(f, "mint"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxRecordStatus {
    Pending,
    Success,
    Failed,
}

impl fmt::Display for TxRecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxRecordStatus::Pending => write!(f, "pending"),
            TxRecordStatus::Success => write!(f, "success"),
            TxRecordStatus::Failed => write!(f, "failed"),
        }
    }
}

// =====================================================
// Security Checklist
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Failed,
    Warning,
}

/// Result of a single security check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityCheckResult {
    pub id: String,
    pub name: String,
    pub outcome: CheckOutcome,
    pub message: String,
    pub critical: bool,
}

/// Composite result of a checklist run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    pub checks: Vec<SecurityCheckResult>,
    /// Passed checks as a rounded percentage of all checks
    pub score: u8,
    /// True when every critical check passed
    pub is_valid: bool,
    pub checked_at: DateTime<Utc>,
}
