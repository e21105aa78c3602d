use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Sepolia testnet
pub const DEFAULT_CHAIN_ID: u64 = 11155111;

/// Storage key of the persisted transaction history blob
pub const TX_HISTORY_STORAGE_KEY: &str = "dex_transaction_history";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Chain id the wallet must be connected to
    pub chain_id: u64,
    pub tx_history_max_records: usize,
    pub queue: QueueConfig,
    pub security: SecurityConfig,
    pub contracts: ContractAddresses,
}

/// Trade queue timings and retry policy
#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub default_max_retries: u32,
    pub retry_delay: Duration,
    /// Delay before the worker starts draining newly queued work
    pub drain_delay: Duration,
    pub sweep_interval: Duration,
    /// Terminal trades older than this are evicted by the sweeper
    pub retention: Duration,
    pub step_delay_min: Duration,
    pub step_delay_max: Duration,
    /// Probability of a simulated failure at the submit step
    pub failure_rate: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_max_retries: 3,
            retry_delay: Duration::from_secs(5),
            drain_delay: Duration::from_millis(1000),
            sweep_interval: Duration::from_secs(60),
            retention: Duration::from_secs(30 * 60),
            step_delay_min: Duration::from_millis(500),
            step_delay_max: Duration::from_millis(1500),
            failure_rate: 0.1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    pub check_interval: Duration,
    /// Gas readings above this many gwei produce a warning
    pub gas_warning_gwei: f64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            gas_warning_gwei: 50.0,
        }
    }
}

/// Deployed contract addresses (hex strings, validated when used)
#[derive(Clone, Debug)]
pub struct ContractAddresses {
    pub token: String,
    pub vault: String,
    pub pool: String,
    pub position_manager: String,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            token: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238".to_string(),
            vault: "0x0000000000000000000000000000000000000001".to_string(),
            pool: "0x0000000000000000000000000000000000000002".to_string(),
            position_manager: "0x0000000000000000000000000000000000000003".to_string(),
        }
    }
}

/// Read an env var and parse it, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("{} has an invalid value '{}', using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "./.db/dex.db".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            tx_history_max_records: 100,
            queue: QueueConfig::default(),
            security: SecurityConfig::default(),
            contracts: ContractAddresses::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let queue_defaults = QueueConfig::default();
        let security_defaults = SecurityConfig::default();
        let contract_defaults = ContractAddresses::default();

        let step_delay_min_ms = env_or(
            "TRADE_STEP_DELAY_MIN_MS",
            queue_defaults.step_delay_min.as_millis() as u64,
        );
        let step_delay_max_ms = env_or(
            "TRADE_STEP_DELAY_MAX_MS",
            queue_defaults.step_delay_max.as_millis() as u64,
        )
        .max(step_delay_min_ms);

        Self {
            port: env_or("PORT", 8080),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "./.db/dex.db".to_string()),
            chain_id: env_or("CHAIN_ID", DEFAULT_CHAIN_ID),
            tx_history_max_records: env_or("TX_HISTORY_MAX_RECORDS", 100),
            queue: QueueConfig {
                default_max_retries: env_or("TRADE_MAX_RETRIES", queue_defaults.default_max_retries),
                retry_delay: Duration::from_secs(env_or(
                    "TRADE_RETRY_DELAY_SECS",
                    queue_defaults.retry_delay.as_secs(),
                )),
                drain_delay: Duration::from_millis(env_or(
                    "TRADE_DRAIN_DELAY_MS",
                    queue_defaults.drain_delay.as_millis() as u64,
                )),
                sweep_interval: Duration::from_secs(env_or(
                    "QUEUE_SWEEP_INTERVAL_SECS",
                    queue_defaults.sweep_interval.as_secs(),
                )),
                retention: Duration::from_secs(
                    env_or("QUEUE_RETENTION_MINS", queue_defaults.retention.as_secs() / 60) * 60,
                ),
                step_delay_min: Duration::from_millis(step_delay_min_ms),
                step_delay_max: Duration::from_millis(step_delay_max_ms),
                failure_rate: env_or("TRADE_FAILURE_RATE", queue_defaults.failure_rate)
                    .clamp(0.0, 1.0),
            },
            security: SecurityConfig {
                check_interval: Duration::from_secs(env_or(
                    "SECURITY_CHECK_INTERVAL_SECS",
                    security_defaults.check_interval.as_secs(),
                )),
                gas_warning_gwei: env_or("GAS_WARNING_GWEI", security_defaults.gas_warning_gwei),
            },
            contracts: ContractAddresses {
                token: env::var("TOKEN_ADDRESS").unwrap_or(contract_defaults.token),
                vault: env::var("VAULT_ADDRESS").unwrap_or(contract_defaults.vault),
                pool: env::var("POOL_ADDRESS").unwrap_or(contract_defaults.pool),
                position_manager: env::var("POSITION_MANAGER_ADDRESS")
                    .unwrap_or(contract_defaults.position_manager),
            },
        }
    }
}
