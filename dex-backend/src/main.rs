use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod config;
mod contracts;
mod controllers;
mod db;
mod domain_types;
mod gateway;
mod security;
mod trade_queue;
mod tx_history;
mod wallet;

use config::{Config, TX_HISTORY_STORAGE_KEY};
use contracts::{ChainClient, ContractError, SimulatedChain, VaultService};
use db::{Database, KeyValueStorage};
use gateway::EventBroadcaster;
use security::{SecurityChecklist, SimulatedGasPrice};
use trade_queue::{SimulatedExecutor, TradeQueueManager};
use tx_history::TxHistoryStore;
use wallet::WalletSession;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub broadcaster: Arc<EventBroadcaster>,
    pub queue: Arc<TradeQueueManager>,
    pub tx_history: Arc<TxHistoryStore>,
    pub wallet: Arc<WalletSession>,
    pub security: Arc<SecurityChecklist>,
    pub vault: Arc<VaultService>,
}

impl AppState {
    pub fn build(
        config: Config,
        storage: Arc<dyn KeyValueStorage>,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self, ContractError> {
        let broadcaster = Arc::new(EventBroadcaster::new());
        let queue = Arc::new(TradeQueueManager::with_broadcaster(
            &config.queue,
            broadcaster.clone(),
        ));
        let tx_history = Arc::new(TxHistoryStore::new(
            storage,
            TX_HISTORY_STORAGE_KEY,
            config.tx_history_max_records,
        ));
        let wallet = Arc::new(WalletSession::new());
        let security = Arc::new(
            SecurityChecklist::with_default_checks(
                config.chain_id,
                &config.security,
                Arc::new(SimulatedGasPrice::default()),
            )
            .with_broadcaster(broadcaster.clone()),
        );
        let vault = Arc::new(VaultService::new(
            chain,
            tx_history.clone(),
            wallet.clone(),
            &config.contracts,
        )?);

        Ok(Self {
            config,
            broadcaster,
            queue,
            tx_history,
            wallet,
            security,
            vault,
        })
    }

    /// In-memory state with an instant, never-failing chain
    #[cfg(test)]
    pub fn for_tests() -> Self {
        use std::time::Duration;

        let config = Config::default();
        let storage = Arc::new(Database::new(":memory:").unwrap());
        let chain = Arc::new(SimulatedChain::new(
            config.chain_id,
            Duration::ZERO,
            Duration::ZERO,
            0.0,
        ));
        let mut state = Self::build(config, storage, chain).unwrap();
        state.security = Arc::new(
            SecurityChecklist::with_default_checks(
                state.config.chain_id,
                &state.config.security,
                Arc::new(security::FixedGasPrice(10.0)),
            )
            .with_broadcaster(state.broadcaster.clone()),
        );
        state
    }
}

/// Start the queue drain worker, the queue sweeper and the security monitor
fn spawn_background_tasks(state: &AppState, shutdown: &CancellationToken) {
    let executor = Arc::new(SimulatedExecutor::from_config(&state.config.queue));
    trade_queue::spawn_queue_workers(
        state.queue.clone(),
        executor,
        state.wallet.clone(),
        state.config.queue.clone(),
        shutdown.clone(),
    );

    tokio::spawn(security::run_security_monitor(
        state.security.clone(),
        state.wallet.clone(),
        state.config.security.check_interval,
        shutdown.clone(),
    ));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).map_err(|e| {
        std::io::Error::other(format!("Failed to initialize database: {}", e))
    })?;

    let chain = Arc::new(SimulatedChain::new(
        config.chain_id,
        config.queue.step_delay_min,
        config.queue.step_delay_max,
        config.queue.failure_rate,
    ));

    let state = AppState::build(config, Arc::new(db), chain)
        .map_err(|e| std::io::Error::other(format!("Invalid contract configuration: {}", e)))?;
    log::info!(
        "Loaded {} transaction records (max {})",
        state.tx_history.get_all().len(),
        state.tx_history.max_records()
    );

    let shutdown = CancellationToken::new();
    spawn_background_tasks(&state, &shutdown);

    log::info!("Starting DEX backend on port {} (chain {})", port, state.config.chain_id);

    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config_routes)
            .configure(controllers::trades::config)
            .configure(controllers::transactions::config)
            .configure(controllers::wallet::config)
            .configure(controllers::security::config)
            .configure(controllers::vault::config)
            .configure(controllers::positions::config)
            .configure(controllers::events::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    shutdown.cancel();
    log::info!("Server stopped");
    result
}
