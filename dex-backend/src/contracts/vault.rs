use ethers::types::{Address, U256};
use std::sync::Arc;
use trade_queue_types::TxType;

use super::abi;
use super::client::{ChainClient, ContractError};
use crate::config::ContractAddresses;
use crate::domain_types::DomainEthAddress;
use crate::tx_history::{
    NewTransactionRecord, TransactionRecord, TransactionRecordUpdate, TxHistoryStore,
};
use crate::wallet::WalletSession;

/// Decimals of the deposit token and of vault/pool shares
pub const TOKEN_DECIMALS: u8 = 6;

/// Transactions against the vault, the liquidity pool, the position manager
/// and the faucet token.
///
/// Every submitted transaction is recorded in the history as `pending` and
/// updated once its receipt arrives.
pub struct VaultService {
    chain: Arc<dyn ChainClient>,
    history: Arc<TxHistoryStore>,
    wallet: Arc<WalletSession>,
    token: Address,
    vault: Address,
    pool: Address,
    position_manager: Address,
}

impl VaultService {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        history: Arc<TxHistoryStore>,
        wallet: Arc<WalletSession>,
        contracts: &ContractAddresses,
    ) -> Result<Self, ContractError> {
        Ok(Self {
            chain,
            history,
            wallet,
            token: DomainEthAddress::parse(&contracts.token)?.0,
            vault: DomainEthAddress::parse(&contracts.vault)?.0,
            pool: DomainEthAddress::parse(&contracts.pool)?.0,
            position_manager: DomainEthAddress::parse(&contracts.position_manager)?.0,
        })
    }

    /// Approve the vault, then deposit `amount` tokens
    pub async fn deposit(&self, amount: &str) -> Result<TransactionRecord, ContractError> {
        self.approve_and_deposit(self.vault, amount, TxType::Deposit).await
    }

    /// Burn `shares` vault shares for tokens
    pub async fn withdraw(&self, shares: &str) -> Result<TransactionRecord, ContractError> {
        self.withdraw_from(self.vault, shares, TxType::Withdraw).await
    }

    /// Approve the pool, then add `amount` tokens of liquidity
    pub async fn pool_deposit(&self, amount: &str) -> Result<TransactionRecord, ContractError> {
        self.approve_and_deposit(self.pool, amount, TxType::PoolDeposit).await
    }

    pub async fn pool_withdraw(&self, shares: &str) -> Result<TransactionRecord, ContractError> {
        self.withdraw_from(self.pool, shares, TxType::PoolWithdraw).await
    }

    /// Approve `collateral` for the position manager, then open a long or
    /// short position of `size` on `symbol`
    pub async fn open_position(
        &self,
        symbol: &str,
        is_long: bool,
        size: &str,
        collateral: &str,
    ) -> Result<TransactionRecord, ContractError> {
        let user = self.connected_user()?;
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ContractError::InvalidArgument(
                "symbol is required".to_string(),
            ));
        }
        let size_value = abi::parse_amount(size, TOKEN_DECIMALS)?;
        let collateral_value = abi::parse_amount(collateral, TOKEN_DECIMALS)?;

        self.submit(
            TxType::Approve,
            self.token,
            abi::encode_approve(self.position_manager, collateral_value),
            collateral,
            &user,
            None,
        )
        .await?;

        log::info!(
            "[Vault] Opening {} {} position of {} ({} collateral)",
            if is_long { "long" } else { "short" },
            symbol,
            size,
            collateral
        );
        self.submit(
            TxType::OpenPosition,
            self.position_manager,
            abi::encode_open_position(symbol, is_long, size_value, collateral_value),
            collateral,
            &user,
            None,
        )
        .await
    }

    pub async fn close_position(&self, position_id: &str) -> Result<TransactionRecord, ContractError> {
        let user = self.connected_user()?;
        let id = U256::from_dec_str(position_id.trim()).map_err(|e| {
            ContractError::InvalidArgument(format!("position id {}: {}", position_id.trim(), e))
        })?;

        self.submit(
            TxType::ClosePosition,
            self.position_manager,
            abi::encode_close_position(id),
            "0",
            &user,
            None,
        )
        .await
    }

    /// Mint `amount` testnet tokens to the connected wallet
    pub async fn mint(&self, amount: &str) -> Result<TransactionRecord, ContractError> {
        let user = self.connected_user()?;
        let to = DomainEthAddress::parse(&user)?.0;
        let value = abi::parse_amount(amount, TOKEN_DECIMALS)?;

        self.submit(
            TxType::Mint,
            self.token,
            abi::encode_mint(to, value),
            amount,
            &user,
            None,
        )
        .await
    }

    async fn approve_and_deposit(
        &self,
        target: Address,
        amount: &str,
        tx_type: TxType,
    ) -> Result<TransactionRecord, ContractError> {
        let user = self.connected_user()?;
        let value = abi::parse_amount(amount, TOKEN_DECIMALS)?;

        self.submit(
            TxType::Approve,
            self.token,
            abi::encode_approve(target, value),
            amount,
            &user,
            None,
        )
        .await?;

        self.submit(
            tx_type,
            target,
            abi::encode_deposit(value),
            amount,
            &user,
            Some(amount),
        )
        .await
    }

    async fn withdraw_from(
        &self,
        target: Address,
        shares: &str,
        tx_type: TxType,
    ) -> Result<TransactionRecord, ContractError> {
        let user = self.connected_user()?;
        let value: U256 = abi::parse_amount(shares, TOKEN_DECIMALS)?;

        self.submit(
            tx_type,
            target,
            abi::encode_withdraw(value),
            shares,
            &user,
            Some(shares),
        )
        .await
    }

    /// Address of the connected wallet, if it is on the expected chain
    fn connected_user(&self) -> Result<String, ContractError> {
        let state = self.wallet.state();
        let (true, Some(address)) = (state.connected, state.address) else {
            return Err(ContractError::WalletNotConnected);
        };
        let expected = self.chain.chain_id();
        match state.chain_id {
            Some(actual) if actual != expected => {
                Err(ContractError::WrongNetwork { expected, actual })
            }
            _ => Ok(address),
        }
    }

    /// Send one transaction and track it in the history until mined
    async fn submit(
        &self,
        tx_type: TxType,
        to: Address,
        data: Vec<u8>,
        amount: &str,
        user: &str,
        shares: Option<&str>,
    ) -> Result<TransactionRecord, ContractError> {
        let hash = self.chain.send_transaction(to, data).await.map_err(|e| {
            log::warn!("[Vault] {} submission failed: {}", tx_type, e);
            e
        })?;

        let mut record = self
            .history
            .add(NewTransactionRecord::pending(&hash, tx_type, amount, user));
        log::info!("[Vault] {} {} submitted as {}", tx_type, amount, hash);

        let (update, result) = match self.chain.wait_for_receipt(&hash).await {
            Ok(receipt) if receipt.success => (
                TransactionRecordUpdate {
                    shares: shares.map(str::to_string),
                    ..TransactionRecordUpdate::confirmed(
                        receipt.block_number,
                        &receipt.gas_used.to_string(),
                    )
                },
                Ok(()),
            ),
            Ok(_) => {
                let err = ContractError::Reverted(hash.clone());
                (TransactionRecordUpdate::failed(&err.to_string()), Err(err))
            }
            Err(e) => (TransactionRecordUpdate::failed(&e.to_string()), Err(e)),
        };

        if !self.history.update(&record.id, update.clone()) {
            log::warn!(
                "[Vault] Record {} for {} was evicted before its receipt arrived",
                record.id,
                hash
            );
        }
        record.apply(update);
        match result {
            Ok(()) => {
                log::info!("[Vault] {} {} confirmed", tx_type, hash);
                Ok(record)
            }
            Err(e) => {
                log::warn!("[Vault] {} {} failed: {}", tx_type, hash, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::SimulatedChain;
    use crate::db::MemoryStorage;
    use std::time::Duration;
    use trade_queue_types::TxRecordStatus;

    const USER: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    const CHAIN: u64 = 11155111;

    fn service(failure_rate: f64) -> (VaultService, Arc<TxHistoryStore>, Arc<WalletSession>) {
        service_with_limit(failure_rate, 100)
    }

    fn service_with_limit(
        failure_rate: f64,
        max_records: usize,
    ) -> (VaultService, Arc<TxHistoryStore>, Arc<WalletSession>) {
        let chain = Arc::new(SimulatedChain::new(
            CHAIN,
            Duration::from_millis(100),
            Duration::from_millis(200),
            failure_rate,
        ));
        let history = Arc::new(TxHistoryStore::new(
            Arc::new(MemoryStorage::new()),
            "history",
            max_records,
        ));
        let wallet = Arc::new(WalletSession::new());
        let vault = VaultService::new(
            chain,
            history.clone(),
            wallet.clone(),
            &ContractAddresses::default(),
        )
        .unwrap();
        (vault, history, wallet)
    }

    #[tokio::test(start_paused = true)]
    async fn test_deposit_records_approve_and_deposit() {
        let (vault, history, wallet) = service(0.0);
        wallet.connect(USER, CHAIN);

        let record = vault.deposit("25.5").await.unwrap();
        assert_eq!(record.tx_type, TxType::Deposit);
        assert_eq!(record.status, TxRecordStatus::Success);
        assert_eq!(record.shares.as_deref(), Some("25.5"));
        assert!(record.block_number.is_some());
        assert!(record.gas_used.is_some());

        let all = history.get_for_user(USER);
        assert_eq!(all.len(), 2);
        // newest first
        assert_eq!(all[0].tx_type, TxType::Deposit);
        assert_eq!(all[1].tx_type, TxType::Approve);
        assert!(all.iter().all(|r| r.status == TxRecordStatus::Success));
        assert!(history.get_pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_withdraw_is_recorded_failed() {
        let (vault, history, wallet) = service(1.0);
        wallet.connect(USER, CHAIN);

        let err = vault.pool_withdraw("3").await.unwrap_err();
        assert!(matches!(err, ContractError::Reverted(_)));

        let all = history.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tx_type, TxType::PoolWithdraw);
        assert_eq!(all[0].status, TxRecordStatus::Failed);
        assert!(all[0].error.as_deref().unwrap().contains("reverted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_approve_stops_deposit() {
        let (vault, history, wallet) = service(1.0);
        wallet.connect(USER, CHAIN);

        assert!(vault.pool_deposit("10").await.is_err());
        let all = history.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tx_type, TxType::Approve);
    }

    #[tokio::test]
    async fn test_requires_connected_wallet_on_expected_chain() {
        let (vault, history, wallet) = service(0.0);
        assert_eq!(
            vault.withdraw("1").await.unwrap_err(),
            ContractError::WalletNotConnected
        );

        wallet.connect(USER, 1);
        assert_eq!(
            vault.deposit("1").await.unwrap_err(),
            ContractError::WrongNetwork {
                expected: CHAIN,
                actual: 1
            }
        );
        assert!(history.get_all().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_amount_before_submitting() {
        let (vault, history, wallet) = service(0.0);
        wallet.connect(USER, CHAIN);
        assert!(matches!(
            vault.deposit("-4").await,
            Err(ContractError::InvalidAmount(_))
        ));
        assert!(history.get_all().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_and_close_position() {
        let (vault, history, wallet) = service(0.0);
        wallet.connect(USER, CHAIN);

        let opened = vault.open_position("ETH-USD", true, "2", "150").await.unwrap();
        assert_eq!(opened.tx_type, TxType::OpenPosition);
        assert_eq!(opened.status, TxRecordStatus::Success);
        assert_eq!(opened.amount, "150");

        let closed = vault.close_position("7").await.unwrap();
        assert_eq!(closed.tx_type, TxType::ClosePosition);

        let types: Vec<_> = history.get_all().into_iter().map(|r| r.tx_type).collect();
        assert_eq!(
            types,
            vec![TxType::ClosePosition, TxType::OpenPosition, TxType::Approve]
        );
    }

    #[tokio::test]
    async fn test_position_arguments_validated() {
        let (vault, history, wallet) = service(0.0);
        wallet.connect(USER, CHAIN);

        assert!(matches!(
            vault.open_position("  ", false, "1", "1").await,
            Err(ContractError::InvalidArgument(_))
        ));
        assert!(matches!(
            vault.open_position("ETH-USD", false, "0", "1").await,
            Err(ContractError::InvalidAmount(_))
        ));
        assert!(matches!(
            vault.close_position("seven").await,
            Err(ContractError::InvalidArgument(_))
        ));
        assert!(history.get_all().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mint_to_connected_wallet() {
        let (vault, history, wallet) = service(0.0);
        wallet.connect(USER, CHAIN);

        let record = vault.mint("1000").await.unwrap();
        assert_eq!(record.tx_type, TxType::Mint);
        assert_eq!(record.status, TxRecordStatus::Success);
        assert_eq!(history.get_for_user(USER).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_record_still_reports_receipt() {
        let (vault, history, wallet) = service_with_limit(0.0, 1);
        wallet.connect(USER, CHAIN);
        let vault = Arc::new(vault);

        let task = tokio::spawn({
            let vault = vault.clone();
            async move { vault.withdraw("2").await }
        });
        while history.get_pending().is_empty() {
            tokio::task::yield_now().await;
        }
        // a newer record pushes the in-flight withdrawal out of the history
        history.add(NewTransactionRecord::pending("0xnewer", TxType::Deposit, "1", USER));

        let record = task.await.unwrap().unwrap();
        assert_eq!(record.status, TxRecordStatus::Success);
        assert!(record.block_number.is_some());
        assert!(history.find_by_hash(&record.hash).is_none());
        assert_eq!(history.get_all().len(), 1);
    }
}
