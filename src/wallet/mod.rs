pub mod bitcoind;
pub mod rpc;
pub mod web3;

pub use bitcoind::BitcoindWallet;
pub use web3::Web3Wallet;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppResult;
use crate::execution::instruction::Ledger;

/// What a wallet hands back after submitting a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub ledger: Ledger,
    pub tx_id: String,
}

/// Bitcoin wallet operations the orchestrator relies on.
/// Signing and coin selection stay inside the implementation.
#[async_trait]
pub trait BitcoinWallet: Send + Sync {
    /// Network this wallet signs for, e.g. "regtest"
    fn network(&self) -> &str;

    /// Current receive address
    async fn get_address(&self) -> AppResult<String>;

    /// Confirmed balance in satoshi
    async fn get_balance(&self) -> AppResult<u64>;

    async fn send_to_address(&self, address: &str, sats: u64, network: &str) -> AppResult<TxReceipt>;

    async fn broadcast_transaction(&self, hex: &str, network: &str) -> AppResult<TxReceipt>;
}

/// Ethereum wallet operations the orchestrator relies on
#[async_trait]
pub trait EthereumWallet: Send + Sync {
    fn network(&self) -> &str;

    /// Account used for receiving and signing
    async fn get_account(&self) -> AppResult<String>;

    /// Balance in wei
    async fn get_balance(&self) -> AppResult<u128>;

    async fn deploy_contract(&self, data: &str, amount: u128, gas_limit: u64) -> AppResult<TxReceipt>;

    async fn call_contract(
        &self,
        data: &str,
        contract_address: &str,
        gas_limit: u64,
    ) -> AppResult<TxReceipt>;
}
