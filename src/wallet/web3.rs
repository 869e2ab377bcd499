use async_trait::async_trait;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::execution::instruction::Ledger;
use crate::wallet::rpc::{parse_quantity, to_hex_quantity, JsonRpcClient};
use crate::wallet::{EthereumWallet, TxReceipt};

#[derive(Debug, Clone)]
pub struct Web3Config {
    pub rpc_url: String,
    pub network: String,
    /// Node-managed account to use; first of `eth_accounts` when unset
    pub account: Option<String>,
}

/// Ethereum wallet that lets the node sign with an unlocked account
pub struct Web3Wallet {
    network: String,
    rpc: JsonRpcClient,
    account: OnceCell<String>,
}

impl Web3Wallet {
    pub fn new(config: Web3Config) -> Self {
        info!("Ethereum wallet on {} via {}", config.network, config.rpc_url);
        let account = match config.account {
            Some(account) => OnceCell::new_with(Some(account)),
            None => OnceCell::new(),
        };
        Self {
            network: config.network,
            rpc: JsonRpcClient::ethereum(config.rpc_url),
            account,
        }
    }

    async fn account(&self) -> AppResult<&String> {
        self.account
            .get_or_try_init(|| async {
                let accounts: Vec<String> = self.rpc.call("eth_accounts", json!([])).await?;
                accounts
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::Wallet("Node has no unlocked accounts".to_string()))
            })
            .await
    }
}

#[async_trait]
impl EthereumWallet for Web3Wallet {
    fn network(&self) -> &str {
        &self.network
    }

    async fn get_account(&self) -> AppResult<String> {
        self.account().await.cloned()
    }

    async fn get_balance(&self) -> AppResult<u128> {
        let account = self.account().await?;
        let raw: String = self
            .rpc
            .call("eth_getBalance", json!([account, "latest"]))
            .await?;
        parse_quantity(&raw).ok_or_else(|| AppError::Wallet(format!("Unparseable balance {}", raw)))
    }

    async fn deploy_contract(&self, data: &str, amount: u128, gas_limit: u64) -> AppResult<TxReceipt> {
        let account = self.account().await?;
        debug!("Deploying contract from {} with value {} wei", account, amount);

        let tx_id: String = self
            .rpc
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": account,
                    "data": data,
                    "value": to_hex_quantity(amount),
                    "gas": to_hex_quantity(u128::from(gas_limit)),
                }]),
            )
            .await?;

        Ok(TxReceipt {
            ledger: Ledger::Ethereum,
            tx_id,
        })
    }

    async fn call_contract(
        &self,
        data: &str,
        contract_address: &str,
        gas_limit: u64,
    ) -> AppResult<TxReceipt> {
        let account = self.account().await?;
        debug!("Calling contract {} from {}", contract_address, account);

        let tx_id: String = self
            .rpc
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": account,
                    "to": contract_address,
                    "data": data,
                    "gas": to_hex_quantity(u128::from(gas_limit)),
                }]),
            )
            .await?;

        Ok(TxReceipt {
            ledger: Ledger::Ethereum,
            tx_id,
        })
    }
}
