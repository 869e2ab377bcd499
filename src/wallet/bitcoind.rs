use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::execution::instruction::Ledger;
use crate::wallet::rpc::JsonRpcClient;
use crate::wallet::{BitcoinWallet, TxReceipt};

const SATS_PER_BTC: i64 = 100_000_000;

#[derive(Debug, Clone)]
pub struct BitcoindConfig {
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: String,
    pub network: String,
}

/// Bitcoin wallet backed by a bitcoind node wallet over JSON-RPC
pub struct BitcoindWallet {
    network: String,
    rpc: JsonRpcClient,
}

impl BitcoindWallet {
    pub fn new(config: BitcoindConfig) -> Self {
        info!("Bitcoin wallet on {} via {}", config.network, config.rpc_url);
        Self {
            network: config.network,
            rpc: JsonRpcClient::bitcoind(config.rpc_url, config.rpc_user, config.rpc_password),
        }
    }

    fn sats_to_btc(sats: u64) -> AppResult<Decimal> {
        let sats = i64::try_from(sats)
            .map_err(|_| AppError::InvalidInput(format!("{} sats out of range", sats)))?;
        Ok(Decimal::new(sats, 8))
    }

    fn btc_to_sats(btc: Decimal) -> AppResult<u64> {
        (btc * Decimal::from(SATS_PER_BTC))
            .trunc()
            .to_u64()
            .ok_or_else(|| AppError::Wallet(format!("Balance {} BTC out of range", btc)))
    }
}

#[async_trait]
impl BitcoinWallet for BitcoindWallet {
    fn network(&self) -> &str {
        &self.network
    }

    async fn get_address(&self) -> AppResult<String> {
        self.rpc.call("getnewaddress", json!(["", "bech32"])).await
    }

    async fn get_balance(&self) -> AppResult<u64> {
        let btc: Decimal = self.rpc.call("getbalance", json!([])).await?;
        Self::btc_to_sats(btc)
    }

    async fn send_to_address(&self, address: &str, sats: u64, network: &str) -> AppResult<TxReceipt> {
        let btc = Self::sats_to_btc(sats)?;
        debug!("sendtoaddress {} {} BTC on {}", address, btc, network);

        let tx_id: String = self
            .rpc
            .call("sendtoaddress", json!([address, btc.to_string()]))
            .await?;

        Ok(TxReceipt {
            ledger: Ledger::Bitcoin,
            tx_id,
        })
    }

    async fn broadcast_transaction(&self, hex: &str, network: &str) -> AppResult<TxReceipt> {
        // Refuse garbage before it reaches the node
        hex::decode(hex)?;
        debug!("sendrawtransaction on {} ({} bytes)", network, hex.len() / 2);

        let tx_id: String = self.rpc.call("sendrawtransaction", json!([hex])).await?;

        Ok(TxReceipt {
            ledger: Ledger::Bitcoin,
            tx_id,
        })
    }
}
