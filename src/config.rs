use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub maker_cnd_url: String,
    pub taker_cnd_url: String,
    pub maker_address_hint: String,
    pub bitcoind_rpc_url: String,
    pub bitcoind_rpc_user: String,
    pub bitcoind_rpc_password: String,
    pub bitcoin_network: String,
    pub ethereum_rpc_url: String,
    pub ethereum_network: String,
    pub maker_ethereum_account: Option<String>,
    pub taker_ethereum_account: Option<String>,
    pub poll_interval_ms: u64,
    pub bitcoin_fee_per_wu: u64,
    pub max_dispatch_attempts: Option<u32>,
    pub serialize_ticks: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            maker_cnd_url: std::env::var("MAKER_CND_URL")
                .unwrap_or_else(|_| "http://localhost:8000/".to_string()),
            taker_cnd_url: std::env::var("TAKER_CND_URL")
                .unwrap_or_else(|_| "http://localhost:8001/".to_string()),
            maker_address_hint: std::env::var("MAKER_ADDRESS_HINT")
                .unwrap_or_else(|_| "/ip4/127.0.0.1/tcp/9940".to_string()),
            bitcoind_rpc_url: std::env::var("BITCOIND_RPC_URL")
                .unwrap_or_else(|_| "http://localhost:18443".to_string()),
            bitcoind_rpc_user: std::env::var("BITCOIND_RPC_USER")
                .unwrap_or_else(|_| "bitcoin".to_string()),
            bitcoind_rpc_password: std::env::var("BITCOIND_RPC_PASSWORD").map_err(|_| {
                config::ConfigError::NotFound("BITCOIND_RPC_PASSWORD".to_string())
            })?,
            bitcoin_network: std::env::var("BITCOIN_NETWORK")
                .unwrap_or_else(|_| "regtest".to_string()),
            ethereum_rpc_url: std::env::var("ETHEREUM_RPC_URL")
                .unwrap_or_else(|_| "http://localhost:8545".to_string()),
            ethereum_network: std::env::var("ETHEREUM_NETWORK")
                .unwrap_or_else(|_| "regtest".to_string()),
            maker_ethereum_account: std::env::var("MAKER_ETHEREUM_ACCOUNT").ok(),
            taker_ethereum_account: std::env::var("TAKER_ETHEREUM_ACCOUNT").ok(),
            poll_interval_ms: parse_var("POLL_INTERVAL_MS")?.unwrap_or(2000),
            bitcoin_fee_per_wu: parse_var("BITCOIN_FEE_PER_WU")?.unwrap_or(150),
            max_dispatch_attempts: parse_var("MAX_DISPATCH_ATTEMPTS")?,
            serialize_ticks: parse_var("SERIALIZE_TICKS")?.unwrap_or(false),
        })
    }
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>, config::ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| config::ConfigError::Message(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(None),
    }
}
