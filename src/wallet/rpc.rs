use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Minimal JSON-RPC client shared by the node-backed wallets
pub struct JsonRpcClient {
    url: String,
    auth: Option<(String, String)>,
    version: &'static str,
    next_id: AtomicU64,
    client: reqwest::Client,
}

impl JsonRpcClient {
    /// bitcoind speaks JSON-RPC 1.0 behind basic auth
    pub fn bitcoind(url: String, user: String, password: String) -> Self {
        Self {
            url,
            auth: Some((user, password)),
            version: "1.0",
            next_id: AtomicU64::new(1),
            client: reqwest::Client::new(),
        }
    }

    pub fn ethereum(url: String) -> Self {
        Self {
            url,
            auth: None,
            version: "2.0",
            next_id: AtomicU64::new(1),
            client: reqwest::Client::new(),
        }
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> AppResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": self.version,
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some((user, password)) = &self.auth {
            request = request.basic_auth(user, Some(password));
        }

        let response: RpcResponse<T> = request.send().await?.json().await?;
        debug!("JSON-RPC {} #{} answered", method, id);

        if let Some(error) = response.error {
            return Err(AppError::Wallet(format!(
                "{} failed ({}): {}",
                method, error.code, error.message
            )));
        }

        response
            .result
            .ok_or_else(|| AppError::Wallet(format!("{} returned no result", method)))
    }
}

/// Parse a quantity given either as decimal or `0x`-prefixed hex
pub fn parse_quantity(raw: &str) -> Option<u128> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => u128::from_str_radix(hex, 16).ok(),
        Some(_) => None,
        None => raw.parse::<u128>().ok(),
    }
}

pub fn to_hex_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}
