use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{AppResult, SwapError};

/// Ledgers a ledger instruction can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ledger {
    Bitcoin,
    Ethereum,
}

impl Ledger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ledger::Bitcoin => "bitcoin",
            Ledger::Ethereum => "ethereum",
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Ledger {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" => Ok(Ledger::Bitcoin),
            "ethereum" => Ok(Ledger::Ethereum),
            other => Err(SwapError::UnknownInstruction(other.to_string())),
        }
    }
}

/// Concrete, ledger-specific operation returned by the swap service after
/// executing a fund or redeem action. The set is closed: anything else is
/// rejected when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LedgerInstruction {
    SendAmountToAddress {
        ledger: Ledger,
        to: String,
        amount: String,
        network: String,
    },
    BroadcastSignedTransaction {
        ledger: Ledger,
        hex: String,
        network: String,
    },
    DeployContract {
        ledger: Ledger,
        data: String,
        amount: String,
        gas_limit: String,
        network: String,
    },
    CallContract {
        ledger: Ledger,
        contract_address: String,
        data: String,
        gas_limit: String,
        network: String,
    },
}

/// Wire shape: `{"type": "bitcoin-send-amount-to-address", "payload": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct RawLedgerAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl RawLedgerAction {
    /// A body is treated as a ledger action when it carries both a type
    /// tag and a payload
    pub fn looks_like(body: &Value) -> bool {
        body.get("type").map(Value::is_string).unwrap_or(false) && body.get("payload").is_some()
    }
}

#[derive(Deserialize)]
struct SendAmountPayload {
    to: String,
    #[serde(deserialize_with = "string_or_number")]
    amount: String,
    network: String,
}

#[derive(Deserialize)]
struct BroadcastPayload {
    hex: String,
    network: String,
}

#[derive(Deserialize)]
struct DeployPayload {
    data: String,
    #[serde(deserialize_with = "string_or_number")]
    amount: String,
    #[serde(alias = "gasLimit", deserialize_with = "string_or_number")]
    gas_limit: String,
    // Ethereum payloads may omit the network
    #[serde(default)]
    network: String,
}

#[derive(Deserialize)]
struct CallPayload {
    #[serde(alias = "contractAddress")]
    contract_address: String,
    data: String,
    #[serde(alias = "gasLimit", deserialize_with = "string_or_number")]
    gas_limit: String,
    #[serde(default)]
    network: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn payload<T: for<'de> Deserialize<'de>>(kind: &str, payload: Value) -> AppResult<T> {
    serde_json::from_value(payload).map_err(|e| {
        SwapError::MalformedInstruction {
            kind: kind.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

impl TryFrom<RawLedgerAction> for LedgerInstruction {
    type Error = crate::error::AppError;

    fn try_from(raw: RawLedgerAction) -> AppResult<Self> {
        let (ledger, operation) = raw
            .kind
            .split_once('-')
            .ok_or_else(|| SwapError::UnknownInstruction(raw.kind.clone()))?;
        let ledger = Ledger::from_str(ledger)
            .map_err(|_| SwapError::UnknownInstruction(raw.kind.clone()))?;

        let instruction = match (ledger, operation) {
            (Ledger::Bitcoin, "send-amount-to-address") => {
                let p: SendAmountPayload = payload(&raw.kind, raw.payload)?;
                LedgerInstruction::SendAmountToAddress {
                    ledger,
                    to: p.to,
                    amount: p.amount,
                    network: p.network,
                }
            }
            (Ledger::Bitcoin, "broadcast-signed-transaction") => {
                let p: BroadcastPayload = payload(&raw.kind, raw.payload)?;
                LedgerInstruction::BroadcastSignedTransaction {
                    ledger,
                    hex: p.hex,
                    network: p.network,
                }
            }
            (Ledger::Ethereum, "deploy-contract") => {
                let p: DeployPayload = payload(&raw.kind, raw.payload)?;
                LedgerInstruction::DeployContract {
                    ledger,
                    data: p.data,
                    amount: p.amount,
                    gas_limit: p.gas_limit,
                    network: p.network,
                }
            }
            (Ledger::Ethereum, "call-contract") => {
                let p: CallPayload = payload(&raw.kind, raw.payload)?;
                LedgerInstruction::CallContract {
                    ledger,
                    contract_address: p.contract_address,
                    data: p.data,
                    gas_limit: p.gas_limit,
                    network: p.network,
                }
            }
            _ => return Err(SwapError::UnknownInstruction(raw.kind).into()),
        };

        Ok(instruction)
    }
}

impl LedgerInstruction {
    /// Decode a response body into an instruction
    pub fn from_json(body: Value) -> AppResult<Self> {
        let raw: RawLedgerAction = serde_json::from_value(body).map_err(|e| {
            SwapError::MalformedInstruction {
                kind: "unknown".to_string(),
                message: e.to_string(),
            }
        })?;
        LedgerInstruction::try_from(raw)
    }

    pub fn ledger(&self) -> Ledger {
        match self {
            LedgerInstruction::SendAmountToAddress { ledger, .. }
            | LedgerInstruction::BroadcastSignedTransaction { ledger, .. }
            | LedgerInstruction::DeployContract { ledger, .. }
            | LedgerInstruction::CallContract { ledger, .. } => *ledger,
        }
    }

    pub fn network(&self) -> &str {
        match self {
            LedgerInstruction::SendAmountToAddress { network, .. }
            | LedgerInstruction::BroadcastSignedTransaction { network, .. }
            | LedgerInstruction::DeployContract { network, .. }
            | LedgerInstruction::CallContract { network, .. } => network,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerInstruction::SendAmountToAddress { .. } => "send-amount-to-address",
            LedgerInstruction::BroadcastSignedTransaction { .. } => "broadcast-signed-transaction",
            LedgerInstruction::DeployContract { .. } => "deploy-contract",
            LedgerInstruction::CallContract { .. } => "call-contract",
        }
    }

    /// Stable textual form used as deduplication key. Object keys are
    /// sorted recursively so equal instructions always give equal keys.
    pub fn canonical_key(&self) -> String {
        match serde_json::to_value(self) {
            Ok(value) => canonical_json(&value),
            // Serializing plain strings and unit enums cannot fail
            Err(_) => format!("{:?}", self),
        }
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let entries: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}
