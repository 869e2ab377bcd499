use thiserror::Error;

use crate::swap::models::SwapId;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Swap service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Swap error: {0}")]
    Swap(#[from] SwapError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Offer error: {0}")]
    Offer(#[from] OfferError),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Remote swap service errors (transport and response shape)
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Swap service returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Malformed swap service response: {0}")]
    Malformed(String),
}

/// Contract violations by the remote swap service for a single swap
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Swap {swap_id} does not expose a `{action}` action")]
    MissingAction { swap_id: SwapId, action: String },

    #[error("`{action}` on swap {swap_id} was acknowledged without a ledger instruction")]
    MissingInstruction { swap_id: SwapId, action: String },

    #[error("Unknown ledger instruction type: {0}")]
    UnknownInstruction(String),

    #[error("Malformed `{kind}` payload: {message}")]
    MalformedInstruction { kind: String, message: String },
}

/// Ledger dispatch errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Network mismatch on {ledger}: instruction targets {instruction}, wallet is on {wallet}")]
    NetworkMismatch {
        ledger: String,
        instruction: String,
        wallet: String,
    },

    #[error("Invalid amount `{0}`")]
    InvalidAmount(String),

    #[error("Invalid gas limit `{0}`")]
    InvalidGasLimit(String),

    #[error("Wallet operation failed on {ledger}: {message}")]
    WalletFailed { ledger: String, message: String },
}

/// Offer creation errors
#[derive(Error, Debug)]
pub enum OfferError {
    #[error("Offering to sell {sell} to buy {buy} is not supported")]
    Unsupported { sell: String, buy: String },

    #[error("Amount {0} cannot be expressed in the smallest unit")]
    InvalidAmount(String),
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Service(ServiceError::Transport(format!("{:?}", error)))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Service(ServiceError::Malformed(error.to_string()))
    }
}

impl From<rust_decimal::Error> for AppError {
    fn from(error: rust_decimal::Error) -> Self {
        AppError::InvalidInput(format!("Decimal conversion error: {:?}", error))
    }
}

impl From<hex::FromHexError> for AppError {
    fn from(error: hex::FromHexError) -> Self {
        AppError::InvalidInput(format!("Invalid hex: {}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl AppError {
    /// Whether the failure is a remote-service contract violation rather
    /// than something a later tick can fix on its own
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            AppError::Swap(_) | AppError::Service(ServiceError::Malformed(_))
        )
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
