use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::OfferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    Bitcoin,
    Ether,
}

impl CoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinType::Bitcoin => "bitcoin",
            CoinType::Ether => "ether",
        }
    }

    /// Decimal places between the display unit and the smallest unit
    pub fn decimals(&self) -> u32 {
        match self {
            CoinType::Bitcoin => 8,
            CoinType::Ether => 18,
        }
    }

    /// Ledger the coin lives on
    pub fn ledger_name(&self) -> &'static str {
        match self {
            CoinType::Bitcoin => "bitcoin",
            CoinType::Ether => "ethereum",
        }
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Amount of a coin in display units (BTC, ETH)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub coin: CoinType,
    pub amount: Decimal,
}

impl Coin {
    pub fn new(coin: CoinType, amount: Decimal) -> Self {
        Self { coin, amount }
    }

    /// Quantity in satoshi / wei as the swap service expects it, rounded
    /// to the smallest unit
    pub fn to_base_units(&self) -> Result<String, OfferError> {
        let scale = Decimal::from(10u64.pow(self.coin.decimals()));
        let units = self
            .amount
            .round_dp(self.coin.decimals())
            .checked_mul(scale)
            .ok_or_else(|| OfferError::InvalidAmount(self.amount.to_string()))?;

        if units <= Decimal::ZERO {
            return Err(OfferError::InvalidAmount(self.amount.to_string()));
        }

        Ok(units.trunc().normalize().to_string())
    }
}

/// A maker's standing offer: sell `sell_coin` in exchange for `buy_coin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub sell_coin: Coin,
    pub buy_coin: Coin,
    pub maker_peer_id: String,
    pub maker_peer_address: String,
}

impl Offer {
    /// Units of `buy_coin` asked per unit of `sell_coin`
    pub fn rate(&self) -> Option<Decimal> {
        self.buy_coin.amount.checked_div(self.sell_coin.amount)
    }
}
