use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppResult;
use crate::swap::models::Field;
use crate::wallet::{BitcoinWallet, EthereumWallet};

/// Source of the Bitcoin fee rate handed to the swap service
#[async_trait]
pub trait FeeRateProvider: Send + Sync {
    /// Fee per weight unit, in satoshi
    async fn fee_per_wu(&self) -> AppResult<u64>;
}

/// Constant fee rate. Fine for regtest, a real deployment should plug in
/// a fee estimator.
pub struct StaticFeeRate(pub u64);

#[async_trait]
impl FeeRateProvider for StaticFeeRate {
    async fn fee_per_wu(&self) -> AppResult<u64> {
        Ok(self.0)
    }
}

/// FieldResolver - turns the class tags of an action field into a
/// concrete value from the wallets
pub struct FieldResolver {
    bitcoin: Arc<dyn BitcoinWallet>,
    ethereum: Arc<dyn EthereumWallet>,
    fee_rate: Arc<dyn FeeRateProvider>,
}

impl FieldResolver {
    pub fn new(
        bitcoin: Arc<dyn BitcoinWallet>,
        ethereum: Arc<dyn EthereumWallet>,
        fee_rate: Arc<dyn FeeRateProvider>,
    ) -> Self {
        Self {
            bitcoin,
            ethereum,
            fee_rate,
        }
    }

    /// `Ok(None)` means no mapping exists for this tag combination
    pub async fn resolve(&self, field: &Field) -> AppResult<Option<String>> {
        let value = if field.has_class("bitcoin") && field.has_class("address") {
            Some(self.bitcoin.get_address().await?)
        } else if field.has_class("ethereum") && field.has_class("address") {
            Some(self.ethereum.get_account().await?)
        } else if field.has_class("bitcoin")
            && (field.has_class("feePerWU") || field.has_class("feePerByte"))
        {
            Some(self.fee_rate.fee_per_wu().await?.to_string())
        } else {
            None
        };

        match &value {
            Some(v) => debug!("Resolved field {} {:?} -> {}", field.name, field.classes, v),
            None => debug!("No value for field {} {:?}", field.name, field.classes),
        }

        Ok(value)
    }

    /// Resolve every field of an action, keeping only those with a value
    pub async fn resolve_all(&self, fields: &[Field]) -> AppResult<HashMap<String, String>> {
        let mut values = HashMap::new();
        for field in fields {
            if let Some(value) = self.resolve(field).await? {
                values.insert(field.name.clone(), value);
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::dispatcher::mocks::{MockBitcoinWallet, MockEthereumWallet};

    fn resolver() -> FieldResolver {
        FieldResolver::new(
            Arc::new(MockBitcoinWallet::new("regtest")),
            Arc::new(MockEthereumWallet::new()),
            Arc::new(StaticFeeRate(150)),
        )
    }

    fn field(name: &str, classes: &[&str]) -> Field {
        Field {
            name: name.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_bitcoin_address() {
        let value = resolver()
            .resolve(&field("alpha_ledger_redeem_identity", &["address", "bitcoin"]))
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("bcrt1qmockaddress"));
    }

    #[tokio::test]
    async fn test_ethereum_address_and_fee() {
        let resolver = resolver();
        let account = resolver
            .resolve(&field("beta_ledger_refund_identity", &["ethereum", "address"]))
            .await
            .unwrap();
        assert_eq!(
            account.as_deref(),
            Some("0x00a329c0648769a73afac7f9381e08fb43dbea72")
        );

        let fee = resolver
            .resolve(&field("fee_per_wu", &["bitcoin", "feePerWU"]))
            .await
            .unwrap();
        assert_eq!(fee.as_deref(), Some("150"));

        let fee = resolver
            .resolve(&field("fee_per_byte", &["bitcoin", "feePerByte"]))
            .await
            .unwrap();
        assert_eq!(fee.as_deref(), Some("150"));
    }

    #[tokio::test]
    async fn test_unrecognized_tags_resolve_to_none() {
        let resolver = resolver();
        assert_eq!(resolver.resolve(&field("x", &["ethereum"])).await.unwrap(), None);
        assert_eq!(resolver.resolve(&field("y", &[])).await.unwrap(), None);

        let values = resolver
            .resolve_all(&[field("x", &["ethereum"]), field("addr", &["bitcoin", "address"])])
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert!(values.contains_key("addr"));
    }
}
