use chrono::Utc;
use tracing::info;

use crate::error::{AppResult, OfferError};
use crate::orchestrator::engine::SwapOrchestrator;
use crate::orderbook::models::{Coin, CoinType, Offer};
use crate::swap::models::{Asset, LedgerRef, PeerHint, SwapId, SwapRequest};

impl SwapOrchestrator {
    /// Peer id of the swap service this party talks to
    pub async fn peer_id(&self) -> AppResult<String> {
        Ok(self.service.get_info().await?.id)
    }

    /// Publish an offer as maker. Only selling ether for bitcoin is
    /// supported.
    pub async fn create_offer(&self, sell_coin: Coin, buy_coin: Coin) -> AppResult<Offer> {
        if sell_coin.coin != CoinType::Ether || buy_coin.coin != CoinType::Bitcoin {
            return Err(OfferError::Unsupported {
                sell: sell_coin.coin.to_string(),
                buy: buy_coin.coin.to_string(),
            }
            .into());
        }

        let offer = Offer {
            sell_coin,
            buy_coin,
            maker_peer_id: self.peer_id().await?,
            maker_peer_address: self.config.address_hint.clone(),
        };

        self.offers_made.lock().push(offer.clone());
        info!(
            "📣 [{}] Offer created: sell {} {} for {} {}",
            self.name, sell_coin.amount, sell_coin.coin, buy_coin.amount, buy_coin.coin
        );

        Ok(offer)
    }

    pub fn offers_made(&self) -> Vec<Offer> {
        self.offers_made.lock().clone()
    }

    /// Send a swap request for an offer found in the order book. The
    /// offer is in the taker's perspective: we sell `sell_coin` on leg A
    /// and buy `buy_coin` on leg B.
    pub async fn take_offer(&self, offer: &Offer) -> AppResult<SwapId> {
        info!("[{}] Sending swap request to {}", self.name, offer.maker_peer_id);

        let request = self.swap_request(offer).await?;
        let id = self.service.post_swap(&request).await?;

        info!("✅ [{}] Swap request sent: {}", self.name, id);
        Ok(id)
    }

    async fn swap_request(&self, offer: &Offer) -> AppResult<SwapRequest> {
        let now = Utc::now().timestamp();
        let alpha = &offer.sell_coin;
        let beta = &offer.buy_coin;

        // Our Ethereum account receives on leg B or gets refunds on leg A
        let beta_ledger_redeem_identity = match beta.coin {
            CoinType::Ether => Some(self.wallets.ethereum.get_account().await?),
            CoinType::Bitcoin => None,
        };
        let alpha_ledger_refund_identity = match alpha.coin {
            CoinType::Ether => Some(self.wallets.ethereum.get_account().await?),
            CoinType::Bitcoin => None,
        };

        Ok(SwapRequest {
            alpha_ledger: self.ledger_ref(alpha.coin),
            beta_ledger: self.ledger_ref(beta.coin),
            alpha_asset: Asset {
                name: alpha.coin.to_string(),
                quantity: alpha.to_base_units()?,
            },
            beta_asset: Asset {
                name: beta.coin.to_string(),
                quantity: beta.to_base_units()?,
            },
            alpha_expiry: now + self.config.alpha_expiry.as_secs() as i64,
            beta_expiry: now + self.config.beta_expiry.as_secs() as i64,
            beta_ledger_redeem_identity,
            alpha_ledger_refund_identity,
            peer: PeerHint {
                peer_id: offer.maker_peer_id.clone(),
                address_hint: offer.maker_peer_address.clone(),
            },
        })
    }

    fn ledger_ref(&self, coin: CoinType) -> LedgerRef {
        let network = match coin {
            CoinType::Bitcoin => &self.config.bitcoin_network,
            CoinType::Ether => &self.config.ethereum_network,
        };
        LedgerRef {
            name: coin.ledger_name().to_string(),
            network: network.clone(),
        }
    }
}
