use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::orderbook::models::{Coin, CoinType, Offer};

/// In-memory order book shared between makers and takers.
/// Matching is advisory: found offers are never removed or partially
/// filled, consumption happens through the swap itself.
pub struct OrderBook {
    offers: Arc<RwLock<Vec<Offer>>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            offers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add_offer(&self, offer: Offer) {
        info!(
            "📒 Offer added: sell {} {} for {} {} (rate {})",
            offer.sell_coin.amount,
            offer.sell_coin.coin,
            offer.buy_coin.amount,
            offer.buy_coin.coin,
            offer.rate().unwrap_or_default()
        );
        self.offers.write().await.push(offer);
    }

    /// Offers that sell `buy_coin` for `sell_coin` with at least
    /// `buy_amount` available, mirrored into the taker's perspective
    pub async fn find_offers(
        &self,
        buy_coin: CoinType,
        sell_coin: CoinType,
        buy_amount: Decimal,
    ) -> Vec<Offer> {
        let offers = self.offers.read().await;
        let found = match_offers(&offers, buy_coin, sell_coin, buy_amount);
        debug!(
            "Found {} offer(s) selling {} {} for {}",
            found.len(),
            buy_amount,
            buy_coin,
            sell_coin
        );
        found
    }

    pub async fn len(&self) -> usize {
        self.offers.read().await.len()
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure matching over a snapshot of offers.
///
/// The maker's rate `buy/sell` is kept: the taker receives exactly
/// `buy_amount` and pays `rate * buy_amount`.
pub fn match_offers(
    offers: &[Offer],
    buy_coin: CoinType,
    sell_coin: CoinType,
    buy_amount: Decimal,
) -> Vec<Offer> {
    if buy_amount <= Decimal::ZERO {
        return Vec::new();
    }

    offers
        .iter()
        .filter(|offer| {
            offer.buy_coin.coin == sell_coin
                && offer.sell_coin.coin == buy_coin
                && offer.sell_coin.amount >= buy_amount
        })
        .filter_map(|offer| {
            // Multiply first so exact rates stay exact
            let pay = offer
                .buy_coin
                .amount
                .checked_mul(buy_amount)?
                .checked_div(offer.sell_coin.amount)?;
            Some(Offer {
                sell_coin: Coin::new(offer.buy_coin.coin, pay),
                buy_coin: Coin::new(offer.sell_coin.coin, buy_amount),
                maker_peer_id: offer.maker_peer_id.clone(),
                maker_peer_address: offer.maker_peer_address.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn offer(sell: Coin, buy: Coin) -> Offer {
        Offer {
            sell_coin: sell,
            buy_coin: buy,
            maker_peer_id: "QmMaker".to_string(),
            maker_peer_address: "/ip4/127.0.0.1/tcp/9940".to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_offers_preserves_rate() {
        let book = OrderBook::new();
        book.add_offer(offer(
            Coin::new(CoinType::Ether, dec!(10)),
            Coin::new(CoinType::Bitcoin, dec!(1)),
        ))
        .await;

        let found = book
            .find_offers(CoinType::Ether, CoinType::Bitcoin, dec!(0.5))
            .await;

        assert_eq!(found.len(), 1);
        // 1 ether : 0.1 bitcoin
        assert_eq!(found[0].sell_coin, Coin::new(CoinType::Bitcoin, dec!(0.05)));
        assert_eq!(found[0].buy_coin, Coin::new(CoinType::Ether, dec!(0.5)));
        assert_eq!(found[0].maker_peer_id, "QmMaker");

        // The stored offer is untouched
        let again = book
            .find_offers(CoinType::Ether, CoinType::Bitcoin, dec!(10))
            .await;
        assert_eq!(again[0].sell_coin, Coin::new(CoinType::Bitcoin, dec!(1)));
        assert_eq!(book.len().await, 1);
    }

    #[test]
    fn test_excludes_insufficient_amount() {
        let offers = vec![offer(
            Coin::new(CoinType::Ether, dec!(10)),
            Coin::new(CoinType::Bitcoin, dec!(1)),
        )];

        assert!(match_offers(&offers, CoinType::Ether, CoinType::Bitcoin, dec!(10.01)).is_empty());
        assert_eq!(
            match_offers(&offers, CoinType::Ether, CoinType::Bitcoin, dec!(10)).len(),
            1
        );
    }

    #[test]
    fn test_unsupported_pairing_is_empty() {
        let offers = vec![offer(
            Coin::new(CoinType::Ether, dec!(10)),
            Coin::new(CoinType::Bitcoin, dec!(1)),
        )];

        assert!(match_offers(&offers, CoinType::Bitcoin, CoinType::Ether, dec!(0.5)).is_empty());
        assert!(match_offers(&offers, CoinType::Ether, CoinType::Ether, dec!(0.5)).is_empty());
        assert!(match_offers(&offers, CoinType::Ether, CoinType::Bitcoin, dec!(0)).is_empty());
    }

    #[test]
    fn test_keeps_insertion_order() {
        let offers = vec![
            offer(
                Coin::new(CoinType::Ether, dec!(10)),
                Coin::new(CoinType::Bitcoin, dec!(1)),
            ),
            offer(
                Coin::new(CoinType::Ether, dec!(20)),
                Coin::new(CoinType::Bitcoin, dec!(1)),
            ),
        ];

        let found = match_offers(&offers, CoinType::Ether, CoinType::Bitcoin, dec!(2));
        assert_eq!(found[0].sell_coin.amount, dec!(0.2));
        assert_eq!(found[1].sell_coin.amount, dec!(0.1));
    }
}
