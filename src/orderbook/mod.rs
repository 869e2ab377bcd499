pub mod book;
pub mod models;

pub use book::{match_offers, OrderBook};
pub use models::{Coin, CoinType, Offer};
