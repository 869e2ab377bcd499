use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::execution::fields::StaticFeeRate;
use crate::orchestrator::{OrchestratorConfig, OrchestratorHandle, SwapEvent, SwapOrchestrator, Wallets};
use crate::orderbook::{Coin, CoinType, OrderBook};
use crate::swap::client::CndClient;
use crate::swap::models::Swap;
use crate::wallet::bitcoind::{BitcoindConfig, BitcoindWallet};
use crate::wallet::web3::{Web3Config, Web3Wallet};

/// Maker and taker parties wired to their swap services and wallets
pub struct Session {
    pub maker: Arc<SwapOrchestrator>,
    pub taker: Arc<SwapOrchestrator>,
    pub order_book: Arc<OrderBook>,
    handles: Vec<OrchestratorHandle>,
}

impl Session {
    /// Stop both polling loops
    pub fn stop(self) {
        for handle in self.handles {
            handle.stop();
        }
        info!("🛑 Orchestrators stopped");
    }
}

pub async fn initialize_session(config: &Config) -> AppResult<Session> {
    info!("Initializing swap parties ...");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    spawn_event_logger(events_rx);

    let orchestrator_config = OrchestratorConfig::from_config(config);

    let taker = Arc::new(
        party(
            "taker",
            config,
            &config.taker_cnd_url,
            config.taker_ethereum_account.clone(),
            orchestrator_config.clone(),
        )
        .with_events(events_tx.clone()),
    );
    let maker = Arc::new(
        party(
            "maker",
            config,
            &config.maker_cnd_url,
            config.maker_ethereum_account.clone(),
            orchestrator_config,
        )
        .with_events(events_tx),
    );

    // Taker first so it is already polling when the maker answers
    let handles = vec![taker.clone().start(), maker.clone().start()];

    info!("✅ Taker peer id: {}", taker.peer_id().await?);
    info!("✅ Maker peer id: {}", maker.peer_id().await?);

    Ok(Session {
        maker,
        taker,
        order_book: Arc::new(OrderBook::new()),
        handles,
    })
}

fn party(
    name: &str,
    config: &Config,
    cnd_url: &str,
    ethereum_account: Option<String>,
    orchestrator_config: OrchestratorConfig,
) -> SwapOrchestrator {
    let wallets = Wallets {
        bitcoin: Arc::new(BitcoindWallet::new(BitcoindConfig {
            rpc_url: config.bitcoind_rpc_url.clone(),
            rpc_user: config.bitcoind_rpc_user.clone(),
            rpc_password: config.bitcoind_rpc_password.clone(),
            network: config.bitcoin_network.clone(),
        })),
        ethereum: Arc::new(Web3Wallet::new(Web3Config {
            rpc_url: config.ethereum_rpc_url.clone(),
            network: config.ethereum_network.clone(),
            account: ethereum_account,
        })),
    };

    let client = CndClient::new(cnd_url);
    info!("🔗 [{}] Swap service at {}", name, client.base_url());

    SwapOrchestrator::new(
        name,
        orchestrator_config,
        Arc::new(client),
        wallets,
        Arc::new(StaticFeeRate(config.bitcoin_fee_per_wu)),
        Arc::new(|_swap: &Swap| true),
    )
}

/// Maker sells 9 ether for 1 bitcoin, taker finds the offer and
/// requests the swap
pub async fn run_demo_trade(session: &Session) -> AppResult<()> {
    let offer = session
        .maker
        .create_offer(
            Coin::new(CoinType::Ether, dec!(9)),
            Coin::new(CoinType::Bitcoin, dec!(1)),
        )
        .await?;
    session.order_book.add_offer(offer).await;
    info!("📒 Order book holds {} offer(s)", session.order_book.len().await);

    let found = session
        .order_book
        .find_offers(CoinType::Ether, CoinType::Bitcoin, dec!(9))
        .await;

    match found.first() {
        Some(offer) => {
            let swap_id = session.taker.take_offer(offer).await?;
            info!("🤝 Taker requested swap {}", swap_id);
        }
        None => warn!("⚠️ No matching offer in the order book"),
    }

    Ok(())
}

fn spawn_event_logger(mut events: mpsc::UnboundedReceiver<SwapEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!("📨 Swap event: {}", json),
                Err(_) => info!("📨 Swap event for {}", event.swap_id()),
            }
        }
    });
}
