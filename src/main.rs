use swap_orchestrator::{bootstrap, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,swap_orchestrator=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting swap orchestrator");

    let config = Config::from_env()?;
    let session = bootstrap::initialize_session(&config).await?;

    bootstrap::run_demo_trade(&session).await?;

    info!("⏳ Running until Ctrl-C");
    tokio::signal::ctrl_c().await?;

    session.stop();
    Ok(())
}
