// Swap lifecycle orchestration
pub mod config;
pub mod engine;
pub mod events;
pub mod trading;

pub use config::{OrchestratorConfig, TickPolicy};
pub use engine::{AcceptPredicate, OrchestratorHandle, SwapOrchestrator, TickReport, Wallets};
pub use events::SwapEvent;
