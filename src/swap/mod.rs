pub mod client;
pub mod models;

pub use client::{ActionOutcome, CndClient, SwapService};
pub use models::{Action, ActionKind, Asset, Field, Role, Swap, SwapEntity, SwapId, SwapStatus};
