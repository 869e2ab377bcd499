use serde::Serialize;

use crate::execution::instruction::LedgerInstruction;
use crate::swap::models::{Swap, SwapId};
use crate::wallet::TxReceipt;

/// Observable progress of the swaps this party drives
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SwapEvent {
    Accepted {
        swap_id: SwapId,
    },
    Declined {
        swap_id: SwapId,
    },
    LedgerActionExecuted {
        swap_id: SwapId,
        action: String,
        instruction: LedgerInstruction,
        receipt: TxReceipt,
    },
    /// Emitted once per swap id that reached a terminal status
    Finished {
        swap: Swap,
    },
}

impl SwapEvent {
    pub fn swap_id(&self) -> &SwapId {
        match self {
            SwapEvent::Accepted { swap_id }
            | SwapEvent::Declined { swap_id }
            | SwapEvent::LedgerActionExecuted { swap_id, .. } => swap_id,
            SwapEvent::Finished { swap } => &swap.id,
        }
    }
}
