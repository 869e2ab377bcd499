use std::collections::{HashMap, HashSet};

use crate::execution::instruction::LedgerInstruction;
use crate::swap::models::SwapId;

/// Outcome of trying to claim an instruction for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Caller owns the instruction until it calls `mark_executed` or `release`
    Granted,
    AlreadyExecuted,
    /// Another tick is dispatching it right now
    InFlight,
    /// Failed dispatches reached the configured bound
    Exhausted,
}

/// In-memory record of completed ledger instructions and announced
/// finished swaps. Entries are never removed for the life of the process.
///
/// Keys are canonical serializations of the instruction, so structurally
/// equal instructions seen on different ticks collide.
#[derive(Debug, Default)]
pub struct ActionLedger {
    instructions_executed: HashSet<String>,
    in_flight: HashSet<String>,
    failed_attempts: HashMap<String, u32>,
    swaps_reported: HashSet<SwapId>,
    max_attempts: Option<u32>,
}

impl ActionLedger {
    /// Bound the number of failed dispatches per instruction
    pub fn with_max_attempts(max_attempts: Option<u32>) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn has_executed(&self, instruction: &LedgerInstruction) -> bool {
        self.instructions_executed
            .contains(&instruction.canonical_key())
    }

    pub fn mark_executed(&mut self, instruction: &LedgerInstruction) {
        let key = instruction.canonical_key();
        self.in_flight.remove(&key);
        self.failed_attempts.remove(&key);
        self.instructions_executed.insert(key);
    }

    pub fn has_reported(&self, swap_id: &SwapId) -> bool {
        self.swaps_reported.contains(swap_id)
    }

    /// Returns false if the swap was already reported
    pub fn mark_reported(&mut self, swap_id: SwapId) -> bool {
        self.swaps_reported.insert(swap_id)
    }

    /// Reserve an instruction for dispatch so overlapping ticks cannot
    /// dispatch it twice
    pub fn try_claim(&mut self, instruction: &LedgerInstruction) -> Claim {
        let key = instruction.canonical_key();

        if self.instructions_executed.contains(&key) {
            return Claim::AlreadyExecuted;
        }
        if self.in_flight.contains(&key) {
            return Claim::InFlight;
        }
        if let Some(max) = self.max_attempts {
            if self.failed_attempts.get(&key).copied().unwrap_or(0) >= max {
                return Claim::Exhausted;
            }
        }

        self.in_flight.insert(key);
        Claim::Granted
    }

    /// Give a claimed instruction back after a failed dispatch so a later
    /// tick can retry it. Returns the number of failures so far.
    pub fn release(&mut self, instruction: &LedgerInstruction) -> u32 {
        let key = instruction.canonical_key();
        self.in_flight.remove(&key);
        let attempts = self.failed_attempts.entry(key).or_insert(0);
        *attempts += 1;
        *attempts
    }
}
