pub mod dedup;
pub mod dispatcher;
pub mod fields;
pub mod instruction;

pub use dedup::{ActionLedger, Claim};
pub use dispatcher::LedgerDispatcher;
pub use fields::{FeeRateProvider, FieldResolver, StaticFeeRate};
pub use instruction::{Ledger, LedgerInstruction};
