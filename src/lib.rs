pub mod bootstrap;
pub mod config;
pub mod error;
pub mod execution;
pub mod orchestrator;
pub mod orderbook;
pub mod swap;
pub mod wallet;
