use std::time::Duration;

use crate::config::Config;

/// How ticks relate to each other when one runs longer than the period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPolicy {
    /// Every period spawns a tick, even if the previous one is still
    /// running. At-most-once dispatch is kept by claiming instructions.
    AllowOverlap,
    /// The timer waits for the running tick to finish
    Serialize,
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub tick_policy: TickPolicy,
    /// Failed dispatches tolerated per instruction, `None` = until the
    /// swap service stops exposing the action
    pub max_dispatch_attempts: Option<u32>,
    pub bitcoin_network: String,
    pub ethereum_network: String,
    /// Address advertised to takers alongside our peer id
    pub address_hint: String,
    /// Expiry of leg A relative to the swap request
    pub alpha_expiry: Duration,
    /// Expiry of leg B relative to the swap request
    pub beta_expiry: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            tick_policy: TickPolicy::AllowOverlap,
            max_dispatch_attempts: None,
            bitcoin_network: "regtest".to_string(),
            ethereum_network: "regtest".to_string(),
            address_hint: "/ip4/127.0.0.1/tcp/9940".to_string(),
            alpha_expiry: Duration::from_secs(7200),
            beta_expiry: Duration::from_secs(3600),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            tick_policy: if config.serialize_ticks {
                TickPolicy::Serialize
            } else {
                TickPolicy::AllowOverlap
            },
            max_dispatch_attempts: config.max_dispatch_attempts,
            bitcoin_network: config.bitcoin_network.clone(),
            ethereum_network: config.ethereum_network.clone(),
            address_hint: config.maker_address_hint.clone(),
            ..Self::default()
        }
    }
}
