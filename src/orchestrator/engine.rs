use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AppResult, SwapError};
use crate::execution::dedup::{ActionLedger, Claim};
use crate::execution::dispatcher::LedgerDispatcher;
use crate::execution::fields::{FeeRateProvider, FieldResolver};
use crate::execution::instruction::LedgerInstruction;
use crate::orchestrator::config::{OrchestratorConfig, TickPolicy};
use crate::orchestrator::events::SwapEvent;
use crate::orderbook::models::Offer;
use crate::swap::client::{ActionOutcome, SwapService};
use crate::swap::models::{ActionKind, Swap, SwapEntity, SwapId};
use crate::wallet::{BitcoinWallet, EthereumWallet};

/// Decides whether an incoming swap request is accepted
pub type AcceptPredicate = Arc<dyn Fn(&Swap) -> bool + Send + Sync>;

/// Wallets one party signs with
#[derive(Clone)]
pub struct Wallets {
    pub bitcoin: Arc<dyn BitcoinWallet>,
    pub ethereum: Arc<dyn EthereumWallet>,
}

/// What happened to one swap during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    Accepted,
    Declined,
    Executed,
    /// Nothing to do: already executed, in flight, exhausted or busy
    Skipped,
}

/// Per-tick summary, mostly for logs and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub decided: usize,
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub finished: usize,
}

/// SwapOrchestrator - polls the swap service and drives every visible
/// swap forward
///
/// Each tick fetches the listing once, then:
/// - swaps exposing accept/decline get a decision from the predicate
/// - swaps exposing fund/redeem get their ledger instruction dispatched,
///   at most once per distinct instruction
/// - swaps in a terminal status are announced once
pub struct SwapOrchestrator {
    pub(crate) name: String,
    pub(crate) config: OrchestratorConfig,
    pub(crate) service: Arc<dyn SwapService>,
    pub(crate) wallets: Wallets,
    resolver: FieldResolver,
    dispatcher: LedgerDispatcher,
    accept_predicate: AcceptPredicate,
    ledger: Mutex<ActionLedger>,
    busy: Mutex<HashSet<SwapId>>,
    initialized: AtomicBool,
    pub(crate) offers_made: Mutex<Vec<Offer>>,
    events: Option<mpsc::UnboundedSender<SwapEvent>>,
}

/// Handle to a running polling loop
pub struct OrchestratorHandle {
    task: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Cancels the timer only. Ticks already spawned finish on their own.
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Removes the swap from the busy set when work on it ends
struct BusyGuard<'a> {
    busy: &'a Mutex<HashSet<SwapId>>,
    id: SwapId,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.lock().remove(&self.id);
    }
}

/// Holds a granted dispatch claim. Dropped unsettled (the tick was
/// cancelled mid-dispatch) it is released so a later tick can retry.
struct ClaimGuard<'a> {
    ledger: &'a Mutex<ActionLedger>,
    instruction: &'a LedgerInstruction,
    settled: bool,
}

impl ClaimGuard<'_> {
    fn executed(&mut self) {
        self.ledger.lock().mark_executed(self.instruction);
        self.settled = true;
    }

    fn release(&mut self) -> u32 {
        self.settled = true;
        self.ledger.lock().release(self.instruction)
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.ledger.lock().release(self.instruction);
        }
    }
}

impl SwapOrchestrator {
    pub fn new(
        name: impl Into<String>,
        config: OrchestratorConfig,
        service: Arc<dyn SwapService>,
        wallets: Wallets,
        fee_rate: Arc<dyn FeeRateProvider>,
        accept_predicate: AcceptPredicate,
    ) -> Self {
        let resolver = FieldResolver::new(
            wallets.bitcoin.clone(),
            wallets.ethereum.clone(),
            fee_rate,
        );
        let dispatcher = LedgerDispatcher::new(wallets.bitcoin.clone(), wallets.ethereum.clone());
        let ledger = ActionLedger::with_max_attempts(config.max_dispatch_attempts);

        Self {
            name: name.into(),
            config,
            service,
            wallets,
            resolver,
            dispatcher,
            accept_predicate,
            ledger: Mutex::new(ledger),
            busy: Mutex::new(HashSet::new()),
            initialized: AtomicBool::new(false),
            offers_made: Mutex::new(Vec::new()),
            events: None,
        }
    }

    /// Publish swap events on the given channel
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SwapEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start polling in the background
    pub fn start(self: Arc<Self>) -> OrchestratorHandle {
        let period = self.config.poll_interval;
        let policy = self.config.tick_policy;
        info!(
            "⏰ [{}] Polling swap service every {:?} ({:?})",
            self.name, period, policy
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                // Ticks run in their own task so stopping the timer never
                // cancels a dispatch halfway
                let this = self.clone();
                let tick = tokio::spawn(async move { this.run_tick().await });

                if policy == TickPolicy::Serialize {
                    if let Err(e) = tick.await {
                        error!("❌ [{}] Tick task failed: {}", self.name, e);
                    }
                }
            }
        });

        OrchestratorHandle { task }
    }

    async fn run_tick(&self) {
        match self.tick().await {
            Ok(report) => {
                if report != TickReport::default() {
                    debug!("[{}] Tick done: {:?}", self.name, report);
                }
            }
            Err(e) => error!("❌ [{}] Tick aborted: {}", self.name, e),
        }
    }

    /// Record swaps that are already finished so they are not announced
    /// again after a restart
    pub async fn initialize(&self) -> AppResult<usize> {
        let swaps = self.service.get_swaps().await?;

        let mut ledger = self.ledger.lock();
        let count = swaps
            .iter()
            .filter(|s| s.is_finished())
            .filter(|s| ledger.mark_reported(s.id().clone()))
            .count();
        drop(ledger);

        self.initialized.store(true, Ordering::SeqCst);
        info!("✅ [{}] Initialized, {} finished swap(s) already known", self.name, count);
        Ok(count)
    }

    /// One polling round. A listing failure aborts the whole tick, a
    /// failure on one swap only affects that swap.
    #[instrument(skip(self), fields(party = %self.name))]
    pub async fn tick(&self) -> AppResult<TickReport> {
        if !self.initialized.load(Ordering::SeqCst) {
            self.initialize().await?;
        }

        let swaps = self.service.get_swaps().await?;
        let mut report = TickReport::default();

        let decisions: Vec<&SwapEntity> = swaps.iter().filter(|s| s.awaiting_decision()).collect();
        if !decisions.is_empty() {
            info!(
                "[{}] {} new swap(s) waiting for a decision",
                self.name,
                decisions.len()
            );
        }

        let ledger_actions = swaps
            .iter()
            .filter(|s| !s.awaiting_decision() && s.ledger_action().is_some());

        let work = decisions
            .iter()
            .map(|entity| self.guarded(entity, true))
            .chain(ledger_actions.map(|entity| self.guarded(entity, false)));

        for (id, outcome) in join_all(work).await {
            match outcome {
                Ok(SwapOutcome::Accepted) | Ok(SwapOutcome::Declined) => report.decided += 1,
                Ok(SwapOutcome::Executed) => report.executed += 1,
                Ok(SwapOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    if e.is_contract_violation() {
                        error!("❌ [{}] Swap service contract violation on {}: {}", self.name, id, e);
                    } else {
                        warn!("⚠️ [{}] Swap {} will be retried next tick: {}", self.name, id, e);
                    }
                }
            }
        }

        for entity in swaps.iter().filter(|s| s.is_finished()) {
            let newly = self.ledger.lock().mark_reported(entity.id().clone());
            if newly {
                let swap = entity.to_swap();
                info!("🏁 [{}] Swap {} finished: {:?}", self.name, swap.id, swap.status);
                self.emit(SwapEvent::Finished { swap });
                report.finished += 1;
            }
        }

        Ok(report)
    }

    /// Serializes work on the same swap id across overlapping ticks
    async fn guarded(&self, entity: &SwapEntity, decision: bool) -> (SwapId, AppResult<SwapOutcome>) {
        let id = entity.id().clone();

        if !self.busy.lock().insert(id.clone()) {
            debug!("[{}] Swap {} still being worked on", self.name, id);
            return (id, Ok(SwapOutcome::Skipped));
        }
        let _guard = BusyGuard {
            busy: &self.busy,
            id: id.clone(),
        };

        let outcome = if decision {
            self.decide(entity.to_swap()).await
        } else {
            self.perform_ledger_action(&id).await
        };

        (id, outcome)
    }

    #[instrument(skip(self, swap), fields(party = %self.name, swap_id = %swap.id))]
    async fn decide(&self, swap: Swap) -> AppResult<SwapOutcome> {
        let detail = self.service.get_swap(&swap.id).await?;

        if (self.accept_predicate)(&swap) {
            let action = detail
                .find_action(ActionKind::Accept)
                .ok_or_else(|| SwapError::MissingAction {
                    swap_id: swap.id.clone(),
                    action: ActionKind::Accept.to_string(),
                })?;

            let values = self.resolver.resolve_all(&action.fields).await?;
            self.expect_acknowledgement(&swap.id, self.service.execute_action(action, &values).await?);

            info!("✅ [{}] Swap accepted: {}", self.name, swap.id);
            self.emit(SwapEvent::Accepted { swap_id: swap.id });
            Ok(SwapOutcome::Accepted)
        } else {
            let action = detail
                .find_action(ActionKind::Decline)
                .ok_or_else(|| SwapError::MissingAction {
                    swap_id: swap.id.clone(),
                    action: ActionKind::Decline.to_string(),
                })?;

            self.expect_acknowledgement(
                &swap.id,
                self.service.execute_action(action, &HashMap::new()).await?,
            );

            info!("🚫 [{}] Swap declined: {}", self.name, swap.id);
            self.emit(SwapEvent::Declined { swap_id: swap.id });
            Ok(SwapOutcome::Declined)
        }
    }

    #[instrument(skip(self), fields(party = %self.name))]
    async fn perform_ledger_action(&self, swap_id: &SwapId) -> AppResult<SwapOutcome> {
        let detail = self.service.get_swap(swap_id).await?;
        let action = detail
            .ledger_action()
            .ok_or_else(|| SwapError::MissingAction {
                swap_id: swap_id.clone(),
                action: "fund/redeem".to_string(),
            })?;

        // Unresolved fields are left out, the swap service decides
        let values = self.resolver.resolve_all(&action.fields).await?;

        let instruction = match self.service.execute_action(action, &values).await? {
            ActionOutcome::Instruction(instruction) => instruction,
            ActionOutcome::Acknowledged => {
                return Err(SwapError::MissingInstruction {
                    swap_id: swap_id.clone(),
                    action: action.name.clone(),
                }
                .into())
            }
        };

        let claim = self.ledger.lock().try_claim(&instruction);
        let mut claim = match claim {
            Claim::Granted => ClaimGuard {
                ledger: &self.ledger,
                instruction: &instruction,
                settled: false,
            },
            Claim::AlreadyExecuted | Claim::InFlight => return Ok(SwapOutcome::Skipped),
            Claim::Exhausted => {
                warn!(
                    "⚠️ [{}] Giving up on {} for swap {} after {:?} failed attempts",
                    self.name, action.name, swap_id, self.config.max_dispatch_attempts
                );
                return Ok(SwapOutcome::Skipped);
            }
        };

        let swap = detail.to_swap();
        let asset = if action.kind() == Some(ActionKind::Fund) {
            &swap.sell_asset.name
        } else {
            &swap.buy_asset.name
        };
        info!("🔄 [{}] {} {} for {}", self.name, progressive(&action.name), asset, swap_id);

        match self.dispatcher.dispatch(&instruction).await {
            Ok(receipt) => {
                claim.executed();
                self.emit(SwapEvent::LedgerActionExecuted {
                    swap_id: swap_id.clone(),
                    action: action.name.clone(),
                    instruction: instruction.clone(),
                    receipt,
                });
                Ok(SwapOutcome::Executed)
            }
            Err(e) => {
                let attempts = claim.release();
                debug!("[{}] {} dispatch failed {} time(s)", self.name, action.name, attempts);
                Err(e)
            }
        }
    }

    fn expect_acknowledgement(&self, swap_id: &SwapId, outcome: ActionOutcome) {
        if let ActionOutcome::Instruction(instruction) = outcome {
            warn!(
                "⚠️ [{}] Decision on {} returned a ledger instruction, ignoring: {:?}",
                self.name, swap_id, instruction
            );
        }
    }

    fn emit(&self, event: SwapEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                debug!("[{}] Event receiver dropped", self.name);
            }
        }
    }
}

/// "fund" -> "Funding", "redeem" -> "Redeeming"
fn progressive(action: &str) -> String {
    let mut chars = action.chars();
    match chars.next() {
        Some(first) => format!("{}{}ing", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockSwapService;
    use super::*;
    use crate::execution::dispatcher::mocks::{MockBitcoinWallet, MockEthereumWallet};
    use crate::execution::fields::StaticFeeRate;
    use crate::execution::instruction::{Ledger, LedgerInstruction};
    use crate::swap::models::fixtures::entity;
    use crate::swap::models::{Field, Role, SwapStatus};
    use std::time::Duration;

    struct Harness {
        orchestrator: Arc<SwapOrchestrator>,
        service: Arc<MockSwapService>,
        bitcoin: Arc<MockBitcoinWallet>,
        ethereum: Arc<MockEthereumWallet>,
        events: mpsc::UnboundedReceiver<SwapEvent>,
    }

    fn harness(swaps: Vec<SwapEntity>, accept: bool, config: OrchestratorConfig) -> Harness {
        let service = Arc::new(MockSwapService::with_swaps(swaps));
        let bitcoin = Arc::new(MockBitcoinWallet::new("regtest"));
        let ethereum = Arc::new(MockEthereumWallet::new());
        let (tx, events) = mpsc::unbounded_channel();

        let orchestrator = SwapOrchestrator::new(
            "taker",
            config,
            service.clone(),
            Wallets {
                bitcoin: bitcoin.clone(),
                ethereum: ethereum.clone(),
            },
            Arc::new(StaticFeeRate(150)),
            Arc::new(move |_swap: &Swap| accept),
        )
        .with_events(tx);

        Harness {
            orchestrator: Arc::new(orchestrator),
            service,
            bitcoin,
            ethereum,
            events,
        }
    }

    fn fund_instruction() -> LedgerInstruction {
        LedgerInstruction::SendAmountToAddress {
            ledger: Ledger::Bitcoin,
            to: "bcrt1qhtlc".to_string(),
            amount: "100000000".to_string(),
            network: "regtest".to_string(),
        }
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<SwapEvent>) -> Vec<SwapEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_instruction_dispatched_once_across_ticks() {
        let mut h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            OrchestratorConfig::default(),
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));

        let first = h.orchestrator.tick().await.unwrap();
        let second = h.orchestrator.tick().await.unwrap();
        let third = h.orchestrator.tick().await.unwrap();

        assert_eq!(first.executed, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(third.skipped, 1);
        // The action itself is re-executed remotely every tick
        assert_eq!(h.service.executed_hrefs().len(), 3);
        // but the wallet only sees it once
        assert_eq!(h.bitcoin.call_count(), 1);

        let events = drain(&mut h.events);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SwapEvent::LedgerActionExecuted { .. }));
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_retried() {
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            OrchestratorConfig::default(),
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));

        *h.bitcoin.fail.lock() = true;
        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(h.bitcoin.call_count(), 0);

        *h.bitcoin.fail.lock() = false;
        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(h.bitcoin.call_count(), 1);
    }

    #[tokio::test]
    async fn test_bounded_retries_give_up() {
        let config = OrchestratorConfig {
            max_dispatch_attempts: Some(1),
            ..OrchestratorConfig::default()
        };
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            config,
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));

        *h.bitcoin.fail.lock() = true;
        assert_eq!(h.orchestrator.tick().await.unwrap().failed, 1);

        *h.bitcoin.fail.lock() = false;
        assert_eq!(h.orchestrator.tick().await.unwrap().skipped, 1);
        assert_eq!(h.bitcoin.call_count(), 0);
    }

    #[tokio::test]
    async fn test_finished_swap_reported_once() {
        let mut h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &[])],
            true,
            OrchestratorConfig::default(),
        );

        h.orchestrator.tick().await.unwrap();
        assert!(drain(&mut h.events).is_empty());

        h.service.swaps.lock()[0].properties.status = SwapStatus::Swapped;
        assert_eq!(h.orchestrator.tick().await.unwrap().finished, 1);
        assert_eq!(h.orchestrator.tick().await.unwrap().finished, 0);
        assert_eq!(h.orchestrator.tick().await.unwrap().finished, 0);

        let events = drain(&mut h.events);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].swap_id(), &SwapId::from("s1"));
    }

    #[tokio::test]
    async fn test_swaps_finished_before_start_are_not_announced() {
        let mut h = harness(
            vec![
                entity("old", Role::Initiator, SwapStatus::Swapped, &[]),
                entity("gone", Role::Responder, SwapStatus::NotSwapped, &[]),
            ],
            true,
            OrchestratorConfig::default(),
        );

        assert_eq!(h.orchestrator.initialize().await.unwrap(), 2);
        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.finished, 0);
        assert!(drain(&mut h.events).is_empty());
    }

    #[tokio::test]
    async fn test_accept_resolves_fields() {
        let mut swap = entity("s1", Role::Responder, SwapStatus::InProgress, &["accept", "decline"]);
        swap.actions[0].fields = vec![
            Field {
                name: "alpha_ledger_redeem_identity".to_string(),
                classes: vec!["bitcoin".to_string(), "address".to_string()],
            },
            Field {
                name: "beta_ledger_refund_identity".to_string(),
                classes: vec!["ethereum".to_string(), "address".to_string()],
            },
        ];
        let mut h = harness(vec![swap], true, OrchestratorConfig::default());

        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.decided, 1);

        let executed = h.service.executed.lock().clone();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].0, "/swaps/s1/accept");
        assert_eq!(executed[0].1["alpha_ledger_redeem_identity"], "bcrt1qmockaddress");
        assert_eq!(executed[0].1["beta_ledger_refund_identity"], h.ethereum.account);

        assert!(matches!(drain(&mut h.events)[0], SwapEvent::Accepted { .. }));
    }

    #[tokio::test]
    async fn test_decline_sends_no_fields() {
        let mut swap = entity("s1", Role::Responder, SwapStatus::InProgress, &["accept", "decline"]);
        swap.actions[1].fields = vec![Field {
            name: "reason".to_string(),
            classes: vec!["bitcoin".to_string(), "address".to_string()],
        }];
        let mut h = harness(vec![swap], false, OrchestratorConfig::default());

        h.orchestrator.tick().await.unwrap();

        let executed = h.service.executed.lock().clone();
        assert_eq!(executed[0].0, "/swaps/s1/decline");
        assert!(executed[0].1.is_empty());
        assert!(matches!(drain(&mut h.events)[0], SwapEvent::Declined { .. }));
    }

    #[tokio::test]
    async fn test_unresolved_field_is_omitted_not_fatal() {
        let mut swap = entity("s1", Role::Responder, SwapStatus::InProgress, &["accept", "decline"]);
        swap.actions[0].fields = vec![
            Field {
                name: "beta_ledger_refund_identity".to_string(),
                classes: vec!["ethereum".to_string(), "address".to_string()],
            },
            Field {
                name: "mystery".to_string(),
                classes: vec!["ethereum".to_string()],
            },
        ];
        let h = harness(vec![swap], true, OrchestratorConfig::default());

        for _ in 0..3 {
            let report = h.orchestrator.tick().await.unwrap();
            assert_eq!(report.decided, 1);
            assert_eq!(report.failed, 0);
        }

        let executed = h.service.executed.lock().clone();
        assert_eq!(executed.len(), 3);
        for (href, values) in executed {
            assert_eq!(href, "/swaps/s1/accept");
            assert_eq!(values["beta_ledger_refund_identity"], h.ethereum.account);
            assert!(!values.contains_key("mystery"));
        }
    }

    #[tokio::test]
    async fn test_acknowledged_ledger_action_is_contract_violation() {
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["redeem"])],
            true,
            OrchestratorConfig::default(),
        );

        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(h.bitcoin.call_count(), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_degrades_tick_only() {
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            OrchestratorConfig::default(),
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));

        *h.service.listing_down.lock() = true;
        assert!(h.orchestrator.tick().await.is_err());

        *h.service.listing_down.lock() = false;
        assert_eq!(h.orchestrator.tick().await.unwrap().executed, 1);
    }

    #[tokio::test]
    async fn test_busy_swap_is_skipped() {
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            OrchestratorConfig::default(),
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));

        h.orchestrator.busy.lock().insert(SwapId::from("s1"));
        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert!(h.service.executed_hrefs().is_empty());
    }

    #[tokio::test]
    async fn test_start_and_stop_polling() {
        let config = OrchestratorConfig {
            poll_interval: Duration::from_millis(10),
            tick_policy: TickPolicy::Serialize,
            ..OrchestratorConfig::default()
        };
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            config,
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));

        let handle = h.orchestrator.clone().start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop();

        assert!(h.service.executed_hrefs().len() >= 2);
        assert_eq!(h.bitcoin.call_count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_ticks_dispatch_once() {
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            OrchestratorConfig::default(),
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));
        *h.bitcoin.delay.lock() = Duration::from_millis(100);

        let (first, second) = tokio::join!(h.orchestrator.tick(), h.orchestrator.tick());
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.executed + second.executed, 1);
        assert_eq!(first.skipped + second.skipped, 1);
        assert_eq!(h.bitcoin.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_lets_serialized_tick_finish() {
        let config = OrchestratorConfig {
            poll_interval: Duration::from_millis(20),
            tick_policy: TickPolicy::Serialize,
            ..OrchestratorConfig::default()
        };
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            config,
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));
        *h.bitcoin.delay.lock() = Duration::from_millis(200);

        let handle = h.orchestrator.clone().start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.stop();

        // The dispatch started before stop completes on its own
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(h.bitcoin.call_count(), 1);

        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(h.bitcoin.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_can_be_retried() {
        let h = harness(
            vec![entity("s1", Role::Initiator, SwapStatus::InProgress, &["fund"])],
            true,
            OrchestratorConfig::default(),
        );
        h.service
            .respond("/swaps/s1/fund", ActionOutcome::Instruction(fund_instruction()));
        *h.bitcoin.delay.lock() = Duration::from_millis(200);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), h.orchestrator.tick()).await;
        assert!(cancelled.is_err());
        assert_eq!(h.bitcoin.call_count(), 0);

        *h.bitcoin.delay.lock() = Duration::ZERO;
        let report = h.orchestrator.tick().await.unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(h.bitcoin.call_count(), 1);
    }

    #[test]
    fn test_progressive() {
        assert_eq!(progressive("fund"), "Funding");
        assert_eq!(progressive("redeem"), "Redeeming");
    }
}
