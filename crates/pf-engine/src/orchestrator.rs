//! Draw orchestration
//!
//! Sequences gate → calendar → probability → reservation → audit as an
//! explicit state machine, so the retry bound and terminal states stay
//! auditable instead of hiding in nested branches. Calendar wins dominate
//! probability wins dominate Loss. A returned Win always corresponds to a
//! durably committed stock decrement; a returned Loss is fixed permanently
//! for its participation id.

use std::sync::Arc;

use parking_lot::Mutex;

use pf_core::{EngineError, EngineResult, PrizeId, SlotId};
use std::collections::HashSet;

use crate::audit::{AuditRecord, AuditSink, DecisionStep};
use crate::campaign::Campaign;
use crate::fraud::{AntiFraudGate, GateDecision};
use crate::ledger::{Reservation, StockLedger};
use crate::outcome::{DrawContext, DrawOutcome, DrawResult, RngTrace};
use crate::rng::RandomSource;
use crate::slots::SlotResolver;
use crate::store::{CampaignReader, DrawStore};
use crate::weighted::{WeightedDrawResolver, WeightedPick};

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// How many probability re-draws a single request may spend after
    /// losing reservation races. Once spent, the result is Loss.
    pub retry_budget: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { retry_budget: 3 }
    }
}

/// Orchestrator state. Terminal error states (`Rejected`, `Failed`) are
/// the `Err` arm of [`DrawEngine::draw`]; the variants here are the live
/// phases of one decision.
enum Phase {
    Calendar,
    Probability,
    Decided(DrawResult),
}

/// The sole public entry point of the drawing engine.
///
/// Holds no correctness-bearing in-process state: any number of engine
/// instances may draw against the same store concurrently. The only lock
/// inside is the one sharing the injected random source across callers.
pub struct DrawEngine<S, A> {
    store: Arc<S>,
    audit: Arc<A>,
    rng: Mutex<Box<dyn RandomSource>>,
    config: EngineConfig,
}

impl<S, A> DrawEngine<S, A>
where
    S: CampaignReader + DrawStore,
    A: AuditSink,
{
    pub fn new(store: Arc<S>, audit: Arc<A>, rng: Box<dyn RandomSource>) -> Self {
        Self {
            store,
            audit,
            rng: Mutex::new(rng),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Decide one participation event.
    ///
    /// Idempotent per participation id: re-submission returns the
    /// recorded outcome unchanged and emits no second audit record.
    pub fn draw(&self, ctx: &DrawContext) -> EngineResult<DrawOutcome> {
        if ctx.participation_id.is_empty() {
            return Err(EngineError::Validation("empty participation id".into()));
        }
        if ctx.campaign_id.is_empty() {
            return Err(EngineError::Validation("empty campaign id".into()));
        }

        let campaign = self.store.load_campaign(&ctx.campaign_id)?;
        campaign.validate()?;

        let gate = AntiFraudGate::new(self.store.as_ref());
        match gate.check(ctx, &campaign.fraud_policy)? {
            GateDecision::Replay(outcome) => return Ok(outcome),
            GateDecision::Proceed => {}
        }

        // The claim is held from here on; any abort must release it so a
        // resubmission can be re-evaluated.
        match self.decide_and_record(ctx, &campaign) {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.store.release_claim(&ctx.participation_id);
                Err(error)
            }
        }
    }

    fn decide_and_record(
        &self,
        ctx: &DrawContext,
        campaign: &Campaign,
    ) -> EngineResult<DrawOutcome> {
        let ledger = StockLedger::new(self.store.as_ref());
        let mut path = vec![DecisionStep::GatePassed];
        let mut rng_trace: Vec<RngTrace> = Vec::new();

        let mut excluded_slots: HashSet<SlotId> = HashSet::new();
        let mut excluded_prizes: HashSet<PrizeId> = HashSet::new();
        let mut retries = 0u32;

        let mut phase = Phase::Calendar;
        let result = loop {
            phase = match phase {
                Phase::Calendar => {
                    match SlotResolver::resolve(campaign, ctx.server_time, &excluded_slots) {
                        Some(candidate) => {
                            path.push(DecisionStep::CalendarCandidate {
                                prize_id: candidate.prize_id.clone(),
                                slot_id: candidate.slot_id.clone(),
                            });
                            match ledger
                                .try_reserve(&candidate.prize_id, Some(&candidate.slot_id))?
                            {
                                Reservation::Committed => {
                                    path.push(DecisionStep::ReservationCommitted {
                                        prize_id: candidate.prize_id.clone(),
                                        slot_id: Some(candidate.slot_id.clone()),
                                    });
                                    Phase::Decided(DrawResult::Win {
                                        prize_id: candidate.prize_id,
                                        slot_id: Some(candidate.slot_id),
                                    })
                                }
                                Reservation::Exhausted => {
                                    path.push(DecisionStep::ReservationExhausted {
                                        prize_id: candidate.prize_id,
                                        slot_id: Some(candidate.slot_id.clone()),
                                    });
                                    excluded_slots.insert(candidate.slot_id);
                                    Phase::Calendar
                                }
                            }
                        }
                        None => Phase::Probability,
                    }
                }

                Phase::Probability => {
                    if retries > self.config.retry_budget {
                        path.push(DecisionStep::RetryBudgetExhausted);
                        break DrawResult::Loss;
                    }
                    let mut rng = self.rng.lock();
                    let (pick, trace) =
                        WeightedDrawResolver::resolve(campaign, &excluded_prizes, rng.as_mut())?;
                    drop(rng);
                    if let Some(trace) = trace {
                        rng_trace.push(trace);
                    }
                    match pick {
                        WeightedPick::NoWin => {
                            match trace {
                                Some(trace) => path.push(DecisionStep::WeightedDraw {
                                    trace,
                                    picked: None,
                                }),
                                None => path.push(DecisionStep::NoCandidate),
                            }
                            break DrawResult::Loss;
                        }
                        WeightedPick::Prize(prize_id) => {
                            if let Some(trace) = trace {
                                path.push(DecisionStep::WeightedDraw {
                                    trace,
                                    picked: Some(prize_id.clone()),
                                });
                            }
                            match ledger.try_reserve(&prize_id, None)? {
                                Reservation::Committed => {
                                    path.push(DecisionStep::ReservationCommitted {
                                        prize_id: prize_id.clone(),
                                        slot_id: None,
                                    });
                                    Phase::Decided(DrawResult::Win {
                                        prize_id,
                                        slot_id: None,
                                    })
                                }
                                Reservation::Exhausted => {
                                    path.push(DecisionStep::ReservationExhausted {
                                        prize_id: prize_id.clone(),
                                        slot_id: None,
                                    });
                                    excluded_prizes.insert(prize_id);
                                    retries += 1;
                                    Phase::Probability
                                }
                            }
                        }
                    }
                }

                Phase::Decided(result) => break result,
            };
        };

        let outcome = DrawOutcome {
            participation_id: ctx.participation_id.clone(),
            campaign_id: ctx.campaign_id.clone(),
            result,
            decided_at: ctx.server_time,
            rng_trace,
        };
        self.store.record_outcome(&outcome)?;

        // Best-effort: the participant's response never blocks on audit.
        let record = AuditRecord {
            participation_id: ctx.participation_id.clone(),
            campaign_id: ctx.campaign_id.clone(),
            trace_id: ctx.trace_id.clone(),
            decided_at: outcome.decided_at,
            path,
            outcome: outcome.clone(),
        };
        if let Err(error) = self.audit.append(&record) {
            log::warn!(
                "audit append failed for participation {}: {error}",
                ctx.participation_id
            );
        }

        if outcome.is_win() {
            log::info!(
                "participation {} won {:?} (trace {})",
                ctx.participation_id,
                outcome.result.prize_id(),
                ctx.trace_id
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::campaign::{FraudPolicy, Prize, PrizeKind};
    use crate::rng::SequenceSource;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use pf_core::{StoreError, Timestamp};

    fn ts(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    fn ctx(pid: &str) -> DrawContext {
        DrawContext {
            participation_id: pid.into(),
            campaign_id: "c1".into(),
            server_time: ts(10, 2),
            identity_fingerprint: format!("fp-{pid}"),
            trace_id: format!("trace-{pid}").into(),
        }
    }

    fn probability_campaign() -> Campaign {
        let mut campaign = Campaign::new("c1")
            .with_no_win_weight(60.0)
            .with_fraud_policy(FraudPolicy {
                cooldown_secs: 0,
                max_participations: 1000,
            });
        campaign.push_prize(Prize {
            id: "a".into(),
            campaign_id: "c1".into(),
            label: "A".into(),
            kind: PrizeKind::Probability { weight: 30.0 },
            total_stock: 10,
            remaining_stock: 10,
        });
        campaign.push_prize(Prize {
            id: "b".into(),
            campaign_id: "c1".into(),
            label: "B".into(),
            kind: PrizeKind::Probability { weight: 10.0 },
            total_stock: 10,
            remaining_stock: 10,
        });
        campaign
    }

    fn engine_with(
        campaign: Campaign,
        rng: Box<dyn RandomSource>,
    ) -> (
        DrawEngine<MemoryStore, MemoryAuditSink>,
        Arc<MemoryStore>,
        Arc<MemoryAuditSink>,
    ) {
        let store = Arc::new(MemoryStore::new());
        store.insert_campaign(campaign);
        let audit = Arc::new(MemoryAuditSink::new());
        let engine = DrawEngine::new(Arc::clone(&store), Arc::clone(&audit), rng);
        (engine, store, audit)
    }

    #[test]
    fn test_empty_participation_id_is_validation_error() {
        let (engine, _, _) =
            engine_with(probability_campaign(), Box::new(SequenceSource::new(vec![])));
        let mut bad = ctx("p1");
        bad.participation_id = "".into();
        assert!(matches!(
            engine.draw(&bad),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_boundary_draw_wins_prize_a() {
        let (engine, store, audit) = engine_with(
            probability_campaign(),
            Box::new(SequenceSource::new(vec![25.0])),
        );
        let outcome = engine.draw(&ctx("p1")).unwrap();
        assert_eq!(
            outcome.result,
            DrawResult::Win {
                prize_id: "a".into(),
                slot_id: None,
            }
        );
        assert_eq!(store.remaining_stock(&PrizeId::new("a")), Some(9));
        assert_eq!(audit.len(), 1);
        assert_eq!(outcome.rng_trace.len(), 1);
        assert_eq!(outcome.rng_trace[0].total_weight, 100.0);
    }

    #[test]
    fn test_injected_source_drives_draws_in_order() {
        let (engine, _, _) = engine_with(
            probability_campaign(),
            Box::new(SequenceSource::new(vec![25.0, 35.0, 50.0])),
        );
        let first = engine.draw(&ctx("p1")).unwrap();
        assert_eq!(first.result.prize_id(), Some(&PrizeId::new("a")));
        let second = engine.draw(&ctx("p2")).unwrap();
        assert_eq!(second.result.prize_id(), Some(&PrizeId::new("b")));
        let third = engine.draw(&ctx("p3")).unwrap();
        assert_eq!(third.result, DrawResult::Loss);
    }

    #[test]
    fn test_no_win_interval_is_loss() {
        let (engine, store, _) = engine_with(
            probability_campaign(),
            Box::new(SequenceSource::new(vec![50.0])),
        );
        let outcome = engine.draw(&ctx("p1")).unwrap();
        assert_eq!(outcome.result, DrawResult::Loss);
        assert_eq!(store.remaining_stock(&PrizeId::new("a")), Some(10));
        assert_eq!(store.remaining_stock(&PrizeId::new("b")), Some(10));
    }

    #[test]
    fn test_loss_is_recorded_and_replayed() {
        let (engine, _, audit) = engine_with(
            probability_campaign(),
            Box::new(SequenceSource::new(vec![50.0])),
        );
        let first = engine.draw(&ctx("p1")).unwrap();
        // Same id again: scripted rng is dry, so any new draw would fail;
        // the replay path must not draw at all.
        let second = engine.draw(&ctx("p1")).unwrap();
        assert_eq!(first, second);
        assert_eq!(audit.len(), 1);
    }

    #[test]
    fn test_rng_failure_aborts_and_releases_claim() {
        let (engine, _, audit) = engine_with(
            probability_campaign(),
            Box::new(SequenceSource::new(vec![])),
        );
        assert!(matches!(
            engine.draw(&ctx("p1")),
            Err(EngineError::RngUnavailable)
        ));
        assert!(audit.is_empty());
    }

    #[test]
    fn test_persistence_fault_surfaces_and_fixes_nothing() {
        let (engine, store, audit) = engine_with(
            probability_campaign(),
            Box::new(SequenceSource::new(vec![25.0, 25.0])),
        );
        // Fault on the campaign load.
        store.fail_next(StoreError::Timeout("load".into()));
        assert!(matches!(
            engine.draw(&ctx("p1")),
            Err(EngineError::Persistence(StoreError::Timeout(_)))
        ));
        assert!(audit.is_empty());
        // The id is free to retry and the retry can still win.
        let outcome = engine.draw(&ctx("p1")).unwrap();
        assert!(outcome.is_win());
    }

    #[test]
    fn test_audit_failure_does_not_block_outcome() {
        let (engine, _, audit) = engine_with(
            probability_campaign(),
            Box::new(SequenceSource::new(vec![25.0])),
        );
        audit.fail_appends();
        let outcome = engine.draw(&ctx("p1")).unwrap();
        assert!(outcome.is_win());
        assert!(audit.is_empty());
    }

    /// Serves a stale campaign snapshot while delegating the atomic
    /// primitives to the real store, so tests can force reservation
    /// races deterministically.
    struct StaleReader {
        inner: Arc<MemoryStore>,
        snapshot: Campaign,
    }

    impl CampaignReader for StaleReader {
        fn load_campaign(
            &self,
            _id: &pf_core::CampaignId,
        ) -> Result<Campaign, StoreError> {
            Ok(self.snapshot.clone())
        }
    }

    impl DrawStore for StaleReader {
        fn conditional_decrement(&self, prize: &PrizeId) -> Result<bool, StoreError> {
            self.inner.conditional_decrement(prize)
        }
        fn conditional_consume_slot(
            &self,
            prize: &PrizeId,
            slot: &SlotId,
        ) -> Result<bool, StoreError> {
            self.inner.conditional_consume_slot(prize, slot)
        }
        fn claim_participation(
            &self,
            pid: &pf_core::ParticipationId,
        ) -> Result<crate::store::Claim, StoreError> {
            self.inner.claim_participation(pid)
        }
        fn record_outcome(&self, outcome: &DrawOutcome) -> Result<(), StoreError> {
            self.inner.record_outcome(outcome)
        }
        fn release_claim(&self, pid: &pf_core::ParticipationId) {
            self.inner.release_claim(pid)
        }
        fn register_attempt(
            &self,
            campaign: &pf_core::CampaignId,
            fingerprint: &str,
            now: Timestamp,
            policy: &FraudPolicy,
        ) -> Result<crate::store::AttemptOutcome, StoreError> {
            self.inner
                .register_attempt(campaign, fingerprint, now, policy)
        }
    }

    #[test]
    fn test_retry_budget_caps_probability_retries() {
        // Both prizes are exhausted in the store, but the snapshot the
        // resolver sees still shows them open. Every pick loses its
        // reservation; once the budget is spent, the result is Loss.
        let store = Arc::new(MemoryStore::new());
        let mut drained = probability_campaign();
        for prize in &mut drained.prizes {
            prize.remaining_stock = 0;
        }
        store.insert_campaign(drained);

        let stale = Arc::new(StaleReader {
            inner: Arc::clone(&store),
            snapshot: probability_campaign(),
        });
        let audit = Arc::new(MemoryAuditSink::new());
        let engine = DrawEngine::new(
            Arc::clone(&stale),
            Arc::clone(&audit),
            // Picks a (exhausted, excluded), then b (exhausted, excluded).
            Box::new(SequenceSource::new(vec![25.0, 5.0])),
        )
        .with_config(EngineConfig { retry_budget: 1 });

        let outcome = engine.draw(&ctx("p1")).unwrap();
        assert_eq!(outcome.result, DrawResult::Loss);

        let record = &audit.records()[0];
        assert!(record
            .path
            .iter()
            .any(|s| matches!(s, DecisionStep::RetryBudgetExhausted)));
        assert_eq!(
            record
                .path
                .iter()
                .filter(|s| matches!(s, DecisionStep::ReservationExhausted { .. }))
                .count(),
            2
        );
    }
}
