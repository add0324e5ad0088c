//! Persistence collaborator traits and the in-memory backend
//!
//! The engine never mutates stock through shared in-process state; every
//! mutation goes through one of the atomic conditional primitives below,
//! which a backend implements as a transaction or compare-and-swap. The
//! in-memory backend keeps each primitive atomic behind a single lock and
//! backs the test suites and the simulator.

use std::collections::HashMap;

use parking_lot::Mutex;

use pf_core::{CampaignId, ParticipationId, PrizeId, SlotId, StoreError, Timestamp};

use crate::campaign::{Campaign, FraudPolicy, PrizeKind};
use crate::outcome::DrawOutcome;

// ============ Primitive results ============

/// Result of claiming a participation id.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The caller owns the id and is the only one drawing for it.
    Granted,
    /// Another caller holds the claim and has not recorded an outcome yet.
    InFlight,
    /// An outcome is already recorded; return it unchanged.
    Recorded(DrawOutcome),
}

/// Result of registering a participation attempt for anti-fraud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Allowed,
    /// The identity drew within the cooldown window.
    Cooldown,
    /// The identity reached the participation cap.
    LimitReached,
}

// ============ Collaborator traits ============

/// Read-only campaign configuration snapshot provider.
pub trait CampaignReader: Send + Sync {
    fn load_campaign(&self, id: &CampaignId) -> Result<Campaign, StoreError>;
}

/// Atomic conditional primitives the engine reserves stock through.
///
/// Each method must be individually atomic: concurrent callers racing for
/// the last unit of a prize see exactly one `true`. A backend that cannot
/// answer within its deadline returns [`StoreError::Timeout`]; the engine
/// surfaces that as a retryable persistence fault, never as an outcome.
pub trait DrawStore: Send + Sync {
    /// Decrement `remaining_stock` if it is positive.
    fn conditional_decrement(&self, prize: &PrizeId) -> Result<bool, StoreError>;

    /// Consume a calendar slot if unconsumed, decrementing the prize's
    /// `remaining_stock` in the same transaction.
    fn conditional_consume_slot(&self, prize: &PrizeId, slot: &SlotId)
        -> Result<bool, StoreError>;

    /// Insert-if-absent claim on a participation id. The first caller is
    /// granted; everyone after observes the in-flight claim or the
    /// recorded outcome.
    fn claim_participation(&self, pid: &ParticipationId) -> Result<Claim, StoreError>;

    /// Finalize the claim with the decided outcome.
    fn record_outcome(&self, outcome: &DrawOutcome) -> Result<(), StoreError>;

    /// Best-effort release of an unfinalized claim, used when a draw
    /// aborts without an outcome so a later resubmission is re-evaluated.
    fn release_claim(&self, pid: &ParticipationId);

    /// Atomic check-and-record of one attempt by an identity, so two
    /// concurrent requests cannot both pass the policy before either is
    /// recorded. Rejected attempts are not recorded.
    fn register_attempt(
        &self,
        campaign: &CampaignId,
        fingerprint: &str,
        now: Timestamp,
        policy: &FraudPolicy,
    ) -> Result<AttemptOutcome, StoreError>;
}

// ============ In-memory backend ============

#[derive(Debug, Clone, PartialEq)]
enum ParticipationRecord {
    Pending,
    Recorded(DrawOutcome),
}

#[derive(Default)]
struct MemoryState {
    campaigns: HashMap<CampaignId, Campaign>,
    participations: HashMap<ParticipationId, ParticipationRecord>,
    attempts: HashMap<(CampaignId, String), Vec<Timestamp>>,
    /// Fault injected by tests; consumed by the next primitive call.
    fail_next: Option<StoreError>,
}

/// Reference backend holding all state behind one lock, so every
/// primitive is trivially atomic. Used by tests, the simulator and
/// single-process embedders.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_campaign(&self, campaign: Campaign) {
        self.state
            .lock()
            .campaigns
            .insert(campaign.id.clone(), campaign);
    }

    /// Inject a fault into the next primitive call. Test hook.
    pub fn fail_next(&self, error: StoreError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Current remaining stock, if the prize exists.
    pub fn remaining_stock(&self, prize: &PrizeId) -> Option<u32> {
        let state = self.state.lock();
        state
            .campaigns
            .values()
            .flat_map(|c| c.prizes.iter())
            .find(|p| &p.id == prize)
            .map(|p| p.remaining_stock)
    }

    /// Recorded outcome for a participation id, if finalized.
    pub fn outcome(&self, pid: &ParticipationId) -> Option<DrawOutcome> {
        match self.state.lock().participations.get(pid) {
            Some(ParticipationRecord::Recorded(outcome)) => Some(outcome.clone()),
            _ => None,
        }
    }

    fn take_fault(state: &mut MemoryState) -> Result<(), StoreError> {
        match state.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl CampaignReader for MemoryStore {
    fn load_campaign(&self, id: &CampaignId) -> Result<Campaign, StoreError> {
        let mut state = self.state.lock();
        Self::take_fault(&mut state)?;
        state
            .campaigns
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::Unavailable(format!("unknown campaign {id}")))
    }
}

impl DrawStore for MemoryStore {
    fn conditional_decrement(&self, prize: &PrizeId) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Self::take_fault(&mut state)?;
        for campaign in state.campaigns.values_mut() {
            if let Some(p) = campaign.prizes.iter_mut().find(|p| &p.id == prize) {
                if p.remaining_stock == 0 {
                    return Ok(false);
                }
                p.remaining_stock -= 1;
                return Ok(true);
            }
        }
        Err(StoreError::Unavailable(format!("unknown prize {prize}")))
    }

    fn conditional_consume_slot(
        &self,
        prize: &PrizeId,
        slot: &SlotId,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        Self::take_fault(&mut state)?;
        for campaign in state.campaigns.values_mut() {
            let Some(p) = campaign.prizes.iter_mut().find(|p| &p.id == prize) else {
                continue;
            };
            let PrizeKind::Calendar { slots } = &mut p.kind else {
                return Err(StoreError::Unavailable(format!(
                    "prize {prize} has no calendar slots"
                )));
            };
            let Some(s) = slots.iter_mut().find(|s| &s.id == slot) else {
                return Err(StoreError::Unavailable(format!("unknown slot {slot}")));
            };
            if s.consumed || p.remaining_stock == 0 {
                return Ok(false);
            }
            s.consumed = true;
            p.remaining_stock -= 1;
            return Ok(true);
        }
        Err(StoreError::Unavailable(format!("unknown prize {prize}")))
    }

    fn claim_participation(&self, pid: &ParticipationId) -> Result<Claim, StoreError> {
        let mut state = self.state.lock();
        Self::take_fault(&mut state)?;
        match state.participations.get(pid) {
            Some(ParticipationRecord::Pending) => Ok(Claim::InFlight),
            Some(ParticipationRecord::Recorded(outcome)) => {
                Ok(Claim::Recorded(outcome.clone()))
            }
            None => {
                state
                    .participations
                    .insert(pid.clone(), ParticipationRecord::Pending);
                Ok(Claim::Granted)
            }
        }
    }

    fn record_outcome(&self, outcome: &DrawOutcome) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::take_fault(&mut state)?;
        state.participations.insert(
            outcome.participation_id.clone(),
            ParticipationRecord::Recorded(outcome.clone()),
        );
        Ok(())
    }

    fn release_claim(&self, pid: &ParticipationId) {
        let mut state = self.state.lock();
        if matches!(
            state.participations.get(pid),
            Some(ParticipationRecord::Pending)
        ) {
            state.participations.remove(pid);
        }
    }

    fn register_attempt(
        &self,
        campaign: &CampaignId,
        fingerprint: &str,
        now: Timestamp,
        policy: &FraudPolicy,
    ) -> Result<AttemptOutcome, StoreError> {
        let mut state = self.state.lock();
        Self::take_fault(&mut state)?;
        let key = (campaign.clone(), fingerprint.to_string());
        let history = state.attempts.entry(key).or_default();

        if history.len() >= policy.max_participations as usize {
            return Ok(AttemptOutcome::LimitReached);
        }
        if let Some(last) = history.last() {
            let elapsed = now.signed_duration_since(*last);
            if elapsed < chrono::Duration::seconds(policy.cooldown_secs as i64) {
                return Ok(AttemptOutcome::Cooldown);
            }
        }
        history.push(now);
        Ok(AttemptOutcome::Allowed)
    }
}
