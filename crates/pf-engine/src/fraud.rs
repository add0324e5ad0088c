//! Anti-fraud gate
//!
//! Runs before any resolver: idempotency first, then rate/duplicate
//! policy. Both checks are atomic inserts against the store, so two
//! concurrent requests with the same identity can never both pass before
//! either is recorded. Rejection fails closed — no draw performed, no
//! stock touched.

use pf_core::{EngineError, EngineResult, RejectReason, StoreError};

use crate::campaign::FraudPolicy;
use crate::outcome::{DrawContext, DrawOutcome};
use crate::store::{AttemptOutcome, Claim, DrawStore};

/// What the orchestrator does next.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// First sighting of this participation id; the caller owns the
    /// claim and proceeds to the resolvers.
    Proceed,
    /// Idempotency hit: return the recorded outcome unchanged, without
    /// invoking any resolver.
    Replay(DrawOutcome),
}

/// Rate-limiting, duplicate-participation and idempotency checks.
pub struct AntiFraudGate<'a> {
    store: &'a dyn DrawStore,
}

impl<'a> AntiFraudGate<'a> {
    pub fn new(store: &'a dyn DrawStore) -> Self {
        Self { store }
    }

    pub fn check(&self, ctx: &DrawContext, policy: &FraudPolicy) -> EngineResult<GateDecision> {
        match self.store.claim_participation(&ctx.participation_id)? {
            Claim::Recorded(outcome) => {
                log::debug!(
                    "participation {} replayed (trace {})",
                    ctx.participation_id,
                    ctx.trace_id
                );
                return Ok(GateDecision::Replay(outcome));
            }
            Claim::InFlight => {
                // A concurrent duplicate is mid-draw. No outcome exists
                // yet, so nothing can be returned or fabricated; surface
                // a retryable fault and let the retry observe the
                // recorded outcome.
                return Err(EngineError::Persistence(StoreError::Unavailable(
                    format!("participation {} already in flight", ctx.participation_id),
                )));
            }
            Claim::Granted => {}
        }

        let attempt = match self.store.register_attempt(
            &ctx.campaign_id,
            &ctx.identity_fingerprint,
            ctx.server_time,
            policy,
        ) {
            Ok(attempt) => attempt,
            Err(error) => {
                self.store.release_claim(&ctx.participation_id);
                return Err(error.into());
            }
        };

        match attempt {
            AttemptOutcome::Allowed => Ok(GateDecision::Proceed),
            AttemptOutcome::Cooldown => {
                self.store.release_claim(&ctx.participation_id);
                Err(EngineError::RateLimited(RejectReason::Cooldown))
            }
            AttemptOutcome::LimitReached => {
                self.store.release_claim(&ctx.participation_id);
                Err(EngineError::RateLimited(RejectReason::LimitReached))
            }
        }
    }
}
