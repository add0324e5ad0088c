//! Draw context and outcome types

use pf_core::{CampaignId, ParticipationId, PrizeId, SlotId, Timestamp, TraceId};
use serde::{Deserialize, Serialize};

/// One participation event, as seen by the engine.
///
/// `server_time` is stamped by the caller's server clock and is never
/// client-supplied; the participation id doubles as the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawContext {
    pub participation_id: ParticipationId,
    pub campaign_id: CampaignId,
    pub server_time: Timestamp,
    /// Opaque identity fingerprint used by the anti-fraud gate.
    pub identity_fingerprint: String,
    pub trace_id: TraceId,
}

/// One random draw, kept for audit replay. Never exposed ahead of the
/// decision, so it cannot be used for prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RngTrace {
    /// The value drawn from `[0, total_weight)`.
    pub draw: f64,
    /// Total partition width at draw time, losing interval included.
    pub total_weight: f64,
}

/// Win or loss, with the winning prize (and slot, for calendar wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DrawResult {
    Win {
        prize_id: PrizeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        slot_id: Option<SlotId>,
    },
    Loss,
}

impl DrawResult {
    pub fn is_win(&self) -> bool {
        matches!(self, DrawResult::Win { .. })
    }

    pub fn prize_id(&self) -> Option<&PrizeId> {
        match self {
            DrawResult::Win { prize_id, .. } => Some(prize_id),
            DrawResult::Loss => None,
        }
    }
}

/// The engine's answer for one participation id. Recorded once; every
/// re-submission returns this exact value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawOutcome {
    pub participation_id: ParticipationId,
    pub campaign_id: CampaignId,
    #[serde(flatten)]
    pub result: DrawResult,
    pub decided_at: Timestamp,
    /// Every random draw made on the way to this outcome, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rng_trace: Vec<RngTrace>,
}

impl DrawOutcome {
    pub fn is_win(&self) -> bool {
        self.result.is_win()
    }
}
