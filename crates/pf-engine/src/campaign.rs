//! Campaign and prize configuration
//!
//! Read-only input to the engine. Campaign authoring lives elsewhere; the
//! engine only validates a snapshot and draws against it. Stock fields are
//! mutated exclusively through the [`crate::store::DrawStore`] primitives,
//! never through this model.

use pf_core::{CampaignId, EngineError, EngineResult, PrizeId, SlotId, Timestamp};
use serde::{Deserialize, Serialize};

/// Anti-fraud policy applied per campaign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FraudPolicy {
    /// Minimum seconds between two draws by the same identity.
    pub cooldown_secs: u64,
    /// Maximum draws per identity for the whole campaign.
    pub max_participations: u32,
}

impl Default for FraudPolicy {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            max_participations: 10,
        }
    }
}

/// A calendar time slot during which a prize can be won exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: SlotId,
    /// Inclusive start of the eligibility window.
    pub start: Timestamp,
    /// Exclusive end of the eligibility window.
    pub end: Timestamp,
    /// Set once, atomically paired with a stock decrement.
    pub consumed: bool,
}

impl TimeSlot {
    pub fn new(id: impl Into<SlotId>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            consumed: false,
        }
    }

    /// Slot window contains `now` (`start <= now < end`).
    pub fn contains(&self, now: Timestamp) -> bool {
        self.start <= now && now < self.end
    }
}

/// Kind-specific prize payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrizeKind {
    /// Winnable only inside a configured time slot, independent of
    /// probability.
    Calendar { slots: Vec<TimeSlot> },
    /// Winnable via the weighted random draw. The weight only counts
    /// while stock remains.
    Probability { weight: f64 },
}

/// A single awardable prize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prize {
    pub id: PrizeId,
    pub campaign_id: CampaignId,
    /// Display label, carried into audit records as a historical snapshot.
    pub label: String,
    #[serde(flatten)]
    pub kind: PrizeKind,
    /// Immutable total number of awardable units.
    pub total_stock: u32,
    /// Remaining units. Snapshot value; authoritative state lives in the
    /// persistence backend.
    pub remaining_stock: u32,
}

impl Prize {
    /// Stock remains (snapshot view).
    pub fn is_available(&self) -> bool {
        self.remaining_stock > 0
    }

    pub fn is_calendar(&self) -> bool {
        matches!(self.kind, PrizeKind::Calendar { .. })
    }

    /// Weight counted by the probability resolver: the configured weight
    /// while stock remains, zero otherwise.
    pub fn effective_weight(&self) -> f64 {
        match self.kind {
            PrizeKind::Probability { weight } if self.is_available() => weight,
            _ => 0.0,
        }
    }
}

/// Complete campaign configuration snapshot.
///
/// Prize priority equals declaration order: it breaks calendar-slot ties
/// and fixes the weight partition layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub prizes: Vec<Prize>,
    /// Explicit losing share of the probability mass. Defaults to 0,
    /// meaning the configured weights represent the full mass. Never
    /// normalized dynamically.
    #[serde(default)]
    pub no_win_weight: f64,
    #[serde(default)]
    pub fraud_policy: FraudPolicy,
}

impl Campaign {
    pub fn new(id: impl Into<CampaignId>) -> Self {
        Self {
            id: id.into(),
            prizes: Vec::new(),
            no_win_weight: 0.0,
            fraud_policy: FraudPolicy::default(),
        }
    }

    pub fn with_no_win_weight(mut self, weight: f64) -> Self {
        self.no_win_weight = weight;
        self
    }

    pub fn with_fraud_policy(mut self, policy: FraudPolicy) -> Self {
        self.fraud_policy = policy;
        self
    }

    pub fn push_prize(&mut self, prize: Prize) {
        self.prizes.push(prize);
    }

    pub fn prize(&self, id: &PrizeId) -> Option<&Prize> {
        self.prizes.iter().find(|p| &p.id == id)
    }

    /// Reject malformed configuration before any resolver runs.
    ///
    /// No side effects: a campaign that fails here never touches stock,
    /// anti-fraud state or the audit sink.
    pub fn validate(&self) -> EngineResult<()> {
        if self.id.is_empty() {
            return Err(EngineError::Validation("empty campaign id".into()));
        }
        if !self.no_win_weight.is_finite() || self.no_win_weight < 0.0 {
            return Err(EngineError::Validation(format!(
                "campaign {}: no_win_weight must be a finite non-negative number",
                self.id
            )));
        }
        for prize in &self.prizes {
            if prize.id.is_empty() {
                return Err(EngineError::Validation(format!(
                    "campaign {}: prize with empty id",
                    self.id
                )));
            }
            if prize.remaining_stock > prize.total_stock {
                return Err(EngineError::Validation(format!(
                    "prize {}: remaining_stock {} exceeds total_stock {}",
                    prize.id, prize.remaining_stock, prize.total_stock
                )));
            }
            match &prize.kind {
                PrizeKind::Probability { weight } => {
                    if !weight.is_finite() || *weight <= 0.0 {
                        return Err(EngineError::Validation(format!(
                            "prize {}: weight must be a finite positive number",
                            prize.id
                        )));
                    }
                }
                PrizeKind::Calendar { slots } => {
                    for slot in slots {
                        if slot.start >= slot.end {
                            return Err(EngineError::Validation(format!(
                                "prize {} slot {}: start must precede end",
                                prize.id, slot.id
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
