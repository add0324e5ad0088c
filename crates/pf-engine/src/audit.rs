//! Audit trail
//!
//! One immutable record per participation id, capturing the full decision
//! path: which resolver fired, which candidates were considered, how each
//! reservation went. The append is best-effort and happens after the
//! outcome is durably recorded; a failed append is logged, never
//! escalated to the participant.

use parking_lot::Mutex;
use pf_core::{CampaignId, ParticipationId, PrizeId, SlotId, StoreError, Timestamp, TraceId};
use serde::{Deserialize, Serialize};

use crate::outcome::{DrawOutcome, RngTrace};

/// One step of the decision path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DecisionStep {
    GatePassed,
    CalendarCandidate {
        prize_id: PrizeId,
        slot_id: SlotId,
    },
    WeightedDraw {
        trace: RngTrace,
        picked: Option<PrizeId>,
    },
    ReservationCommitted {
        prize_id: PrizeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        slot_id: Option<SlotId>,
    },
    ReservationExhausted {
        prize_id: PrizeId,
        #[serde(skip_serializing_if = "Option::is_none")]
        slot_id: Option<SlotId>,
    },
    RetryBudgetExhausted,
    NoCandidate,
}

/// Immutable audit record; exactly one per participation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub participation_id: ParticipationId,
    pub campaign_id: CampaignId,
    pub trace_id: TraceId,
    pub decided_at: Timestamp,
    pub path: Vec<DecisionStep>,
    pub outcome: DrawOutcome,
}

/// Audit sink collaborator. Fire-and-forget from the engine's point of
/// view: the orchestrator logs failures and moves on.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError>;
}

/// Collects records in memory; backs tests and the simulator.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    fail: Mutex<bool>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent append fail. Test hook.
    pub fn fail_appends(&self) {
        *self.fail.lock() = true;
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError> {
        if *self.fail.lock() {
            return Err(StoreError::Unavailable("audit sink down".into()));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
