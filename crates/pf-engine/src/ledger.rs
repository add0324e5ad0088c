//! Stock ledger — the single correctness-bearing primitive
//!
//! Every other component computes over a snapshot that may be stale by
//! the time reservation is attempted; this wrapper turns the store's
//! conditional updates into a commit-or-exhausted answer. Concurrent
//! callers racing for the last unit see exactly one `Committed`.

use pf_core::{EngineResult, PrizeId, SlotId};

use crate::store::DrawStore;

/// Result of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// One stock unit (and slot, for calendar prizes) durably committed.
    Committed,
    /// Lost the race or stock is gone. Expected under contention; the
    /// orchestrator retries with the next candidate.
    Exhausted,
}

/// Atomic reservation of one unit of a prize.
pub struct StockLedger<'a> {
    store: &'a dyn DrawStore,
}

impl<'a> StockLedger<'a> {
    pub fn new(store: &'a dyn DrawStore) -> Self {
        Self { store }
    }

    /// Reserve one unit of `prize`. For calendar candidates the slot is
    /// consumed and the stock decremented in one transaction.
    pub fn try_reserve(
        &self,
        prize: &PrizeId,
        slot: Option<&SlotId>,
    ) -> EngineResult<Reservation> {
        let committed = match slot {
            Some(slot) => self.store.conditional_consume_slot(prize, slot)?,
            None => self.store.conditional_decrement(prize)?,
        };
        if committed {
            Ok(Reservation::Committed)
        } else {
            log::debug!("reservation lost for prize {prize} (slot {slot:?})");
            Ok(Reservation::Exhausted)
        }
    }
}
