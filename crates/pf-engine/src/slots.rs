//! Calendar slot resolution
//!
//! Pure candidate selection: no side effects, reservation is deferred to
//! the stock ledger. The orchestrator feeds failed slot ids back through
//! the exclusion set to walk to the next-best candidate.

use std::collections::HashSet;

use pf_core::{PrizeId, SlotId, Timestamp};

use crate::campaign::{Campaign, PrizeKind};

/// One eligible calendar candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCandidate {
    pub prize_id: PrizeId,
    pub slot_id: SlotId,
    pub start: Timestamp,
}

/// Resolves calendar instant-win candidates.
pub struct SlotResolver;

impl SlotResolver {
    /// Return the single best eligible candidate at `now`, if any.
    ///
    /// Eligibility: `start <= now < end`, not consumed, prize stock
    /// remaining, slot not excluded. Earliest `start` wins; ties fall
    /// back to campaign declaration order (the scan order below).
    pub fn resolve(
        campaign: &Campaign,
        now: Timestamp,
        excluded: &HashSet<SlotId>,
    ) -> Option<SlotCandidate> {
        let mut best: Option<SlotCandidate> = None;

        for prize in &campaign.prizes {
            let PrizeKind::Calendar { slots } = &prize.kind else {
                continue;
            };
            if !prize.is_available() {
                continue;
            }
            for slot in slots {
                if slot.consumed || excluded.contains(&slot.id) || !slot.contains(now) {
                    continue;
                }
                // Strictly earlier start replaces; equal start keeps the
                // earlier-declared candidate.
                let replaces = match &best {
                    Some(current) => slot.start < current.start,
                    None => true,
                };
                if replaces {
                    best = Some(SlotCandidate {
                        prize_id: prize.id.clone(),
                        slot_id: slot.id.clone(),
                        start: slot.start,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{Prize, TimeSlot};
    use chrono::{TimeZone, Utc};

    fn ts(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    fn calendar_prize(id: &str, slots: Vec<TimeSlot>, stock: u32) -> Prize {
        Prize {
            id: id.into(),
            campaign_id: "c1".into(),
            label: id.to_string(),
            kind: PrizeKind::Calendar { slots },
            total_stock: stock,
            remaining_stock: stock,
        }
    }

    #[test]
    fn test_eligible_slot_is_returned() {
        let mut campaign = Campaign::new("c1");
        campaign.push_prize(calendar_prize(
            "x",
            vec![TimeSlot::new("s1", ts(10, 0), ts(10, 5))],
            1,
        ));

        let hit = SlotResolver::resolve(&campaign, ts(10, 2), &HashSet::new()).unwrap();
        assert_eq!(hit.slot_id, "s1".into());
        assert_eq!(hit.prize_id, "x".into());
    }

    #[test]
    fn test_window_bounds_are_half_open() {
        let mut campaign = Campaign::new("c1");
        campaign.push_prize(calendar_prize(
            "x",
            vec![TimeSlot::new("s1", ts(10, 0), ts(10, 5))],
            1,
        ));

        assert!(SlotResolver::resolve(&campaign, ts(10, 0), &HashSet::new()).is_some());
        assert!(SlotResolver::resolve(&campaign, ts(10, 5), &HashSet::new()).is_none());
    }

    #[test]
    fn test_consumed_and_exhausted_slots_are_skipped() {
        let mut consumed = TimeSlot::new("s1", ts(10, 0), ts(11, 0));
        consumed.consumed = true;
        let mut campaign = Campaign::new("c1");
        campaign.push_prize(calendar_prize("x", vec![consumed], 1));
        campaign.push_prize(calendar_prize(
            "y",
            vec![TimeSlot::new("s2", ts(10, 0), ts(11, 0))],
            0, // no stock
        ));

        assert!(SlotResolver::resolve(&campaign, ts(10, 30), &HashSet::new()).is_none());
    }

    #[test]
    fn test_earliest_start_wins() {
        let mut campaign = Campaign::new("c1");
        campaign.push_prize(calendar_prize(
            "late",
            vec![TimeSlot::new("s-late", ts(10, 0), ts(12, 0))],
            1,
        ));
        campaign.push_prize(calendar_prize(
            "early",
            vec![TimeSlot::new("s-early", ts(9, 0), ts(12, 0))],
            1,
        ));

        let hit = SlotResolver::resolve(&campaign, ts(10, 30), &HashSet::new()).unwrap();
        assert_eq!(hit.prize_id, "early".into());
    }

    #[test]
    fn test_equal_start_falls_back_to_declaration_order() {
        let mut campaign = Campaign::new("c1");
        campaign.push_prize(calendar_prize(
            "first",
            vec![TimeSlot::new("s-first", ts(10, 0), ts(12, 0))],
            1,
        ));
        campaign.push_prize(calendar_prize(
            "second",
            vec![TimeSlot::new("s-second", ts(10, 0), ts(12, 0))],
            1,
        ));

        let hit = SlotResolver::resolve(&campaign, ts(10, 30), &HashSet::new()).unwrap();
        assert_eq!(hit.prize_id, "first".into());
    }

    #[test]
    fn test_exclusion_moves_to_next_candidate() {
        let mut campaign = Campaign::new("c1");
        campaign.push_prize(calendar_prize(
            "x",
            vec![
                TimeSlot::new("s1", ts(9, 0), ts(12, 0)),
                TimeSlot::new("s2", ts(10, 0), ts(12, 0)),
            ],
            2,
        ));

        let mut excluded = HashSet::new();
        excluded.insert(SlotId::new("s1"));
        let hit = SlotResolver::resolve(&campaign, ts(10, 30), &excluded).unwrap();
        assert_eq!(hit.slot_id, "s2".into());

        excluded.insert(SlotId::new("s2"));
        assert!(SlotResolver::resolve(&campaign, ts(10, 30), &excluded).is_none());
    }
}
