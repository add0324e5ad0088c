//! Probability-weighted draw resolution
//!
//! Builds a cumulative partition of `[0, W)` over the open probability
//! prizes in campaign declaration order, with the configured no-win
//! weight as the trailing losing interval. Intervals are half-open
//! `[low, high)`, so the partition is deterministic given the weight
//! vector. Pure: one snapshot, one random draw, no side effects.

use std::collections::HashSet;

use pf_core::{EngineResult, PrizeId};

use crate::campaign::Campaign;
use crate::outcome::RngTrace;
use crate::rng::RandomSource;

/// Where the draw landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightedPick {
    Prize(PrizeId),
    /// The draw fell in the trailing no-win interval, or no open prize
    /// carried any weight.
    NoWin,
}

/// One `[low, high)` interval of the partition.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightBand {
    pub prize_id: PrizeId,
    pub low: f64,
    pub high: f64,
}

/// Resolves probability-weighted draws among remaining prizes.
pub struct WeightedDrawResolver;

impl WeightedDrawResolver {
    /// Lay out the cumulative partition for the open, non-excluded
    /// probability prizes, in declaration order. The losing interval is
    /// the remainder `[Σ weight, Σ weight + no_win_weight)`.
    pub fn partition(campaign: &Campaign, excluded: &HashSet<PrizeId>) -> Vec<WeightBand> {
        let mut bands = Vec::new();
        let mut cursor = 0.0f64;

        for prize in &campaign.prizes {
            if excluded.contains(&prize.id) {
                continue;
            }
            let weight = prize.effective_weight();
            if weight <= 0.0 {
                continue;
            }
            bands.push(WeightBand {
                prize_id: prize.id.clone(),
                low: cursor,
                high: cursor + weight,
            });
            cursor += weight;
        }

        bands
    }

    /// Draw once against the current partition.
    ///
    /// Returns the pick plus the rng trace for the audit record. When the
    /// partition is empty and no no-win weight is configured, the result
    /// is `NoWin` without consuming a random value.
    pub fn resolve(
        campaign: &Campaign,
        excluded: &HashSet<PrizeId>,
        rng: &mut dyn RandomSource,
    ) -> EngineResult<(WeightedPick, Option<RngTrace>)> {
        let bands = Self::partition(campaign, excluded);
        let prize_mass = bands.last().map(|b| b.high).unwrap_or(0.0);
        let total = prize_mass + campaign.no_win_weight;

        if total <= 0.0 {
            return Ok((WeightedPick::NoWin, None));
        }

        let draw = rng.uniform(0.0, total)?;
        let trace = RngTrace {
            draw,
            total_weight: total,
        };

        for band in &bands {
            if band.low <= draw && draw < band.high {
                log::debug!(
                    "weighted draw {:.4}/{:.4} hit prize {}",
                    draw,
                    total,
                    band.prize_id
                );
                return Ok((WeightedPick::Prize(band.prize_id.clone()), Some(trace)));
            }
        }

        log::debug!("weighted draw {:.4}/{:.4} fell in no-win interval", draw, total);
        Ok((WeightedPick::NoWin, Some(trace)))
    }
}
