use ulid::Ulid;

use crate::model::*;

use super::matching::DayMatching;
use super::normalize::DayPartition;

/// Fold a day's claims back to club names.
pub fn day_allocation(
    day: &str,
    requests: &[AtomicRequest],
    matching: &DayMatching,
    partition: &DayPartition,
) -> DayAllocation {
    let rooms = matching
        .claims
        .iter()
        .map(|(room, claim)| {
            let club = claim.map(|i| resolve_owner(&requests[i].key, partition));
            (room.clone(), club)
        })
        .collect();
    DayAllocation {
        day: day.to_string(),
        rooms,
    }
}

fn resolve_owner(key: &SlotKey, partition: &DayPartition) -> String {
    match partition.owner(key) {
        Some(club) => club.to_string(),
        None => {
            tracing::warn!("no owner recorded for slot {key}, reporting raw key");
            key.to_string()
        }
    }
}

/// Tallies of one run, for logs and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub requests: usize,
    pub proposals: usize,
    pub preferred: usize,
    pub leftover: usize,
    pub unmatched: usize,
}

/// Everything a run produced, before it is committed.
#[derive(Debug, Clone)]
pub struct LotteryOutcome {
    pub allocations: Vec<DayAllocation>,
    /// New credit of every known club.
    pub credits: Vec<(String, Credit)>,
    pub credit_changes: Vec<CreditChange>,
    /// Reservations this run consumes.
    pub consumed: Vec<Ulid>,
    pub stats: RunStats,
}

impl LotteryOutcome {
    pub fn into_record(self, id: Ulid, executed_at: Ms, seed: u64) -> (RunRecord, Vec<(String, Credit)>, Vec<Ulid>) {
        let record = RunRecord {
            id,
            executed_at,
            seed,
            allocations: self.allocations,
            credit_changes: self.credit_changes,
        };
        (record, self.credits, self.consumed)
    }
}
