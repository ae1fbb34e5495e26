mod aggregate;
mod credit;
mod error;
mod leftover;
mod matching;
mod normalize;

pub use aggregate::{day_allocation, LotteryOutcome, RunStats};
pub use credit::{boost_floor, settle_day, slot_increment, CreditLedger};
pub use error::LotteryError;
pub use leftover::assign_leftovers;
pub use matching::{match_day, DayMatching, SlotOutcome};
pub use normalize::{normalize, DayPartition};

use rand::Rng;
use tracing::debug;

use crate::model::*;

/// Run one lottery: turn pending reservations into per-day room assignments
/// and updated club credits.
///
/// 1. [`normalize`] expands reservations into one atomic request per non-blank
///    slot and records the day order (first seen, submission order).
/// 2. [`CreditLedger::boosted`] lifts every club to at least half the cohort
///    average for this run.
/// 3. For each day in order: [`match_day`] (deferred acceptance, credit
///    tie-break), [`assign_leftovers`] (random), [`settle_day`] (credit deltas
///    fed into the next day).
/// 4. [`day_allocation`] folds slots back to clubs.
///
/// `eligible_rooms(day)` returns the rooms that may be assigned on `day`. No
/// I/O happens here; the only nondeterminism is `rng`.
pub fn run<F, R>(
    clubs: &[Club],
    reservations: &[Reservation],
    eligible_rooms: F,
    rng: &mut R,
) -> Result<LotteryOutcome, LotteryError>
where
    F: Fn(&str) -> Vec<String>,
    R: Rng + ?Sized,
{
    let partition = normalize(reservations)?;
    let mut ledger = CreditLedger::boosted(clubs);
    let mut allocations = Vec::with_capacity(partition.order.len());
    let mut stats = RunStats {
        requests: partition.request_count(),
        ..RunStats::default()
    };

    for (day, requests) in partition.days() {
        let rooms = eligible_rooms(day);
        let credits = ledger.credits_for(requests)?;

        let mut matching = match_day(requests, &credits, &rooms);
        let preferred = requests.len() - matching.unmatched().count();
        let leftover = assign_leftovers(&mut matching, rng);
        let unmatched = requests.len() - preferred - leftover;
        let deltas = settle_day(&mut ledger, requests, &matching.outcomes)?;

        debug!(
            day,
            rooms = rooms.len(),
            requests = requests.len(),
            proposals = matching.proposals,
            preferred,
            leftover,
            unmatched,
            clubs = deltas.len(),
            "day matched"
        );
        stats.proposals += matching.proposals;
        stats.preferred += preferred;
        stats.leftover += leftover;
        stats.unmatched += unmatched;

        allocations.push(day_allocation(day, requests, &matching, &partition));
    }

    let (credits, credit_changes) = ledger.settle();
    Ok(LotteryOutcome {
        allocations,
        credits,
        credit_changes,
        consumed: partition.consumed,
        stats,
    })
}
