use rand::seq::SliceRandom;
use rand::Rng;

use super::matching::{DayMatching, SlotOutcome};

/// Pair still-unmatched requests with still-unclaimed rooms at random.
///
/// Requests keep their list order; the free rooms (name order) get a uniform
/// Fisher–Yates shuffle and are dealt out position by position. Whatever is
/// left on either side stays unassigned. Returns the number of pairs made.
pub fn assign_leftovers<R: Rng + ?Sized>(matching: &mut DayMatching, rng: &mut R) -> usize {
    let unmatched: Vec<usize> = matching.unmatched().collect();
    if unmatched.is_empty() {
        return 0;
    }
    let mut free: Vec<String> = matching.unclaimed_rooms().map(str::to_string).collect();
    free.shuffle(rng);

    let mut paired = 0;
    for (request, room) in unmatched.into_iter().zip(free) {
        matching.claims.insert(room.clone(), Some(request));
        matching.outcomes[request] = SlotOutcome::Leftover { room };
        paired += 1;
    }
    paired
}
