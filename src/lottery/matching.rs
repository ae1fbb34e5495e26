use std::collections::BTreeMap;

use crate::model::*;

/// How a slot ended the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    Unmatched,
    /// Won `room`, which sits at `rank` in the slot's preference list.
    Preferred { room: String, rank: usize },
    /// Got `room` from the random leftover pass.
    Leftover { room: String },
}

impl SlotOutcome {
    pub fn room(&self) -> Option<&str> {
        match self {
            SlotOutcome::Unmatched => None,
            SlotOutcome::Preferred { room, .. } | SlotOutcome::Leftover { room } => Some(room),
        }
    }
}

/// Result of matching one day.
#[derive(Debug, Clone)]
pub struct DayMatching {
    /// Every eligible room → index of the request holding it.
    pub claims: BTreeMap<String, Option<usize>>,
    /// One outcome per request, in request order.
    pub outcomes: Vec<SlotOutcome>,
    /// Proposal attempts made, wasted ones included.
    pub proposals: usize,
}

impl DayMatching {
    pub fn unmatched(&self) -> impl Iterator<Item = usize> + '_ {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o, SlotOutcome::Unmatched))
            .map(|(i, _)| i)
    }

    pub fn unclaimed_rooms(&self) -> impl Iterator<Item = &str> {
        self.claims
            .iter()
            .filter(|(_, c)| c.is_none())
            .map(|(r, _)| r.as_str())
    }
}

/// Deferred acceptance for one day.
///
/// Requests propose in list order, one preference per turn, passes repeating
/// until a whole pass makes no proposal. A preference is consumed whether or
/// not it succeeds. A claimed room changes hands only to a strictly higher
/// credit; on equal credit the earlier claim stands. Evicted requests resume
/// from their next unused preference. Preferences naming rooms outside
/// `rooms` are wasted.
///
/// `credits[i]` is the credit of `requests[i]`'s club.
pub fn match_day(requests: &[AtomicRequest], credits: &[Credit], rooms: &[String]) -> DayMatching {
    debug_assert_eq!(requests.len(), credits.len());

    let mut claims: BTreeMap<String, Option<usize>> =
        rooms.iter().map(|r| (r.clone(), None)).collect();
    let mut next_pref = vec![0usize; requests.len()];
    let mut outcomes = vec![SlotOutcome::Unmatched; requests.len()];
    let mut proposals = 0usize;

    loop {
        let mut proposed = false;

        for (i, request) in requests.iter().enumerate() {
            if !matches!(outcomes[i], SlotOutcome::Unmatched) {
                continue;
            }
            let rank = next_pref[i];
            let Some(room) = request.preferences.get(rank) else {
                continue; // exhausted
            };
            next_pref[i] += 1;
            proposals += 1;
            proposed = true;

            let Some(claim) = claims.get_mut(room) else {
                continue;
            };
            match *claim {
                None => {
                    *claim = Some(i);
                    outcomes[i] = SlotOutcome::Preferred {
                        room: room.clone(),
                        rank,
                    };
                }
                Some(incumbent) if credits[incumbent] < credits[i] => {
                    *claim = Some(i);
                    outcomes[incumbent] = SlotOutcome::Unmatched;
                    outcomes[i] = SlotOutcome::Preferred {
                        room: room.clone(),
                        rank,
                    };
                }
                Some(_) => {}
            }
        }

        if !proposed {
            break;
        }
    }

    DayMatching {
        claims,
        outcomes,
        proposals,
    }
}
