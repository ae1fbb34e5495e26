use std::collections::{BTreeMap, BTreeSet};

use crate::model::*;

use super::matching::SlotOutcome;
use super::LotteryError;

/// Credit for a slot that got nothing it asked for.
pub const MISS_INCREMENT: Credit = 10;

/// Credit for a slot matched at its first preference.
pub const FIRST_CHOICE_INCREMENT: Credit = 1;

/// Floor every club is lifted to for one run: half the cohort average,
/// rounded down.
pub fn boost_floor(clubs: &[Club]) -> Credit {
    let sum: u128 = clubs.iter().map(|c| c.credit as u128).sum();
    let count = clubs.len().max(1) as u128;
    (sum / (2 * count)) as Credit
}

/// Per-slot increment.
///
/// | outcome              | increment |
/// |----------------------|-----------|
/// | unmatched / leftover | +10       |
/// | rank 0               | +1        |
/// | rank k > 0           | +1 + 2k   |
pub fn slot_increment(outcome: &SlotOutcome) -> Credit {
    match outcome {
        SlotOutcome::Unmatched | SlotOutcome::Leftover { .. } => MISS_INCREMENT,
        SlotOutcome::Preferred { rank, .. } => FIRST_CHOICE_INCREMENT + 2 * *rank as Credit,
    }
}

/// Running credit of every known club during one run.
///
/// Starts at the boosted effective credit and accumulates each processed
/// day's deltas. Only clubs that were active on some day leave the run with a
/// changed credit.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    stored: BTreeMap<String, Credit>,
    running: BTreeMap<String, Credit>,
    active: BTreeSet<String>,
}

impl CreditLedger {
    pub fn boosted(clubs: &[Club]) -> Self {
        let floor = boost_floor(clubs);
        let stored: BTreeMap<String, Credit> =
            clubs.iter().map(|c| (c.name.clone(), c.credit)).collect();
        let running = stored
            .iter()
            .map(|(name, &credit)| (name.clone(), credit.max(floor)))
            .collect();
        Self {
            stored,
            running,
            active: BTreeSet::new(),
        }
    }

    /// Current running credit.
    pub fn credit(&self, club: &str) -> Option<Credit> {
        self.running.get(club).copied()
    }

    /// Credits for a day's proposers, in request order. Constant for the day.
    pub fn credits_for(&self, requests: &[AtomicRequest]) -> Result<Vec<Credit>, LotteryError> {
        requests
            .iter()
            .map(|r| {
                self.credit(r.club())
                    .ok_or_else(|| LotteryError::UnknownClub(r.club().to_string()))
            })
            .collect()
    }

    fn add(&mut self, club: &str, delta: Credit) -> Result<(), LotteryError> {
        let running = self
            .running
            .get_mut(club)
            .ok_or_else(|| LotteryError::UnknownClub(club.to_string()))?;
        *running = running.saturating_add(delta);
        self.active.insert(club.to_string());
        Ok(())
    }

    /// Final credit of every known club, and the changes of the active ones.
    pub fn settle(self) -> (Vec<(String, Credit)>, Vec<CreditChange>) {
        let mut credits = Vec::with_capacity(self.stored.len());
        let mut changes = Vec::with_capacity(self.active.len());
        for (name, before) in self.stored {
            let active = self.active.contains(&name);
            let after = if active { self.running[&name] } else { before };
            if active {
                changes.push(CreditChange {
                    club: name.clone(),
                    before,
                    after,
                });
            }
            credits.push((name, after));
        }
        (credits, changes)
    }
}

/// Apply one day's outcomes to the ledger. Returns each active club's delta.
pub fn settle_day(
    ledger: &mut CreditLedger,
    requests: &[AtomicRequest],
    outcomes: &[SlotOutcome],
) -> Result<BTreeMap<String, Credit>, LotteryError> {
    debug_assert_eq!(requests.len(), outcomes.len());
    let mut deltas: BTreeMap<String, Credit> = BTreeMap::new();
    for (request, outcome) in requests.iter().zip(outcomes) {
        *deltas.entry(request.club().to_string()).or_insert(0) += slot_increment(outcome);
    }
    for (club, delta) in &deltas {
        ledger.add(club, *delta)?;
    }
    Ok(deltas)
}
