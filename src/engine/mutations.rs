use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{error, info};
use ulid::Ulid;

use crate::limits::*;
use crate::lottery;
use crate::model::*;
use crate::observability;

use super::{now_ms, Engine, EngineError};

/// What a lottery trigger hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct LotteryReport {
    pub message: String,
    /// True when the result could not be persisted. Nothing was applied:
    /// credits and pending reservations are as they were before the run.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub record: RunRecord,
}

fn validate_label(kind: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::Invalid(format!("{kind} must not be blank")));
    }
    if value.trim() != value {
        return Err(EngineError::Invalid(format!(
            "{kind} must not start or end with whitespace"
        )));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(EngineError::Invalid(format!(
            "{kind} longer than {MAX_NAME_LEN} bytes"
        )));
    }
    Ok(())
}

fn validate_selections(selections: &[DaySelection]) -> Result<(), EngineError> {
    if selections.is_empty() {
        return Err(EngineError::Invalid("reservation names no day".into()));
    }
    if selections.len() > MAX_DAYS_PER_RESERVATION {
        return Err(EngineError::LimitExceeded("too many days in reservation"));
    }
    for selection in selections {
        validate_label("day", &selection.day)?;
        if selection.slots.len() > MAX_SLOTS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many slots for one day"));
        }
        for slot in &selection.slots {
            if slot.preferences.len() > MAX_PREFERENCES {
                return Err(EngineError::Invalid(format!(
                    "slot on {} lists {} preferences (max {MAX_PREFERENCES})",
                    selection.day,
                    slot.preferences.len()
                )));
            }
            if slot.preferences.iter().any(|p| p.len() > MAX_NAME_LEN) {
                return Err(EngineError::Invalid(format!(
                    "room name longer than {MAX_NAME_LEN} bytes"
                )));
            }
        }
    }
    Ok(())
}

impl Engine {
    pub async fn register_club(&self, name: &str, credit: Credit) -> Result<(), EngineError> {
        validate_label("club name", name)?;
        let mut store = self.store.write().await;
        if store.club(name).is_some() {
            return Err(EngineError::AlreadyExists(name.to_string()));
        }
        if store.club_count() >= MAX_CLUBS {
            return Err(EngineError::LimitExceeded("too many clubs"));
        }
        let event = Event::ClubRegistered {
            name: name.to_string(),
            credit,
        };
        self.persist_and_apply(&mut store, &event).await
    }

    /// Remove a club together with its pending reservations.
    pub async fn remove_club(&self, name: &str) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        if store.club(name).is_none() {
            return Err(EngineError::ClubNotFound(name.to_string()));
        }
        let event = Event::ClubRemoved {
            name: name.to_string(),
        };
        self.persist_and_apply(&mut store, &event).await
    }

    pub async fn register_room(&self, name: &str) -> Result<(), EngineError> {
        validate_label("room name", name)?;
        let mut store = self.store.write().await;
        if store.room(name).is_some() {
            return Err(EngineError::AlreadyExists(name.to_string()));
        }
        if store.room_count() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        let event = Event::RoomRegistered {
            name: name.to_string(),
        };
        self.persist_and_apply(&mut store, &event).await
    }

    pub async fn remove_room(&self, name: &str) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        if store.room(name).is_none() {
            return Err(EngineError::RoomNotFound(name.to_string()));
        }
        let event = Event::RoomRemoved {
            name: name.to_string(),
        };
        self.persist_and_apply(&mut store, &event).await
    }

    /// Open or close a room on each of `days`, committed as one event. Closed
    /// rooms are not offered to the lottery on those days.
    pub async fn set_room_open<S: AsRef<str>>(
        &self,
        room: &str,
        days: &[S],
        open: bool,
    ) -> Result<(), EngineError> {
        if days.is_empty() {
            return Err(EngineError::Invalid("no day given".into()));
        }
        if days.len() > MAX_DAYS_PER_ROOM_UPDATE {
            return Err(EngineError::LimitExceeded("too many days in room update"));
        }
        for day in days {
            validate_label("day", day.as_ref())?;
        }
        let mut store = self.store.write().await;
        if store.room(room).is_none() {
            return Err(EngineError::RoomNotFound(room.to_string()));
        }
        let event = Event::RoomDayStatusSet {
            room: room.to_string(),
            days: days.iter().map(|d| d.as_ref().to_string()).collect(),
            open,
        };
        self.persist_and_apply(&mut store, &event).await
    }

    /// Queue a reservation for the next run. Preferences may name rooms that
    /// do not exist; they simply never match.
    pub async fn submit_reservation(
        &self,
        club: &str,
        selections: Vec<DaySelection>,
    ) -> Result<Ulid, EngineError> {
        validate_selections(&selections)?;
        let mut store = self.store.write().await;
        if store.club(club).is_none() {
            return Err(EngineError::ClubNotFound(club.to_string()));
        }
        if store.pending().len() >= MAX_PENDING_RESERVATIONS {
            return Err(EngineError::LimitExceeded("too many pending reservations"));
        }
        let id = Ulid::new();
        let event = Event::ReservationSubmitted {
            reservation: Reservation {
                id,
                club: club.to_string(),
                submitted_at: now_ms(),
                selections,
            },
        };
        self.persist_and_apply(&mut store, &event).await?;
        Ok(id)
    }

    /// Run the lottery over every pending reservation.
    ///
    /// The run holds the store write lock from snapshot to apply and commits
    /// as a single WAL event. If that commit fails the computed result is
    /// still returned, flagged `degraded`, and nothing is applied.
    pub async fn run_lottery(&self) -> Result<LotteryReport, EngineError> {
        let _gate = self.run_gate.try_lock().map_err(|_| {
            metrics::counter!(observability::LOTTERY_RUNS_TOTAL, "outcome" => "busy").increment(1);
            EngineError::RunInProgress
        })?;
        let started = std::time::Instant::now();
        let mut store = self.store.write().await;

        let seed = self.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let clubs = store.clubs();
        let snapshot = &*store;
        let outcome = lottery::run(
            &clubs,
            snapshot.pending(),
            |day| snapshot.eligible_rooms(day),
            &mut rng,
        )
        .map_err(|e| {
            metrics::counter!(observability::LOTTERY_RUNS_TOTAL, "outcome" => "rejected").increment(1);
            error!("lottery rejected: {e}");
            EngineError::from(e)
        })?;

        let stats = outcome.stats;
        let (record, credits, consumed) = outcome.into_record(Ulid::new(), now_ms(), seed);
        let event = Event::LotteryCompleted {
            record: record.clone(),
            credits,
            consumed,
        };

        let report = match self.persist_and_apply(&mut store, &event).await {
            Ok(()) => {
                metrics::counter!(observability::LOTTERY_RUNS_TOTAL, "outcome" => "committed").increment(1);
                metrics::counter!(observability::ROOMS_ASSIGNED_TOTAL, "via" => "preference")
                    .increment(stats.preferred as u64);
                metrics::counter!(observability::ROOMS_ASSIGNED_TOTAL, "via" => "leftover")
                    .increment(stats.leftover as u64);
                metrics::counter!(observability::SLOTS_UNMATCHED_TOTAL).increment(stats.unmatched as u64);
                info!(
                    run = %record.id,
                    seed,
                    days = record.allocations.len(),
                    requests = stats.requests,
                    preferred = stats.preferred,
                    leftover = stats.leftover,
                    unmatched = stats.unmatched,
                    "lottery committed"
                );
                LotteryReport {
                    message: "lottery completed".into(),
                    degraded: false,
                    note: None,
                    record,
                }
            }
            Err(e) => {
                metrics::counter!(observability::LOTTERY_RUNS_TOTAL, "outcome" => "degraded").increment(1);
                error!(run = %record.id, "lottery result not persisted: {e}");
                LotteryReport {
                    message: "lottery completed (degraded)".into(),
                    degraded: true,
                    note: Some(format!(
                        "result was not saved ({e}); credits and pending reservations are unchanged"
                    )),
                    record,
                }
            }
        };
        metrics::histogram!(observability::LOTTERY_RUN_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(report)
    }
}
