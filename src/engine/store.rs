use std::collections::{BTreeMap, HashSet};

use crate::model::*;

/// In-memory state rebuilt from the WAL: clubs, rooms, pending reservations
/// and run history. Every change goes through [`Store::apply`].
#[derive(Debug, Default)]
pub struct Store {
    clubs: BTreeMap<String, Club>,
    rooms: BTreeMap<String, Room>,
    /// Submission order.
    pending: Vec<Reservation>,
    /// Oldest first.
    history: Vec<RunRecord>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ────────────────────────────────────────────────

    pub fn club(&self, name: &str) -> Option<&Club> {
        self.clubs.get(name)
    }

    pub fn clubs(&self) -> Vec<Club> {
        self.clubs.values().cloned().collect()
    }

    pub fn club_count(&self) -> usize {
        self.clubs.len()
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.rooms.values().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Rooms open on `day`, by name.
    pub fn eligible_rooms(&self, day: &str) -> Vec<String> {
        self.rooms
            .values()
            .filter(|r| r.is_open_on(day))
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn pending(&self) -> &[Reservation] {
        &self.pending
    }

    /// Most recent `n` runs, newest first.
    pub fn history(&self, n: usize) -> Vec<RunRecord> {
        self.history.iter().rev().take(n).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // ── Event application ────────────────────────────────────

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::ClubRegistered { name, credit } => {
                self.clubs.insert(
                    name.clone(),
                    Club {
                        name: name.clone(),
                        credit: *credit,
                    },
                );
            }
            Event::ClubRemoved { name } => {
                self.clubs.remove(name);
                self.pending.retain(|r| &r.club != name);
            }
            Event::RoomRegistered { name } => {
                self.rooms
                    .entry(name.clone())
                    .or_insert_with(|| Room::new(name.as_str()));
            }
            Event::RoomRemoved { name } => {
                self.rooms.remove(name);
            }
            Event::RoomDayStatusSet { room, days, open } => {
                if let Some(room) = self.rooms.get_mut(room) {
                    for day in days {
                        if *open {
                            room.closed_days.remove(day);
                        } else {
                            room.closed_days.insert(day.clone());
                        }
                    }
                }
            }
            Event::ReservationSubmitted { reservation } => {
                self.pending.push(reservation.clone());
            }
            Event::LotteryCompleted {
                record,
                credits,
                consumed,
            } => {
                for (name, credit) in credits {
                    if let Some(club) = self.clubs.get_mut(name) {
                        club.credit = *credit;
                    }
                }
                let consumed: HashSet<_> = consumed.iter().collect();
                self.pending.retain(|r| !consumed.contains(&r.id));
                self.history.push(record.clone());
            }
        }
    }

    /// Minimal event sequence that rebuilds the current state.
    pub fn snapshot(&self) -> Vec<Event> {
        let mut events = Vec::new();
        for club in self.clubs.values() {
            events.push(Event::ClubRegistered {
                name: club.name.clone(),
                credit: club.credit,
            });
        }
        for room in self.rooms.values() {
            events.push(Event::RoomRegistered {
                name: room.name.clone(),
            });
            if !room.closed_days.is_empty() {
                events.push(Event::RoomDayStatusSet {
                    room: room.name.clone(),
                    days: room.closed_days.iter().cloned().collect(),
                    open: false,
                });
            }
        }
        for record in &self.history {
            events.push(Event::LotteryCompleted {
                record: record.clone(),
                credits: Vec::new(),
                consumed: Vec::new(),
            });
        }
        for reservation in &self.pending {
            events.push(Event::ReservationSubmitted {
                reservation: reservation.clone(),
            });
        }
        events
    }
}
