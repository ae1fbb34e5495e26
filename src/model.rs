use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Priority credit. Higher wins contested rooms.
pub type Credit = u64;

/// A requester group competing for rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub name: String,
    pub credit: Credit,
}

/// A shared room. Open on every day except those listed in `closed_days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub closed_days: BTreeSet<String>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            closed_days: BTreeSet::new(),
        }
    }

    pub fn is_open_on(&self, day: &str) -> bool {
        !self.closed_days.contains(day)
    }
}

/// One ranked preference list. Blank entries are allowed and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub preferences: Vec<String>,
}

impl Slot {
    pub fn new<S: Into<String>>(preferences: impl IntoIterator<Item = S>) -> Self {
        Self {
            preferences: preferences.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.preferences.iter().all(|p| is_blank_preference(p))
    }
}

/// Empty or whitespace-only preference entry.
pub fn is_blank_preference(pref: &str) -> bool {
    pref.trim().is_empty()
}

/// Every slot a club asks for on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySelection {
    pub day: String,
    pub slots: Vec<Slot>,
}

/// A submitted, not yet consumed reservation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub club: String,
    pub submitted_at: Ms,
    pub selections: Vec<DaySelection>,
}

/// Identity of one matchable slot: the owning club plus the slot's ordinal
/// among all of that club's slots for the day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub club: String,
    pub slot: usize,
}

impl SlotKey {
    pub fn new(club: impl Into<String>, slot: usize) -> Self {
        Self {
            club: club.into(),
            slot,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.club, self.slot)
    }
}

/// A single slot expanded out of a reservation. Lives for one run only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicRequest {
    pub key: SlotKey,
    pub day: String,
    /// Non-blank preferences in submission order.
    pub preferences: Vec<String>,
}

impl AtomicRequest {
    pub fn club(&self) -> &str {
        &self.key.club
    }
}

/// Final assignment of one day: every eligible room, assigned or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAllocation {
    pub day: String,
    pub rooms: BTreeMap<String, Option<String>>,
}

impl DayAllocation {
    pub fn assigned_to(&self, room: &str) -> Option<&str> {
        self.rooms.get(room).and_then(|c| c.as_deref())
    }

    pub fn rooms_of<'a>(&'a self, club: &'a str) -> impl Iterator<Item = &'a str> {
        self.rooms
            .iter()
            .filter(move |(_, c)| c.as_deref() == Some(club))
            .map(|(r, _)| r.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditChange {
    pub club: String,
    pub before: Credit,
    pub after: Credit,
}

/// One executed lottery, kept in the append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Ulid,
    pub executed_at: Ms,
    /// Seed of the leftover shuffle; replaying with it reproduces the run.
    pub seed: u64,
    /// Days in processing order.
    pub allocations: Vec<DayAllocation>,
    pub credit_changes: Vec<CreditChange>,
}

impl RunRecord {
    pub fn day(&self, day: &str) -> Option<&DayAllocation> {
        self.allocations.iter().find(|a| a.day == day)
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ClubRegistered {
        name: String,
        credit: Credit,
    },
    ClubRemoved {
        name: String,
    },
    RoomRegistered {
        name: String,
    },
    RoomRemoved {
        name: String,
    },
    /// Open or close one room on every listed day.
    RoomDayStatusSet {
        room: String,
        days: Vec<String>,
        open: bool,
    },
    ReservationSubmitted {
        reservation: Reservation,
    },
    /// A run commits as one event so credits, history and request consumption
    /// are never observed half-applied.
    LotteryCompleted {
        record: RunRecord,
        credits: Vec<(String, Credit)>,
        consumed: Vec<Ulid>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_slot_detection() {
        assert!(Slot::new(["", " ", ""]).is_blank());
        assert!(Slot::default().is_blank());
        assert!(!Slot::new(["", "C101"]).is_blank());
    }

    #[test]
    fn room_closed_days() {
        let mut room = Room::new("C101");
        assert!(room.is_open_on("7/14"));
        room.closed_days.insert("7/14".into());
        assert!(!room.is_open_on("7/14"));
        assert!(room.is_open_on("7/15"));
    }

    #[test]
    fn slot_key_display() {
        assert_eq!(SlotKey::new("chess", 2).to_string(), "chess#2");
    }

    #[test]
    fn day_allocation_lookup() {
        let mut rooms = BTreeMap::new();
        rooms.insert("A".to_string(), Some("chess".to_string()));
        rooms.insert("B".to_string(), None);
        rooms.insert("C".to_string(), Some("chess".to_string()));
        let alloc = DayAllocation {
            day: "7/14".into(),
            rooms,
        };
        assert_eq!(alloc.assigned_to("A"), Some("chess"));
        assert_eq!(alloc.assigned_to("B"), None);
        assert_eq!(alloc.assigned_to("Z"), None);
        assert_eq!(alloc.rooms_of("chess").collect::<Vec<_>>(), vec!["A", "C"]);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationSubmitted {
            reservation: Reservation {
                id: Ulid::new(),
                club: "chess".into(),
                submitted_at: 1_700_000_000_000,
                selections: vec![DaySelection {
                    day: "7/14".into(),
                    slots: vec![Slot::new(["C101", "", "C202"])],
                }],
            },
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
