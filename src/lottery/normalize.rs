use std::collections::HashMap;

use ulid::Ulid;

use crate::limits::MAX_PREFERENCES;
use crate::model::*;

use super::LotteryError;

/// Atomic requests grouped per day, plus the order days are processed in.
#[derive(Debug, Default)]
pub struct DayPartition {
    /// Days in the order they were first seen while scanning reservations in
    /// submission order. Credit is threaded through days in exactly this order.
    pub order: Vec<String>,
    requests: HashMap<String, Vec<AtomicRequest>>,
    /// Slot key → owning club, captured while expanding.
    owners: HashMap<SlotKey, String>,
    /// Reservations that took part, consumed once the run commits.
    pub consumed: Vec<Ulid>,
}

impl DayPartition {
    pub fn requests(&self, day: &str) -> &[AtomicRequest] {
        self.requests.get(day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(day, requests)` in processing order.
    pub fn days(&self) -> impl Iterator<Item = (&str, &[AtomicRequest])> {
        self.order.iter().map(|d| (d.as_str(), self.requests(d)))
    }

    pub fn owner(&self, key: &SlotKey) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    pub fn request_count(&self) -> usize {
        self.requests.values().map(Vec::len).sum()
    }
}

/// Expand reservations into one atomic request per non-blank slot.
///
/// Slot ordinals count every slot a club submits for a day, blank ones
/// included, across all of its reservations, so keys never collide.
pub fn normalize(reservations: &[Reservation]) -> Result<DayPartition, LotteryError> {
    let mut partition = DayPartition::default();
    let mut ordinals: HashMap<(&str, &str), usize> = HashMap::new();

    for reservation in reservations {
        partition.consumed.push(reservation.id);
        for selection in &reservation.selections {
            if selection.day.trim().is_empty() {
                return Err(LotteryError::MissingDay {
                    club: reservation.club.clone(),
                });
            }
            if !partition.requests.contains_key(&selection.day) {
                partition.order.push(selection.day.clone());
                partition.requests.insert(selection.day.clone(), Vec::new());
            }

            for slot in &selection.slots {
                if slot.preferences.len() > MAX_PREFERENCES {
                    return Err(LotteryError::TooManyPreferences {
                        club: reservation.club.clone(),
                        day: selection.day.clone(),
                        count: slot.preferences.len(),
                    });
                }
                let ordinal = ordinals
                    .entry((selection.day.as_str(), reservation.club.as_str()))
                    .or_insert(0);
                let key = SlotKey::new(reservation.club.as_str(), *ordinal);
                *ordinal += 1;

                let preferences = clean_preferences(&slot.preferences);
                if preferences.is_empty() {
                    continue;
                }
                partition.owners.insert(key.clone(), reservation.club.clone());
                if let Some(day) = partition.requests.get_mut(&selection.day) {
                    day.push(AtomicRequest {
                        key,
                        day: selection.day.clone(),
                        preferences,
                    });
                }
            }
        }
    }

    Ok(partition)
}

/// Drop blanks and repeated rooms, keeping first occurrences in order.
///
/// Entries are trimmed: `" C101"` names room `C101` and a whitespace-only
/// entry is blank. Registration rejects names with surrounding whitespace, so
/// trimming never merges two distinct rooms.
fn clean_preferences(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for pref in raw {
        if is_blank_preference(pref) {
            continue;
        }
        let pref = pref.trim();
        if out.iter().any(|p| p == pref) {
            continue;
        }
        out.push(pref.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(club: &str, selections: Vec<DaySelection>) -> Reservation {
        Reservation {
            id: Ulid::new(),
            club: club.into(),
            submitted_at: 0,
            selections,
        }
    }

    fn day(label: &str, slots: Vec<Slot>) -> DaySelection {
        DaySelection {
            day: label.into(),
            slots,
        }
    }

    #[test]
    fn blanks_removed_order_kept() {
        let p = normalize(&[reservation(
            "chess",
            vec![day("7/14", vec![Slot::new(["", "C202", "C101"])])],
        )])
        .unwrap();
        let reqs = p.requests("7/14");
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].preferences, vec!["C202", "C101"]);
        assert_eq!(reqs[0].key, SlotKey::new("chess", 0));
    }

    #[test]
    fn blank_slot_produces_nothing_but_keeps_ordinal() {
        let p = normalize(&[reservation(
            "chess",
            vec![day(
                "7/14",
                vec![Slot::new(["", "", ""]), Slot::new(["C101"])],
            )],
        )])
        .unwrap();
        let reqs = p.requests("7/14");
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].key.slot, 1);
    }

    #[test]
    fn day_with_only_blank_slots_is_still_ordered() {
        let p = normalize(&[reservation(
            "chess",
            vec![day("7/14", vec![Slot::new([""])])],
        )])
        .unwrap();
        assert_eq!(p.order, vec!["7/14"]);
        assert!(p.requests("7/14").is_empty());
        assert_eq!(p.request_count(), 0);
    }

    #[test]
    fn day_order_is_first_seen_not_sorted() {
        let p = normalize(&[
            reservation("a", vec![day("7/16", vec![Slot::new(["X"])])]),
            reservation(
                "b",
                vec![
                    day("7/14", vec![Slot::new(["X"])]),
                    day("7/16", vec![Slot::new(["Y"])]),
                ],
            ),
            reservation("c", vec![day("7/15", vec![Slot::new(["X"])])]),
        ])
        .unwrap();
        assert_eq!(p.order, vec!["7/16", "7/14", "7/15"]);
        let days: Vec<_> = p.days().map(|(d, r)| (d, r.len())).collect();
        assert_eq!(days, vec![("7/16", 2), ("7/14", 1), ("7/15", 1)]);
    }

    #[test]
    fn same_club_two_reservations_do_not_collide() {
        let p = normalize(&[
            reservation("chess", vec![day("7/14", vec![Slot::new(["A"])])]),
            reservation("chess", vec![day("7/14", vec![Slot::new(["B"])])]),
        ])
        .unwrap();
        let keys: Vec<_> = p.requests("7/14").iter().map(|r| r.key.slot).collect();
        assert_eq!(keys, vec![0, 1]);
        assert_eq!(p.consumed.len(), 2);
    }

    #[test]
    fn duplicate_preferences_collapse() {
        let p = normalize(&[reservation(
            "chess",
            vec![day("7/14", vec![Slot::new(["A", " A", "B"])])],
        )])
        .unwrap();
        assert_eq!(p.requests("7/14")[0].preferences, vec!["A", "B"]);
    }

    #[test]
    fn whitespace_entries_are_blank_and_padding_trimmed() {
        let p = normalize(&[reservation(
            "chess",
            vec![day(
                "7/14",
                vec![Slot::new(["  ", "\t"]), Slot::new([" ", " C101 "])],
            )],
        )])
        .unwrap();
        let reqs = p.requests("7/14");
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].key.slot, 1);
        assert_eq!(reqs[0].preferences, vec!["C101"]);
    }

    #[test]
    fn owners_back_reference() {
        let p = normalize(&[reservation(
            "chess",
            vec![day("7/14", vec![Slot::new(["A"]), Slot::new(["B"])])],
        )])
        .unwrap();
        assert_eq!(p.owner(&SlotKey::new("chess", 1)), Some("chess"));
        assert_eq!(p.owner(&SlotKey::new("go", 0)), None);
    }

    #[test]
    fn too_many_preferences_rejected() {
        let err = normalize(&[reservation(
            "chess",
            vec![day("7/14", vec![Slot::new(["A", "B", "C", "D"])])],
        )])
        .unwrap_err();
        assert!(matches!(err, LotteryError::TooManyPreferences { count: 4, .. }));
    }

    #[test]
    fn missing_day_rejected() {
        let err = normalize(&[reservation("chess", vec![day(" ", vec![])])]).unwrap_err();
        assert_eq!(
            err,
            LotteryError::MissingDay {
                club: "chess".into()
            }
        );
    }
}
