/// Ranked preferences per slot.
pub const MAX_PREFERENCES: usize = 3;

/// Slots one reservation may request on a single day.
pub const MAX_SLOTS_PER_DAY: usize = 16;

/// Days one reservation may name.
pub const MAX_DAYS_PER_RESERVATION: usize = 31;

/// Days one `ROOM OPEN|CLOSE` may name.
pub const MAX_DAYS_PER_ROOM_UPDATE: usize = 366;

/// Club, room and day labels.
pub const MAX_NAME_LEN: usize = 128;

pub const MAX_CLUBS: usize = 10_000;
pub const MAX_ROOMS: usize = 10_000;
pub const MAX_PENDING_RESERVATIONS: usize = 100_000;

/// Upper bound for `HISTORY n`.
pub const MAX_HISTORY_PAGE: usize = 1_000;

pub const DEFAULT_HISTORY_PAGE: usize = 10;

/// Longest accepted protocol line in bytes.
pub const MAX_LINE_LEN: usize = 64 * 1024;
