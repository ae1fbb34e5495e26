use serde::Serialize;

use crate::limits::*;
use crate::model::*;

use super::Engine;

/// Registry and queue sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub clubs: usize,
    pub rooms: usize,
    pub pending: usize,
    pub runs: usize,
}

impl Engine {
    pub async fn status(&self) -> Status {
        let store = self.store.read().await;
        Status {
            clubs: store.club_count(),
            rooms: store.room_count(),
            pending: store.pending().len(),
            runs: store.history_len(),
        }
    }

    pub async fn clubs(&self) -> Vec<Club> {
        self.store.read().await.clubs()
    }

    pub async fn club(&self, name: &str) -> Option<Club> {
        self.store.read().await.club(name).cloned()
    }

    pub async fn rooms(&self) -> Vec<Room> {
        self.store.read().await.rooms()
    }

    /// Rooms the lottery may assign on `day`.
    pub async fn eligible_rooms(&self, day: &str) -> Vec<String> {
        self.store.read().await.eligible_rooms(day)
    }

    pub async fn pending_reservations(&self) -> Vec<Reservation> {
        self.store.read().await.pending().to_vec()
    }

    /// Most recent runs, newest first. `n` is capped at [`MAX_HISTORY_PAGE`].
    pub async fn history(&self, n: usize) -> Vec<RunRecord> {
        self.store.read().await.history(n.min(MAX_HISTORY_PAGE))
    }
}
