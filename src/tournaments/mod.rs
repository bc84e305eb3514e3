use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{error::CoreError, schema::tournaments};

pub mod admission;
pub mod checkin;
pub mod finalize;
pub mod registration;

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub game: String,
    pub mode: String,
    pub status: String,
    pub entry_fee: i64,
    pub current_teams: i64,
    pub max_teams: i64,
    pub max_waitlist_slots: i64,
    pub start_date: NaiveDateTime,
    pub checkin_window_minutes: i64,
    pub auto_finalize: bool,
    pub finalized_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Tournament {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        tournament_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Tournament, CoreError> {
        tournaments::table
            .filter(tournaments::id.eq(tournament_id))
            .first::<Tournament>(conn)
            .optional()?
            .ok_or(CoreError::TournamentNotFound)
    }

    pub fn accepts_registrations(&self) -> bool {
        matches!(self.status.as_str(), "upcoming" | "open")
    }

    pub fn has_started(&self, now: NaiveDateTime) -> bool {
        now >= self.start_date
    }

    pub fn is_solo(&self) -> bool {
        self.mode == "solo"
    }
}

/// Waitlist capacity applied when a tournament is created without an
/// explicit value: half the bracket, but never zero.
pub fn default_max_waitlist_slots(max_teams: i64) -> i64 {
    (max_teams / 2).max(1)
}
