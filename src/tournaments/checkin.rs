//! The check-in gate. Window math is a pure function of the tournament's
//! start time; the per-entrant answer is either "you may check in" or a
//! structured reason, so callers can render something better than a bare
//! failure.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    error::CoreError,
    schema::tournament_registrations,
    tournaments::{
        Tournament,
        registration::{Registration, STATUS_CANCELLED},
    },
};

#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct CheckinWindow {
    pub opens_at: NaiveDateTime,
    pub closes_at: NaiveDateTime,
}

impl CheckinWindow {
    /// Opens `checkin_window_minutes` before the start and closes at the
    /// start itself.
    pub fn for_tournament(tournament: &Tournament) -> Self {
        CheckinWindow {
            opens_at: tournament.start_date
                - Duration::minutes(tournament.checkin_window_minutes),
            closes_at: tournament.start_date,
        }
    }

    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        self.opens_at <= now && now < self.closes_at
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum CheckinBlocked {
    NotYetOpen,
    Closed,
    AlreadyCheckedIn,
    NotRegistered,
}

impl fmt::Display for CheckinBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckinBlocked::NotYetOpen => "the check-in window has not opened yet",
            CheckinBlocked::Closed => "the check-in window has closed",
            CheckinBlocked::AlreadyCheckedIn => "already checked in",
            CheckinBlocked::NotRegistered => "no registration for this entrant",
        })
    }
}

#[derive(Serialize, Debug)]
pub struct CheckinStatus {
    pub window_open: bool,
    pub opens_at: NaiveDateTime,
    pub closes_at: NaiveDateTime,
    pub checked_in: bool,
    pub can_check_in: bool,
    pub reason: Option<CheckinBlocked>,
}

#[derive(Serialize, Debug)]
pub struct EntrantCheckinStatus {
    pub registration_id: String,
    pub user_id: String,
    pub is_waitlisted: bool,
    pub checked_in: bool,
    pub checked_in_at: Option<NaiveDateTime>,
    pub can_check_in: bool,
    pub reason: Option<CheckinBlocked>,
}

fn eligibility(
    registration: Option<&Registration>,
    window: &CheckinWindow,
    now: NaiveDateTime,
) -> Option<CheckinBlocked> {
    let Some(registration) = registration else {
        return Some(CheckinBlocked::NotRegistered);
    };
    if registration.checked_in {
        return Some(CheckinBlocked::AlreadyCheckedIn);
    }
    if now < window.opens_at {
        return Some(CheckinBlocked::NotYetOpen);
    }
    if now >= window.closes_at {
        return Some(CheckinBlocked::Closed);
    }
    None
}

#[tracing::instrument(skip(conn))]
pub fn checkin_status(
    tournament_id: &str,
    user_id: &str,
    now: NaiveDateTime,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<CheckinStatus, CoreError> {
    let tournament = Tournament::fetch(tournament_id, conn)?;
    let window = CheckinWindow::for_tournament(&tournament);
    let registration = Registration::for_entrant(tournament_id, user_id, conn)?;

    let reason = eligibility(registration.as_ref(), &window, now);

    Ok(CheckinStatus {
        window_open: window.is_open(now),
        opens_at: window.opens_at,
        closes_at: window.closes_at,
        checked_in: registration.map(|r| r.checked_in).unwrap_or(false),
        can_check_in: reason.is_none(),
        reason,
    })
}

/// Per-entrant breakdown across the whole tournament, for organizer
/// dashboards. Confirmed entrants first by slot, then the waitlist in
/// position order.
pub fn all_checkin_statuses(
    tournament_id: &str,
    now: NaiveDateTime,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<EntrantCheckinStatus>, CoreError> {
    let tournament = Tournament::fetch(tournament_id, conn)?;
    let window = CheckinWindow::for_tournament(&tournament);

    let registrations = tournament_registrations::table
        .filter(
            tournament_registrations::tournament_id
                .eq(tournament_id)
                .and(tournament_registrations::status.ne(STATUS_CANCELLED)),
        )
        .order_by((
            tournament_registrations::is_waitlisted.asc(),
            tournament_registrations::slot_number.asc(),
            tournament_registrations::waitlist_position.asc(),
        ))
        .load::<Registration>(conn)?;

    Ok(registrations
        .into_iter()
        .map(|r| {
            let reason = eligibility(Some(&r), &window, now);
            EntrantCheckinStatus {
                can_check_in: reason.is_none(),
                reason,
                registration_id: r.id,
                user_id: r.user_id,
                is_waitlisted: r.is_waitlisted,
                checked_in: r.checked_in,
                checked_in_at: r.checked_in_at,
            }
        })
        .collect())
}

/// The single check-in mutation. Idempotent by construction: a repeat call
/// is stopped by the already-checked-in guard.
#[tracing::instrument(skip(conn))]
pub fn perform_checkin(
    tournament_id: &str,
    user_id: &str,
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<Registration, CoreError> {
    conn.immediate_transaction(|conn| {
        let tournament = Tournament::fetch(tournament_id, conn)?;
        let window = CheckinWindow::for_tournament(&tournament);
        let registration = Registration::for_entrant(tournament_id, user_id, conn)?;

        if let Some(reason) = eligibility(registration.as_ref(), &window, now) {
            return Err(CoreError::CheckinRefused(reason));
        }

        // The guard above proves this is Some.
        let registration = registration.ok_or(CoreError::NotRegistered)?;

        diesel::update(
            tournament_registrations::table
                .filter(tournament_registrations::id.eq(&registration.id)),
        )
        .set((
            tournament_registrations::checked_in.eq(true),
            tournament_registrations::checked_in_at.eq(now),
        ))
        .execute(conn)?;

        Registration::fetch(&registration.id, conn)
    })
}
