//! Roster finalization, run once per tournament at or after its start:
//! confirmed entrants who never checked in forfeit their slots to
//! checked-in waitlist entrants, earliest check-in first, and the hold
//! ledger is reconciled for every registration the pairing touched. The
//! whole resolution is one transaction, made idempotent by the persisted
//! `finalized_at` marker.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    error::CoreError,
    holds::{self, Hold, REF_REGISTRATION},
    schema::{tournament_registrations, tournaments},
    tournaments::{
        Tournament,
        registration::{Registration, RegistrationState, STATUS_CANCELLED},
    },
    users::{self, TransactionKind},
};

#[derive(Serialize, Clone, Debug)]
pub struct Promotion {
    pub registration_id: String,
    pub user_id: String,
    pub slot_number: i64,
    pub vacated_by: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct Disqualification {
    pub registration_id: String,
    pub user_id: String,
    pub slot_number: i64,
}

#[derive(Serialize, Debug)]
pub struct FinalizeOutcome {
    pub already_finalized: bool,
    pub promoted_count: usize,
    pub disqualified_count: usize,
    pub promoted: Vec<Promotion>,
    pub disqualified: Vec<Disqualification>,
    pub current_teams: i64,
}

impl FinalizeOutcome {
    fn noop(tournament: &Tournament) -> Self {
        FinalizeOutcome {
            already_finalized: true,
            promoted_count: 0,
            disqualified_count: 0,
            promoted: vec![],
            disqualified: vec![],
            current_teams: tournament.current_teams,
        }
    }
}

#[tracing::instrument(skip(conn))]
pub fn finalize(
    tournament_id: &str,
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<FinalizeOutcome, CoreError> {
    conn.immediate_transaction(|conn| {
        let tournament = Tournament::fetch(tournament_id, conn)?;

        if tournament.finalized_at.is_some() {
            return Ok(FinalizeOutcome::noop(&tournament));
        }
        if !tournament.has_started(now) {
            return Err(CoreError::TournamentNotStarted);
        }

        // Slot order on the no-shows and check-in-time order on the
        // candidates give a deterministic pairing: the earliest-checked-in
        // waitlister takes the lowest vacated slot.
        let no_shows = tournament_registrations::table
            .filter(
                tournament_registrations::tournament_id
                    .eq(tournament_id)
                    .and(tournament_registrations::is_waitlisted.eq(false))
                    .and(tournament_registrations::status.ne(STATUS_CANCELLED))
                    .and(tournament_registrations::checked_in.eq(false)),
            )
            .order_by(tournament_registrations::slot_number.asc())
            .load::<Registration>(conn)?;

        let candidates = tournament_registrations::table
            .filter(
                tournament_registrations::tournament_id
                    .eq(tournament_id)
                    .and(tournament_registrations::is_waitlisted.eq(true))
                    .and(tournament_registrations::status.ne(STATUS_CANCELLED))
                    .and(tournament_registrations::checked_in.eq(true)),
            )
            .order_by(tournament_registrations::checked_in_at.asc())
            .load::<Registration>(conn)?;

        let mut promoted = vec![];
        let mut disqualified = vec![];
        let mut candidates = candidates.into_iter();

        'slots: for no_show in &no_shows {
            let RegistrationState::Confirmed { slot_number } = no_show.state()?
            else {
                return Err(CoreError::Integrity(format!(
                    "no-show {} is not in a confirmed state",
                    no_show.id
                )));
            };

            // Ledger reconciliation, same transaction: a candidate is only
            // promoted once their entry fee is actually settled. One who
            // can no longer pay stays waitlisted and the next in line is
            // considered for the slot.
            let candidate = loop {
                let Some(candidate) = candidates.next() else { break 'slots };
                let RegistrationState::Waitlisted { .. } = candidate.state()?
                else {
                    return Err(CoreError::Integrity(format!(
                        "promotion candidate {} is not waitlisted",
                        candidate.id
                    )));
                };
                if settle_entry_fee(&tournament, &candidate, conn)? {
                    break candidate;
                }
            };

            diesel::update(
                tournament_registrations::table
                    .filter(tournament_registrations::id.eq(&no_show.id)),
            )
            .set(tournament_registrations::status.eq(STATUS_CANCELLED))
            .execute(conn)?;

            diesel::update(
                tournament_registrations::table
                    .filter(tournament_registrations::id.eq(&candidate.id)),
            )
            .set((
                tournament_registrations::is_waitlisted.eq(false),
                tournament_registrations::waitlist_position.eq(None::<i64>),
                tournament_registrations::slot_number.eq(slot_number),
                tournament_registrations::promoted_via_checkin.eq(true),
                tournament_registrations::original_slot_holder_id
                    .eq(&no_show.user_id),
                tournament_registrations::promoted_at.eq(now),
            ))
            .execute(conn)?;

            // Anything still held against the cancelled registration goes
            // back to its owner.
            if let Some(hold) = Hold::active_for_registration(&no_show.id, conn)? {
                holds::release_hold(&hold.id, "disqualified no-show", conn)?;
            }

            promoted.push(Promotion {
                registration_id: candidate.id.clone(),
                user_id: candidate.user_id.clone(),
                slot_number,
                vacated_by: no_show.user_id.clone(),
            });
            disqualified.push(Disqualification {
                registration_id: no_show.id.clone(),
                user_id: no_show.user_id.clone(),
                slot_number,
            });
        }

        let current_teams = tournament_registrations::table
            .filter(
                tournament_registrations::tournament_id
                    .eq(tournament_id)
                    .and(tournament_registrations::is_waitlisted.eq(false))
                    .and(tournament_registrations::status.ne(STATUS_CANCELLED)),
            )
            .count()
            .get_result::<i64>(conn)?;

        diesel::update(tournaments::table.filter(tournaments::id.eq(tournament_id)))
            .set((
                tournaments::current_teams.eq(current_teams),
                tournaments::finalized_at.eq(now),
            ))
            .execute(conn)?;

        tracing::info!(
            promoted = promoted.len(),
            disqualified = disqualified.len(),
            current_teams,
            "tournament finalized"
        );

        Ok(FinalizeOutcome {
            already_finalized: false,
            promoted_count: promoted.len(),
            disqualified_count: disqualified.len(),
            promoted,
            disqualified,
            current_teams,
        })
    })
}

/// Settles the entry fee for a registration about to be promoted. Normally
/// the fee sits in an active hold and confirming it is enough, but the hold
/// can be gone by now (the self-service release endpoint lets a waitlister
/// reclaim it): then the fee is debited from the wallet directly. Returns
/// `false` when the candidate cannot cover the fee at all.
fn settle_entry_fee(
    tournament: &Tournament,
    candidate: &Registration,
    conn: &mut SqliteConnection,
) -> Result<bool, CoreError> {
    if tournament.entry_fee == 0 {
        return Ok(true);
    }

    if let Some(hold) = Hold::active_for_registration(&candidate.id, conn)? {
        holds::confirm_hold(&hold.id, conn)?;
        return Ok(true);
    }

    tracing::warn!(
        registration_id = %candidate.id,
        "no active hold backing a fee-bearing promotion, debiting the wallet"
    );
    match users::debit_wallet(
        &candidate.user_id,
        tournament.entry_fee,
        TransactionKind::EntryFee,
        Some((REF_REGISTRATION, &candidate.id)),
        conn,
    ) {
        Ok(_) => Ok(true),
        Err(CoreError::InsufficientBalance { required, available }) => {
            tracing::warn!(
                registration_id = %candidate.id,
                required,
                available,
                "candidate cannot cover the entry fee, not promoting"
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
