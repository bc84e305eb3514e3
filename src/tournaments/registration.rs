//! The registration workflow: eligibility checks, capacity admission,
//! deduct-or-hold of the entry fee and persistence of the registration row,
//! all inside one immediate transaction. Either every write commits
//! (counters, holds, the registration row) or none do.

use chrono::{Duration, NaiveDateTime};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::CoreError,
    holds::{self, Hold, HoldType, REF_REGISTRATION},
    schema::{game_bans, tournament_registrations, tournaments},
    tournaments::{
        Tournament,
        admission::{self, Admission},
    },
    users::{self, TransactionKind, User},
};

pub const STATUS_REGISTERED: &str = "registered";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// How long after the scheduled start a waitlist hold survives before the
/// sweeper reclaims it, in case finalization never ran.
const HOLD_GRACE_HOURS: i64 = 24;

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct Registration {
    pub id: String,
    pub tournament_id: String,
    pub user_id: String,
    pub team_id: Option<String>,
    pub slot_number: Option<i64>,
    pub waitlist_position: Option<i64>,
    pub is_waitlisted: bool,
    pub status: String,
    pub checked_in: bool,
    pub checked_in_at: Option<NaiveDateTime>,
    pub promoted_via_checkin: bool,
    pub original_slot_holder_id: Option<String>,
    pub promoted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// The well-formed states a registration row can be in. The row itself
/// stores independent flags; deriving this enum is how every reader rejects
/// the illegal combinations (e.g. waitlisted with a slot number).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegistrationState {
    Confirmed { slot_number: i64 },
    Waitlisted { position: i64 },
    Cancelled,
}

impl Registration {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        registration_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Registration, CoreError> {
        tournament_registrations::table
            .filter(tournament_registrations::id.eq(registration_id))
            .first::<Registration>(conn)
            .optional()?
            .ok_or(CoreError::NotRegistered)
    }

    /// The entrant's live (non-cancelled) registration, if any. At most one
    /// exists per (tournament, entrant).
    pub fn for_entrant(
        tournament_id: &str,
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<Registration>, CoreError> {
        Ok(tournament_registrations::table
            .filter(
                tournament_registrations::tournament_id
                    .eq(tournament_id)
                    .and(tournament_registrations::user_id.eq(user_id))
                    .and(tournament_registrations::status.ne(STATUS_CANCELLED)),
            )
            .first::<Registration>(conn)
            .optional()?)
    }

    pub fn state(&self) -> Result<RegistrationState, CoreError> {
        match (
            self.status.as_str(),
            self.is_waitlisted,
            self.slot_number,
            self.waitlist_position,
        ) {
            (STATUS_CANCELLED, _, _, _) => Ok(RegistrationState::Cancelled),
            (_, false, Some(slot_number), None) => {
                Ok(RegistrationState::Confirmed { slot_number })
            }
            (_, true, None, Some(position)) => {
                Ok(RegistrationState::Waitlisted { position })
            }
            _ => Err(CoreError::Integrity(format!(
                "registration {} has inconsistent flags: waitlisted={}, slot={:?}, position={:?}",
                self.id, self.is_waitlisted, self.slot_number, self.waitlist_position
            ))),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct RegisterRequest {
    pub user_id: String,
    pub team_id: Option<String>,
    #[serde(default)]
    pub selected_players: Vec<String>,
    #[serde(default)]
    pub join_waitlist: bool,
}

#[derive(Serialize, Debug)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// Admitted into a confirmed slot; the entry fee was debited outright.
    Confirmed {
        registration: Registration,
        slot_number: i64,
        fee_paid: i64,
    },
    /// Joined the waitlist; the entry fee is reserved by a hold, not paid.
    Waitlisted {
        registration: Registration,
        waitlist_position: i64,
        fee_held: i64,
        hold: Option<Hold>,
    },
    /// The bracket is full but the waitlist has room. Nothing was written;
    /// the caller should confirm and re-invoke with `join_waitlist = true`.
    WaitlistAvailable { slots_total: i64, slots_taken: i64 },
}

/// Admits one entrant. The occupancy read, the admission decision and every
/// resulting write share one immediate transaction, which on this backend
/// takes the database write lock up front: concurrent registrations are
/// fully serialized, so `current_teams` can never overshoot `max_teams`.
#[tracing::instrument(skip(req, conn), fields(user_id = %req.user_id))]
pub fn register(
    tournament_id: &str,
    req: &RegisterRequest,
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<RegistrationOutcome, CoreError> {
    conn.immediate_transaction(|conn| {
        let tournament = Tournament::fetch(tournament_id, conn)?;

        if !tournament.accepts_registrations() {
            return Err(CoreError::TournamentNotOpen);
        }

        if let Some(existing) =
            Registration::for_entrant(tournament_id, &req.user_id, conn)?
        {
            return Err(if existing.is_waitlisted {
                CoreError::AlreadyWaitlisted
            } else {
                CoreError::AlreadyRegistered
            });
        }

        let user = User::fetch(&req.user_id, conn)?;
        if user.game_id.is_none() {
            return Err(CoreError::MissingGameIdentity {
                game: tournament.game.clone(),
            });
        }

        if !tournament.is_solo() {
            check_team_eligibility(&tournament, req, conn)?;
        }

        let waitlisted_count = tournament_registrations::table
            .filter(
                tournament_registrations::tournament_id
                    .eq(tournament_id)
                    .and(tournament_registrations::is_waitlisted.eq(true))
                    .and(tournament_registrations::status.ne(STATUS_CANCELLED)),
            )
            .count()
            .get_result::<i64>(conn)?;

        match admission::decide(&tournament, waitlisted_count, req.join_waitlist, now)
        {
            Admission::Admit => admit(&tournament, req, now, conn),
            Admission::Waitlist => waitlist(&tournament, req, now, conn),
            Admission::OfferWaitlist {
                slots_total,
                slots_taken,
            } => Ok(RegistrationOutcome::WaitlistAvailable {
                slots_total,
                slots_taken,
            }),
            Admission::Reject => Err(CoreError::TournamentFull),
        }
    })
}

/// Team-mode gate: the team must not already hold a live registration, and
/// every selected player needs a game identity that is not on the ban list.
fn check_team_eligibility(
    tournament: &Tournament,
    req: &RegisterRequest,
    conn: &mut SqliteConnection,
) -> Result<(), CoreError> {
    let Some(team_id) = req.team_id.as_deref() else {
        return Err(CoreError::Validation(
            "team tournaments require a team_id".to_string(),
        ));
    };

    let team_registered = diesel::dsl::select(diesel::dsl::exists(
        tournament_registrations::table.filter(
            tournament_registrations::tournament_id
                .eq(&tournament.id)
                .and(tournament_registrations::team_id.eq(team_id))
                .and(tournament_registrations::status.ne(STATUS_CANCELLED)),
        ),
    ))
    .get_result::<bool>(conn)?;

    if team_registered {
        return Err(CoreError::AlreadyRegistered);
    }

    for player_id in &req.selected_players {
        let player = User::fetch(player_id, conn)?;
        let Some(game_id) = player.game_id else {
            return Err(CoreError::MissingGameIdentity {
                game: tournament.game.clone(),
            });
        };

        let banned = diesel::dsl::select(diesel::dsl::exists(
            game_bans::table.filter(
                game_bans::game
                    .eq(&tournament.game)
                    .and(game_bans::game_id.eq(&game_id)),
            ),
        ))
        .get_result::<bool>(conn)?;

        if banned {
            return Err(CoreError::PlayerBanned {
                game: tournament.game.clone(),
                game_id,
            });
        }
    }

    Ok(())
}

fn admit(
    tournament: &Tournament,
    req: &RegisterRequest,
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<RegistrationOutcome, CoreError> {
    let slot_number = tournament_registrations::table
        .filter(
            tournament_registrations::tournament_id
                .eq(&tournament.id)
                .and(tournament_registrations::is_waitlisted.eq(false)),
        )
        .order_by(tournament_registrations::slot_number.desc())
        .select(tournament_registrations::slot_number)
        .first::<Option<i64>>(conn)
        .optional()?
        .flatten()
        .unwrap_or(0)
        + 1;

    let registration =
        insert_registration(tournament, req, Some(slot_number), None, now, conn)?;

    diesel::update(tournaments::table.filter(tournaments::id.eq(&tournament.id)))
        .set(tournaments::current_teams.eq(tournaments::current_teams + 1))
        .execute(conn)?;

    let fee_paid = if tournament.entry_fee > 0 {
        users::debit_wallet(
            &req.user_id,
            tournament.entry_fee,
            TransactionKind::EntryFee,
            Some((REF_REGISTRATION, &registration.id)),
            conn,
        )?;
        tournament.entry_fee
    } else {
        0
    };

    Ok(RegistrationOutcome::Confirmed {
        slot_number,
        fee_paid,
        registration,
    })
}

fn waitlist(
    tournament: &Tournament,
    req: &RegisterRequest,
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<RegistrationOutcome, CoreError> {
    // Positions only ever grow, so ordering is preserved even after
    // cancellations leave gaps.
    let waitlist_position = tournament_registrations::table
        .filter(
            tournament_registrations::tournament_id
                .eq(&tournament.id)
                .and(tournament_registrations::is_waitlisted.eq(true)),
        )
        .order_by(tournament_registrations::waitlist_position.desc())
        .select(tournament_registrations::waitlist_position)
        .first::<Option<i64>>(conn)
        .optional()?
        .flatten()
        .unwrap_or(0)
        + 1;

    let registration =
        insert_registration(tournament, req, None, Some(waitlist_position), now, conn)?;

    let hold = if tournament.entry_fee > 0 {
        Some(holds::create_hold(
            &req.user_id,
            tournament.entry_fee,
            HoldType::WaitlistEntryFee,
            Some((REF_REGISTRATION, &registration.id)),
            Some(tournament.start_date + Duration::hours(HOLD_GRACE_HOURS)),
            conn,
        )?)
    } else {
        None
    };

    Ok(RegistrationOutcome::Waitlisted {
        waitlist_position,
        fee_held: tournament.entry_fee,
        hold,
        registration,
    })
}

fn insert_registration(
    tournament: &Tournament,
    req: &RegisterRequest,
    slot_number: Option<i64>,
    waitlist_position: Option<i64>,
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<Registration, CoreError> {
    let registration = Registration {
        id: Uuid::now_v7().to_string(),
        tournament_id: tournament.id.clone(),
        user_id: req.user_id.clone(),
        team_id: req.team_id.clone(),
        slot_number,
        waitlist_position,
        is_waitlisted: waitlist_position.is_some(),
        status: STATUS_REGISTERED.to_string(),
        checked_in: false,
        checked_in_at: None,
        promoted_via_checkin: false,
        original_slot_holder_id: None,
        promoted_at: None,
        created_at: now,
    };

    let n = diesel::insert_into(tournament_registrations::table)
        .values((
            tournament_registrations::id.eq(&registration.id),
            tournament_registrations::tournament_id.eq(&registration.tournament_id),
            tournament_registrations::user_id.eq(&registration.user_id),
            tournament_registrations::team_id.eq(&registration.team_id),
            tournament_registrations::slot_number.eq(registration.slot_number),
            tournament_registrations::waitlist_position
                .eq(registration.waitlist_position),
            tournament_registrations::is_waitlisted.eq(registration.is_waitlisted),
            tournament_registrations::status.eq(&registration.status),
            tournament_registrations::checked_in.eq(false),
            tournament_registrations::promoted_via_checkin.eq(false),
            tournament_registrations::created_at.eq(registration.created_at),
        ))
        .execute(conn)?;
    if n != 1 {
        return Err(CoreError::Integrity(format!(
            "registration insert affected {n} rows"
        )));
    }

    Ok(registration)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use diesel::prelude::*;

    use super::*;
    use crate::{schema::users, test::fixtures, users::User};

    fn request(user_id: &str) -> RegisterRequest {
        RegisterRequest {
            user_id: user_id.to_string(),
            team_id: None,
            selected_players: vec![],
            join_waitlist: false,
        }
    }

    #[test]
    fn admission_assigns_sequential_slots_and_debits_fee() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            entry_fee: 100,
            max_teams: 4,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();

        let a = fixtures::create_user(&mut conn, "alice", 500, Some("gg#a"));
        let b = fixtures::create_user(&mut conn, "bob", 500, Some("gg#b"));

        let first = register(&tid, &request(&a), now, &mut conn).unwrap();
        let second = register(&tid, &request(&b), now, &mut conn).unwrap();

        match (first, second) {
            (
                RegistrationOutcome::Confirmed {
                    slot_number: s1,
                    fee_paid: f1,
                    ..
                },
                RegistrationOutcome::Confirmed {
                    slot_number: s2,
                    fee_paid: f2,
                    ..
                },
            ) => {
                assert_eq!((s1, s2), (1, 2));
                assert_eq!((f1, f2), (100, 100));
            }
            other => panic!("unexpected outcomes: {other:?}"),
        }

        let alice = User::fetch(&a, &mut conn).unwrap();
        assert_eq!(alice.wallet_balance, 400);
        assert_eq!(alice.hold_balance, 0);

        let t = Tournament::fetch(&tid, &mut conn).unwrap();
        assert_eq!(t.current_teams, 2);
    }

    #[test]
    fn full_bracket_waitlists_with_a_hold() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            entry_fee: 150,
            max_teams: 1,
            max_waitlist_slots: 2,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();

        let a = fixtures::create_user(&mut conn, "alice", 500, Some("gg#a"));
        let c = fixtures::create_user(&mut conn, "carol", 500, Some("gg#c"));

        register(&tid, &request(&a), now, &mut conn).unwrap();

        // Not opted in: a structured offer, and nothing is written.
        let offer = register(&tid, &request(&c), now, &mut conn).unwrap();
        assert!(matches!(
            offer,
            RegistrationOutcome::WaitlistAvailable {
                slots_total: 2,
                slots_taken: 0
            }
        ));
        assert!(Registration::for_entrant(&tid, &c, &mut conn)
            .unwrap()
            .is_none());

        let mut req = request(&c);
        req.join_waitlist = true;
        let outcome = register(&tid, &req, now, &mut conn).unwrap();

        match outcome {
            RegistrationOutcome::Waitlisted {
                waitlist_position,
                fee_held,
                hold,
                registration,
            } => {
                assert_eq!(waitlist_position, 1);
                assert_eq!(fee_held, 150);
                let hold = hold.unwrap();
                assert_eq!(hold.amount, 150);
                assert_eq!(hold.reference_id.as_deref(), Some(registration.id.as_str()));
                assert_eq!(
                    registration.state().unwrap(),
                    RegistrationState::Waitlisted { position: 1 }
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // Fee reserved, not paid.
        let carol = User::fetch(&c, &mut conn).unwrap();
        assert_eq!(carol.wallet_balance, 500);
        assert_eq!(carol.hold_balance, 150);

        // The waitlist never bumps the occupancy counter.
        assert_eq!(Tournament::fetch(&tid, &mut conn).unwrap().current_teams, 1);
    }

    #[test]
    fn duplicate_registration_is_rejected_not_duplicated() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            max_teams: 4,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();
        let a = fixtures::create_user(&mut conn, "alice", 500, Some("gg#a"));

        register(&tid, &request(&a), now, &mut conn).unwrap();
        assert!(matches!(
            register(&tid, &request(&a), now, &mut conn).unwrap_err(),
            CoreError::AlreadyRegistered
        ));

        let count = tournament_registrations::table
            .filter(tournament_registrations::user_id.eq(&a))
            .count()
            .get_result::<i64>(&mut conn)
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn waitlisted_duplicate_reports_already_waitlisted() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            max_teams: 1,
            max_waitlist_slots: 2,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();
        let a = fixtures::create_user(&mut conn, "alice", 500, Some("gg#a"));
        let c = fixtures::create_user(&mut conn, "carol", 500, Some("gg#c"));

        register(&tid, &request(&a), now, &mut conn).unwrap();
        let mut req = request(&c);
        req.join_waitlist = true;
        register(&tid, &req, now, &mut conn).unwrap();

        assert!(matches!(
            register(&tid, &req, now, &mut conn).unwrap_err(),
            CoreError::AlreadyWaitlisted
        ));
    }

    #[test]
    fn insufficient_balance_writes_nothing() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            entry_fee: 150,
            max_teams: 4,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();
        let a = fixtures::create_user(&mut conn, "alice", 100, Some("gg#a"));

        let err = register(&tid, &request(&a), now, &mut conn).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientBalance {
                required: 150,
                available: 100
            }
        ));

        // Transaction rolled back completely: no registration, no counter
        // bump, balances untouched.
        assert!(Registration::for_entrant(&tid, &a, &mut conn)
            .unwrap()
            .is_none());
        assert_eq!(Tournament::fetch(&tid, &mut conn).unwrap().current_teams, 0);
        let alice: i64 = users::table
            .filter(users::id.eq(&a))
            .select(users::wallet_balance)
            .first(&mut conn)
            .unwrap();
        assert_eq!(alice, 100);
    }

    #[test]
    fn closed_tournament_and_full_waitlist_are_rejected() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let now = Utc::now().naive_utc();
        let a = fixtures::create_user(&mut conn, "alice", 500, Some("gg#a"));
        let b = fixtures::create_user(&mut conn, "bob", 500, Some("gg#b"));
        let c = fixtures::create_user(&mut conn, "carol", 500, Some("gg#c"));

        let live = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            status: "live",
            ..Default::default()
        });
        assert!(matches!(
            register(&live, &request(&a), now, &mut conn).unwrap_err(),
            CoreError::TournamentNotOpen
        ));

        let tight = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            max_teams: 1,
            max_waitlist_slots: 1,
            ..Default::default()
        });
        register(&tight, &request(&a), now, &mut conn).unwrap();
        let mut req = request(&b);
        req.join_waitlist = true;
        register(&tight, &req, now, &mut conn).unwrap();

        let mut req = request(&c);
        req.join_waitlist = true;
        assert!(matches!(
            register(&tight, &req, now, &mut conn).unwrap_err(),
            CoreError::TournamentFull
        ));
    }

    #[test]
    fn game_identity_is_required() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            ..Default::default()
        });
        let now = Utc::now().naive_utc();
        let nameless = fixtures::create_user(&mut conn, "nameless", 500, None);

        assert!(matches!(
            register(&tid, &request(&nameless), now, &mut conn).unwrap_err(),
            CoreError::MissingGameIdentity { .. }
        ));
    }

    #[test]
    fn team_mode_rejects_banned_players_and_duplicate_teams() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            mode: "team",
            game: "shooter",
            max_teams: 4,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();

        let captain = fixtures::create_user(&mut conn, "captain", 500, Some("gg#cap"));
        let clean = fixtures::create_user(&mut conn, "clean", 0, Some("gg#clean"));
        let cheater = fixtures::create_user(&mut conn, "cheater", 0, Some("gg#cheat"));
        fixtures::ban_player(&mut conn, "shooter", "gg#cheat");

        let mut req = request(&captain);
        req.team_id = Some("team-red".to_string());
        req.selected_players = vec![clean.clone(), cheater.clone()];
        assert!(matches!(
            register(&tid, &req, now, &mut conn).unwrap_err(),
            CoreError::PlayerBanned { .. }
        ));

        // Without a team id the request is malformed.
        let solo_shaped = request(&captain);
        assert!(matches!(
            register(&tid, &solo_shaped, now, &mut conn).unwrap_err(),
            CoreError::Validation(_)
        ));

        req.selected_players = vec![clean.clone()];
        register(&tid, &req, now, &mut conn).unwrap();

        // A second registration for the same team is refused even when
        // submitted by a different captain.
        let other = fixtures::create_user(&mut conn, "other", 500, Some("gg#o"));
        let mut req2 = request(&other);
        req2.team_id = Some("team-red".to_string());
        assert!(matches!(
            register(&tid, &req2, now, &mut conn).unwrap_err(),
            CoreError::AlreadyRegistered
        ));
    }

    #[test]
    fn zero_fee_tournaments_skip_debits_and_holds() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            entry_fee: 0,
            max_teams: 1,
            max_waitlist_slots: 1,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();
        let a = fixtures::create_user(&mut conn, "alice", 0, Some("gg#a"));
        let b = fixtures::create_user(&mut conn, "bob", 0, Some("gg#b"));

        let first = register(&tid, &request(&a), now, &mut conn).unwrap();
        assert!(matches!(
            first,
            RegistrationOutcome::Confirmed { fee_paid: 0, .. }
        ));

        let mut req = request(&b);
        req.join_waitlist = true;
        let second = register(&tid, &req, now, &mut conn).unwrap();
        match second {
            RegistrationOutcome::Waitlisted { hold, fee_held, .. } => {
                assert!(hold.is_none());
                assert_eq!(fee_held, 0);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn waitlist_positions_increase_in_creation_order() {
        let pool = fixtures::pool();
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            entry_fee: 10,
            max_teams: 1,
            max_waitlist_slots: 8,
            ..Default::default()
        });
        let now = Utc::now().naive_utc();

        let filler = fixtures::create_user(&mut conn, "filler", 100, Some("gg#f"));
        register(&tid, &request(&filler), now, &mut conn).unwrap();

        let mut positions = vec![];
        for i in 0..4 {
            let uid = fixtures::create_user(
                &mut conn,
                &format!("wait{i}"),
                100,
                Some(&format!("gg#w{i}")),
            );
            let mut req = request(&uid);
            req.join_waitlist = true;
            match register(&tid, &req, now, &mut conn).unwrap() {
                RegistrationOutcome::Waitlisted {
                    waitlist_position, ..
                } => positions.push(waitlist_position),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }
}
