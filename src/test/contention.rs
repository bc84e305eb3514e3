//! Races two registrations for the last slot on a real multi-connection
//! pool. In-memory databases are capped at one connection, so the write-lock
//! serialization (and the retryable busy error the loser of the lock race
//! sees) only shows up against a file-backed database.

use std::{fs, sync::Barrier, thread, time::Duration};

use chrono::Utc;
use diesel_migrations::MigrationHarness;
use uuid::Uuid;

use crate::{
    MIGRATIONS, state,
    test::fixtures,
    tournaments::{
        Tournament,
        registration::{RegisterRequest, RegistrationOutcome, register},
    },
};

#[test]
fn last_slot_is_never_double_booked() {
    let path = std::env::temp_dir()
        .join(format!("entrydesk-contention-{}.sqlite", Uuid::now_v7()));
    let pool = state::build_pool(path.to_str().unwrap()).unwrap();
    {
        let mut conn = pool.get().unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();
    }

    let (tid, racers) = {
        let mut conn = pool.get().unwrap();
        let tid = fixtures::create_tournament(&mut conn, fixtures::TournamentSpec {
            entry_fee: 100,
            max_teams: 1,
            max_waitlist_slots: 1,
            ..Default::default()
        });
        let a = fixtures::create_user(&mut conn, "alice", 500, Some("gg#a"));
        let b = fixtures::create_user(&mut conn, "bob", 500, Some("gg#b"));
        (tid, [a, b])
    };

    let barrier = Barrier::new(racers.len());
    let outcomes: Vec<RegistrationOutcome> = thread::scope(|s| {
        let handles: Vec<_> = racers
            .iter()
            .map(|uid| {
                let pool = pool.clone();
                let tid = &tid;
                let barrier = &barrier;
                s.spawn(move || {
                    let req = RegisterRequest {
                        user_id: uid.clone(),
                        team_id: None,
                        selected_players: vec![],
                        join_waitlist: true,
                    };
                    let mut conn = pool.get().unwrap();
                    barrier.wait();
                    for _ in 0..200 {
                        match register(tid, &req, Utc::now().naive_utc(), &mut conn)
                        {
                            Ok(outcome) => return outcome,
                            // The loser of the lock race retries the whole
                            // operation, as a caller is expected to.
                            Err(e) if e.is_retryable() => {
                                thread::sleep(Duration::from_millis(5));
                            }
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                    panic!("registration still conflicting after retries");
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let confirmed = outcomes
        .iter()
        .filter(|o| matches!(o, RegistrationOutcome::Confirmed { .. }))
        .count();
    let waitlisted = outcomes
        .iter()
        .filter(|o| matches!(o, RegistrationOutcome::Waitlisted { .. }))
        .count();
    assert_eq!((confirmed, waitlisted), (1, 1));

    {
        let mut conn = pool.get().unwrap();
        let t = Tournament::fetch(&tid, &mut conn).unwrap();
        assert_eq!(t.current_teams, 1);
        assert!(t.current_teams <= t.max_teams);
    }

    drop(pool);
    let _ = fs::remove_file(&path);
}
