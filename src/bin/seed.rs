//! Loads a demo dataset for local development: a handful of funded wallets,
//! one open tournament with a small bracket, and a banned player to exercise
//! the eligibility checks.

use chrono::{Duration, Utc};
use clap::Parser;
use diesel::prelude::*;
use diesel_migrations::MigrationHarness;
use entrydesk::{
    MIGRATIONS,
    schema::{game_bans, tournaments, users},
    tournaments::default_max_waitlist_slots,
};
use uuid::Uuid;

#[derive(Parser)]
pub struct Seed {
    database_url: Option<String>,
}

fn main() {
    let args = Seed::parse();
    let db_url = if let Some(url) = args.database_url {
        url
    } else {
        std::env::var("DATABASE_URL").expect(
            "please either set `DATABASE_URL` or pass the database url as an argument",
        )
    };

    let mut conn = diesel::SqliteConnection::establish(&db_url).unwrap();

    conn.run_pending_migrations(MIGRATIONS).unwrap();

    let now = Utc::now().naive_utc();

    for (username, wallet, game_id) in [
        ("alice", 10_000, Some("gg#alice")),
        ("bob", 5_000, Some("gg#bob")),
        ("carol", 2_500, Some("gg#carol")),
        ("dave", 50, Some("gg#dave")),
        ("eve", 10_000, Some("gg#eve")),
    ] {
        let uid = Uuid::now_v7().to_string();
        diesel::insert_into(users::table)
            .values((
                users::id.eq(&uid),
                users::username.eq(username),
                users::game_id.eq(game_id),
                users::wallet_balance.eq(wallet as i64),
                users::hold_balance.eq(0),
                users::created_at.eq(now),
            ))
            .execute(&mut conn)
            .unwrap();
        println!("user {username} = {uid}");
    }

    let tid = Uuid::now_v7().to_string();
    diesel::insert_into(tournaments::table)
        .values((
            tournaments::id.eq(&tid),
            tournaments::name.eq("Friday night cup"),
            tournaments::game.eq("chess"),
            tournaments::mode.eq("solo"),
            tournaments::status.eq("open"),
            tournaments::entry_fee.eq(500),
            tournaments::current_teams.eq(0),
            tournaments::max_teams.eq(4),
            tournaments::max_waitlist_slots.eq(default_max_waitlist_slots(4)),
            tournaments::start_date.eq(now + Duration::hours(2)),
            tournaments::checkin_window_minutes.eq(30),
            tournaments::auto_finalize.eq(false),
            tournaments::created_at.eq(now),
        ))
        .execute(&mut conn)
        .unwrap();
    println!("tournament = {tid}");

    diesel::insert_into(game_bans::table)
        .values((
            game_bans::id.eq(Uuid::now_v7().to_string()),
            game_bans::game.eq("chess"),
            game_bans::game_id.eq("gg#eve"),
            game_bans::reason.eq("engine assistance"),
            game_bans::created_at.eq(now),
        ))
        .execute(&mut conn)
        .unwrap();
    println!("banned gg#eve from chess");
}
