//! Tournament admission and funds-holding engine.
//!
//! The core decides who occupies a tournament's finite slots, manages the
//! overflow waitlist, reserves entrant funds against pending commitments and
//! resolves everything to a final roster at the check-in deadline. All
//! correctness comes from store-level transactions: every multi-step
//! mutation runs inside one immediate (write-locked) SQLite transaction.

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod api;
pub mod config;
pub mod error;
pub mod holds;
pub mod notify;
pub mod schema;
pub mod state;
pub mod tournaments;
pub mod users;

#[cfg(test)]
mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
