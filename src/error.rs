use diesel::result::{
    DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError,
};
use thiserror::Error;

use crate::tournaments::checkin::CheckinBlocked;

/// Error taxonomy of the core. Domain-rule violations carry enough structure
/// for a caller to render a message; storage failures are passed through so
/// the whole operation can be retried from the top on a lock conflict.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("tournament not found")]
    TournamentNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("hold not found")]
    HoldNotFound,

    #[error("no registration for this entrant")]
    NotRegistered,

    #[error("tournament is not open for registration")]
    TournamentNotOpen,

    #[error("tournament has not started yet")]
    TournamentNotStarted,

    #[error("tournament is full")]
    TournamentFull,

    #[error("entrant already holds a registration for this tournament")]
    AlreadyRegistered,

    #[error("entrant is already on the waitlist for this tournament")]
    AlreadyWaitlisted,

    #[error("no linked identity for game {game}")]
    MissingGameIdentity { game: String },

    #[error("player {game_id} is banned from {game}")]
    PlayerBanned { game: String, game_id: String },

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("hold {0} is not active")]
    HoldNotActive(String),

    #[error("check-in refused: {0}")]
    CheckinRefused(CheckinBlocked),

    /// An invariant the store is supposed to uphold was found violated.
    /// Never silently repaired.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Db(#[from] DieselError),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

impl CoreError {
    /// Lock/busy conflicts from the store. The whole operation is safe to
    /// retry from the top; individual sub-steps are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Db(DieselError::DatabaseError(kind, info)) => {
                matches!(kind, DatabaseErrorKind::SerializationFailure)
                    || info.message().contains("database is locked")
            }
            _ => false,
        }
    }

    /// Stable machine-readable code for the API surface.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::TournamentNotFound => "tournament_not_found",
            CoreError::UserNotFound => "user_not_found",
            CoreError::HoldNotFound => "hold_not_found",
            CoreError::NotRegistered => "not_registered",
            CoreError::TournamentNotOpen => "tournament_not_open",
            CoreError::TournamentNotStarted => "tournament_not_started",
            CoreError::TournamentFull => "tournament_full",
            CoreError::AlreadyRegistered => "already_registered",
            CoreError::AlreadyWaitlisted => "already_waitlisted",
            CoreError::MissingGameIdentity { .. } => "missing_game_identity",
            CoreError::PlayerBanned { .. } => "player_banned",
            CoreError::InsufficientBalance { .. } => "insufficient_balance",
            CoreError::HoldNotActive(_) => "hold_not_active",
            CoreError::CheckinRefused(_) => "checkin_refused",
            CoreError::Integrity(_) => "integrity",
            CoreError::Db(_) => "database",
            CoreError::Pool(_) => "pool",
        }
    }
}
