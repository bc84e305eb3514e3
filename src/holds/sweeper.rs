//! Periodic maintenance: reclaims holds that were reserved but never
//! confirmed, and resolves tournaments that opted into automatic
//! finalization.
//!
//! The sweeper holds no long-lived locks: it reads the expired ids in one
//! short query, then settles each hold in its own immediate transaction
//! (re-checking the status inside), so a slow sweep never blocks
//! registration traffic and a hold settled concurrently is simply skipped.

use std::time::Duration;

use chrono::Utc;
use diesel::prelude::*;

use crate::{
    error::CoreError,
    holds::{self, HoldStatus},
    schema::{balance_holds, tournaments},
    state::DbPool,
    tournaments::finalize,
};

/// One pass over the ledger. Returns the number of holds released.
#[tracing::instrument(skip(pool))]
pub fn sweep_once(pool: &DbPool) -> Result<usize, CoreError> {
    let now = Utc::now().naive_utc();

    let expired_ids = {
        let mut conn = pool.get()?;
        balance_holds::table
            .filter(
                balance_holds::status
                    .eq(HoldStatus::Active.as_str())
                    .and(balance_holds::expires_at.lt(now)),
            )
            .select(balance_holds::id)
            .load::<String>(&mut *conn)?
    };

    let mut released = 0;
    for hold_id in expired_ids {
        let mut conn = pool.get()?;
        let result = conn.immediate_transaction(|conn| {
            holds::expire_holds_one(&hold_id, now, conn)
        });

        match result {
            Ok(true) => released += 1,
            // Settled by someone else between the scan and this
            // transaction.
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(%hold_id, "failed to expire hold: {e}");
            }
        }
    }

    if released > 0 {
        tracing::info!(released, "expiry sweep released holds");
    }

    Ok(released)
}

/// Finalizes every tournament that opted into automatic resolution and is
/// past its start. Each tournament is resolved in its own transaction;
/// failures are logged and do not stop the pass.
#[tracing::instrument(skip(pool))]
pub fn finalize_due(pool: &DbPool) -> Result<usize, CoreError> {
    let now = Utc::now().naive_utc();

    let due_ids = {
        let mut conn = pool.get()?;
        tournaments::table
            .filter(
                tournaments::auto_finalize
                    .eq(true)
                    .and(tournaments::finalized_at.is_null())
                    .and(tournaments::start_date.le(now)),
            )
            .select(tournaments::id)
            .load::<String>(&mut *conn)?
    };

    let mut finalized = 0;
    for tournament_id in due_ids {
        let mut conn = pool.get()?;
        match finalize::finalize(&tournament_id, now, &mut conn) {
            Ok(outcome) if !outcome.already_finalized => finalized += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(%tournament_id, "auto-finalize failed: {e}");
            }
        }
    }

    Ok(finalized)
}

/// Runs the sweeper forever at the given interval. Spawned by the server
/// binary alongside the API.
pub async fn run(pool: DbPool, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let pool = pool.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            sweep_once(&pool)?;
            finalize_due(&pool)
        })
        .await;

        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("expiry sweep failed: {e}"),
            Err(e) => tracing::error!("expiry sweep panicked: {e}"),
        }
    }
}
