//! The hold ledger: funds reserved against a user's wallet for pending
//! obligations. Independent of tournament logic; registration creates holds
//! for waitlisted entry fees, finalization confirms or releases them, and
//! the sweeper reclaims the ones that expired.
//!
//! All operations here assume the caller's transaction. Standalone callers
//! (the API surface, the sweeper) wrap each call in an immediate
//! transaction of their own.

use chrono::{NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::CoreError,
    schema::{balance_holds, users, wallet_transactions},
    users::TransactionKind,
};

pub mod sweeper;

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct Hold {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub hold_type: String,
    pub status: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
    pub released_at: Option<NaiveDateTime>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HoldStatus {
    Active,
    Released,
    Confirmed,
    Expired,
}

impl HoldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HoldStatus::Active => "active",
            HoldStatus::Released => "released",
            HoldStatus::Confirmed => "confirmed",
            HoldStatus::Expired => "expired",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HoldType {
    WaitlistEntryFee,
    PendingWithdrawal,
    Dispute,
}

impl HoldType {
    pub fn as_str(self) -> &'static str {
        match self {
            HoldType::WaitlistEntryFee => "waitlist_entry_fee",
            HoldType::PendingWithdrawal => "pending_withdrawal",
            HoldType::Dispute => "dispute",
        }
    }
}

impl Hold {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        hold_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Hold, CoreError> {
        balance_holds::table
            .filter(balance_holds::id.eq(hold_id))
            .first::<Hold>(conn)
            .optional()?
            .ok_or(CoreError::HoldNotFound)
    }

    pub fn is_active(&self) -> bool {
        self.status == HoldStatus::Active.as_str()
    }

    /// The active hold referencing a registration, if one exists.
    pub fn active_for_registration(
        registration_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<Hold>, CoreError> {
        Ok(balance_holds::table
            .filter(
                balance_holds::reference_type
                    .eq(REF_REGISTRATION)
                    .and(balance_holds::reference_id.eq(registration_id))
                    .and(balance_holds::status.eq(HoldStatus::Active.as_str())),
            )
            .first::<Hold>(conn)
            .optional()?)
    }
}

pub const REF_REGISTRATION: &str = "registration";

/// Reserves `amount` against the user's wallet. The funds stay in the wallet
/// but are no longer spendable.
#[tracing::instrument(skip(conn))]
pub fn create_hold(
    user_id: &str,
    amount: i64,
    hold_type: HoldType,
    reference: Option<(&str, &str)>,
    expires_at: Option<NaiveDateTime>,
    conn: &mut SqliteConnection,
) -> Result<Hold, CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "hold amount must be positive, got {amount}"
        )));
    }

    let user = crate::users::User::fetch(user_id, conn)?;
    if user.available_balance() < amount {
        return Err(CoreError::InsufficientBalance {
            required: amount,
            available: user.available_balance(),
        });
    }

    let hold = Hold {
        id: Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        amount,
        hold_type: hold_type.as_str().to_string(),
        status: HoldStatus::Active.as_str().to_string(),
        reference_type: reference.map(|(t, _)| t.to_string()),
        reference_id: reference.map(|(_, id)| id.to_string()),
        expires_at,
        released_at: None,
        confirmed_at: None,
        note: None,
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(balance_holds::table)
        .values((
            balance_holds::id.eq(&hold.id),
            balance_holds::user_id.eq(&hold.user_id),
            balance_holds::amount.eq(hold.amount),
            balance_holds::hold_type.eq(&hold.hold_type),
            balance_holds::status.eq(&hold.status),
            balance_holds::reference_type.eq(&hold.reference_type),
            balance_holds::reference_id.eq(&hold.reference_id),
            balance_holds::expires_at.eq(hold.expires_at),
            balance_holds::created_at.eq(hold.created_at),
        ))
        .execute(conn)?;

    diesel::update(users::table.filter(users::id.eq(user_id)))
        .set(users::hold_balance.eq(users::hold_balance + amount))
        .execute(conn)?;

    Ok(hold)
}

/// Returns the held funds to the user's spendable balance. No wallet debit
/// takes place. Releasing a hold that is no longer active fails with
/// `HoldNotActive`; callers rely on that as idempotency protection.
#[tracing::instrument(skip(conn))]
pub fn release_hold(
    hold_id: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Hold, CoreError> {
    settle(hold_id, HoldStatus::Released, reason, conn)
}

/// Converts an active hold into a real wallet debit: the obligation became
/// real, so the reserved funds leave the wallet and a completed transaction
/// is recorded.
#[tracing::instrument(skip(conn))]
pub fn confirm_hold(
    hold_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Hold, CoreError> {
    let hold = Hold::fetch(hold_id, conn)?;
    if !hold.is_active() {
        return Err(CoreError::HoldNotActive(hold_id.to_string()));
    }

    let now = Utc::now().naive_utc();

    diesel::update(balance_holds::table.filter(balance_holds::id.eq(hold_id)))
        .set((
            balance_holds::status.eq(HoldStatus::Confirmed.as_str()),
            balance_holds::confirmed_at.eq(now),
        ))
        .execute(conn)?;

    // The captured funds come out of the held portion, so both balances
    // shrink together and `available_balance` is unchanged.
    diesel::update(users::table.filter(users::id.eq(&hold.user_id)))
        .set((
            users::wallet_balance.eq(users::wallet_balance - hold.amount),
            users::hold_balance.eq(users::hold_balance - hold.amount),
        ))
        .execute(conn)?;

    diesel::insert_into(wallet_transactions::table)
        .values((
            wallet_transactions::id.eq(Uuid::now_v7().to_string()),
            wallet_transactions::user_id.eq(&hold.user_id),
            wallet_transactions::amount.eq(hold.amount),
            wallet_transactions::kind.eq(TransactionKind::HoldCapture.as_str()),
            wallet_transactions::reference_type.eq(&hold.reference_type),
            wallet_transactions::reference_id.eq(&hold.reference_id),
            wallet_transactions::created_at.eq(now),
        ))
        .execute(conn)?;

    Hold::fetch(hold_id, conn)
}

/// Releases every active hold whose expiry has passed. Balance-wise
/// identical to an explicit release; the terminal status records that the
/// release was time-based.
#[tracing::instrument(skip(conn))]
pub fn expire_holds(
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<Vec<Hold>, CoreError> {
    let expired_ids = balance_holds::table
        .filter(
            balance_holds::status
                .eq(HoldStatus::Active.as_str())
                .and(balance_holds::expires_at.lt(now)),
        )
        .select(balance_holds::id)
        .load::<String>(conn)?;

    let mut settled = Vec::with_capacity(expired_ids.len());
    for id in expired_ids {
        settled.push(settle(
            &id,
            HoldStatus::Expired,
            &format!("expired at {now}"),
            conn,
        )?);
    }

    Ok(settled)
}

/// Sweeper entry point: settles a single hold, re-checking inside the
/// caller's transaction that it is still active and past expiry. Returns
/// `false` when another actor got there first.
pub fn expire_holds_one(
    hold_id: &str,
    now: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<bool, CoreError> {
    let hold = Hold::fetch(hold_id, conn)?;
    if !hold.is_active() {
        return Ok(false);
    }
    match hold.expires_at {
        Some(expires_at) if expires_at < now => {}
        _ => return Ok(false),
    }

    settle(hold_id, HoldStatus::Expired, &format!("expired at {now}"), conn)?;
    Ok(true)
}

/// A user's currently active holds, oldest first.
pub fn active_holds(
    user_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<Hold>, CoreError> {
    Ok(balance_holds::table
        .filter(
            balance_holds::user_id
                .eq(user_id)
                .and(balance_holds::status.eq(HoldStatus::Active.as_str())),
        )
        .order_by(balance_holds::created_at.asc())
        .load::<Hold>(conn)?)
}

fn settle(
    hold_id: &str,
    terminal: HoldStatus,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<Hold, CoreError> {
    debug_assert!(matches!(terminal, HoldStatus::Released | HoldStatus::Expired));

    let hold = Hold::fetch(hold_id, conn)?;
    if !hold.is_active() {
        return Err(CoreError::HoldNotActive(hold_id.to_string()));
    }

    diesel::update(balance_holds::table.filter(balance_holds::id.eq(hold_id)))
        .set((
            balance_holds::status.eq(terminal.as_str()),
            balance_holds::released_at.eq(Utc::now().naive_utc()),
            balance_holds::note.eq(note),
        ))
        .execute(conn)?;

    diesel::update(users::table.filter(users::id.eq(&hold.user_id)))
        .set(users::hold_balance.eq(users::hold_balance - hold.amount))
        .execute(conn)?;

    Hold::fetch(hold_id, conn)
}
