use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::CoreError,
    schema::{users, wallet_transactions},
};

/// The wallet projection of a user. `hold_balance` mirrors the sum of the
/// user's active holds; funds are spendable only down to that watermark.
#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub game_id: Option<String>,
    pub wallet_balance: i64,
    pub hold_balance: i64,
    pub created_at: chrono::NaiveDateTime,
}

impl User {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<User, CoreError> {
        users::table
            .filter(users::id.eq(user_id))
            .first::<User>(conn)
            .optional()?
            .ok_or(CoreError::UserNotFound)
    }

    pub fn available_balance(&self) -> i64 {
        self.wallet_balance - self.hold_balance
    }
}

#[derive(Queryable, Serialize, Deserialize, Clone, Debug)]
pub struct WalletTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub kind: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Copy, Debug)]
pub enum TransactionKind {
    /// Entry fee taken directly at admission.
    EntryFee,
    /// A hold converted into a real debit at promotion.
    HoldCapture,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::EntryFee => "entry_fee",
            TransactionKind::HoldCapture => "hold_capture",
        }
    }
}

/// Takes `amount` out of the user's spendable funds and records a completed
/// wallet transaction. Must run inside the caller's transaction so the
/// balance check and the debit are atomic.
#[tracing::instrument(skip(conn))]
pub fn debit_wallet(
    user_id: &str,
    amount: i64,
    kind: TransactionKind,
    reference: Option<(&str, &str)>,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "debit amount must be positive, got {amount}"
        )));
    }

    let user = User::fetch(user_id, conn)?;
    if user.available_balance() < amount {
        return Err(CoreError::InsufficientBalance {
            required: amount,
            available: user.available_balance(),
        });
    }

    diesel::update(users::table.filter(users::id.eq(user_id)))
        .set(users::wallet_balance.eq(users::wallet_balance - amount))
        .execute(conn)?;

    let txn = WalletTransaction {
        id: Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        amount,
        kind: kind.as_str().to_string(),
        reference_type: reference.map(|(t, _)| t.to_string()),
        reference_id: reference.map(|(_, id)| id.to_string()),
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(wallet_transactions::table)
        .values((
            wallet_transactions::id.eq(&txn.id),
            wallet_transactions::user_id.eq(&txn.user_id),
            wallet_transactions::amount.eq(txn.amount),
            wallet_transactions::kind.eq(&txn.kind),
            wallet_transactions::reference_type.eq(&txn.reference_type),
            wallet_transactions::reference_id.eq(&txn.reference_id),
            wallet_transactions::created_at.eq(txn.created_at),
        ))
        .execute(conn)?;

    Ok(txn)
}
