//! Thin JSON transport over the core operations. Handlers validate nothing
//! beyond shape: every rule lives in the domain modules, and diesel work
//! runs on the blocking pool.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::CoreError,
    holds::{self, Hold},
    notify::{Notification, NotificationContents},
    state::{AppState, DbPool},
    tournaments::{
        checkin::{self, CheckinStatus, EntrantCheckinStatus},
        finalize::{self, FinalizeOutcome},
        registration::{self, RegisterRequest, Registration, RegistrationOutcome},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tournaments/:tid/register", post(register))
        .route("/tournaments/:tid/checkin", get(all_checkin_statuses))
        .route(
            "/tournaments/:tid/checkin/:user_id",
            get(checkin_status).post(perform_checkin),
        )
        .route("/tournaments/:tid/finalize", post(finalize_tournament))
        .route("/holds/:hold_id/release", post(release_hold))
        .route("/users/:user_id/holds", get(active_holds))
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn internal(message: String) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::TournamentNotFound
            | CoreError::UserNotFound
            | CoreError::HoldNotFound
            | CoreError::NotRegistered => StatusCode::NOT_FOUND,
            CoreError::TournamentNotOpen
            | CoreError::TournamentNotStarted
            | CoreError::TournamentFull
            | CoreError::AlreadyRegistered
            | CoreError::AlreadyWaitlisted
            | CoreError::MissingGameIdentity { .. }
            | CoreError::PlayerBanned { .. }
            | CoreError::InsufficientBalance { .. }
            | CoreError::HoldNotActive(_)
            | CoreError::CheckinRefused(_) => StatusCode::CONFLICT,
            // Lock conflicts: the caller may retry the whole request.
            _ if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Integrity(_) | CoreError::Db(_) | CoreError::Pool(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error surfaced to API: {err}");
        }

        ApiError {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.code, "message": self.message })),
        )
            .into_response()
    }
}

/// Runs a core operation on the blocking pool with a fresh connection.
async fn blocking<T, F>(pool: DbPool, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T, CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(CoreError::from)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| ApiError::internal(format!("blocking task failed: {e}")))?
    .map_err(ApiError::from)
}

async fn register(
    State(state): State<AppState>,
    Path(tid): Path<String>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegistrationOutcome>, ApiError> {
    let outcome = {
        let tid = tid.clone();
        blocking(state.pool.clone(), move |conn| {
            registration::register(&tid, &req, Utc::now().naive_utc(), conn)
        })
        .await?
    };

    match &outcome {
        RegistrationOutcome::Confirmed {
            registration,
            slot_number,
            ..
        } => state.notifier.send(Notification {
            tournament_id: Some(tid),
            user_id: registration.user_id.clone(),
            contents: NotificationContents::SlotConfirmed {
                slot_number: *slot_number,
            },
        }),
        RegistrationOutcome::Waitlisted {
            registration,
            waitlist_position,
            ..
        } => state.notifier.send(Notification {
            tournament_id: Some(tid),
            user_id: registration.user_id.clone(),
            contents: NotificationContents::WaitlistJoined {
                position: *waitlist_position,
            },
        }),
        RegistrationOutcome::WaitlistAvailable { .. } => {}
    }

    Ok(Json(outcome))
}

async fn checkin_status(
    State(state): State<AppState>,
    Path((tid, user_id)): Path<(String, String)>,
) -> Result<Json<CheckinStatus>, ApiError> {
    let status = blocking(state.pool, move |conn| {
        checkin::checkin_status(&tid, &user_id, Utc::now().naive_utc(), conn)
    })
    .await?;
    Ok(Json(status))
}

async fn all_checkin_statuses(
    State(state): State<AppState>,
    Path(tid): Path<String>,
) -> Result<Json<Vec<EntrantCheckinStatus>>, ApiError> {
    let statuses = blocking(state.pool, move |conn| {
        checkin::all_checkin_statuses(&tid, Utc::now().naive_utc(), conn)
    })
    .await?;
    Ok(Json(statuses))
}

#[derive(Serialize)]
pub struct CheckinResponse {
    pub success: bool,
    pub message: String,
    pub registration: Registration,
}

async fn perform_checkin(
    State(state): State<AppState>,
    Path((tid, user_id)): Path<(String, String)>,
) -> Result<Json<CheckinResponse>, ApiError> {
    let registration = {
        let tid = tid.clone();
        blocking(state.pool.clone(), move |conn| {
            checkin::perform_checkin(&tid, &user_id, Utc::now().naive_utc(), conn)
        })
        .await?
    };

    state.notifier.send(Notification {
        tournament_id: Some(tid),
        user_id: registration.user_id.clone(),
        contents: NotificationContents::CheckedIn,
    });

    Ok(Json(CheckinResponse {
        success: true,
        message: "checked in".to_string(),
        registration,
    }))
}

async fn finalize_tournament(
    State(state): State<AppState>,
    Path(tid): Path<String>,
) -> Result<Json<FinalizeOutcome>, ApiError> {
    let outcome = {
        let tid = tid.clone();
        blocking(state.pool.clone(), move |conn| {
            finalize::finalize(&tid, Utc::now().naive_utc(), conn)
        })
        .await?
    };

    for promotion in &outcome.promoted {
        state.notifier.send(Notification {
            tournament_id: Some(tid.clone()),
            user_id: promotion.user_id.clone(),
            contents: NotificationContents::PromotedFromWaitlist {
                slot_number: promotion.slot_number,
            },
        });
    }
    for disqualification in &outcome.disqualified {
        state.notifier.send(Notification {
            tournament_id: Some(tid.clone()),
            user_id: disqualification.user_id.clone(),
            contents: NotificationContents::DisqualifiedNoShow,
        });
    }

    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct ReleaseHoldBody {
    pub reason: String,
}

async fn release_hold(
    State(state): State<AppState>,
    Path(hold_id): Path<String>,
    Json(body): Json<ReleaseHoldBody>,
) -> Result<Json<Hold>, ApiError> {
    let hold = blocking(state.pool.clone(), move |conn| {
        conn.immediate_transaction(|conn| {
            holds::release_hold(&hold_id, &body.reason, conn)
        })
    })
    .await?;

    state.notifier.send(Notification {
        tournament_id: None,
        user_id: hold.user_id.clone(),
        contents: NotificationContents::HoldReleased {
            hold_id: hold.id.clone(),
        },
    });

    Ok(Json(hold))
}

async fn active_holds(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Hold>>, ApiError> {
    let holds = blocking(state.pool, move |conn| {
        holds::active_holds(&user_id, conn)
    })
    .await?;
    Ok(Json(holds))
}
