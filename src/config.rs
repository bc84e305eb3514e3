use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{
    api,
    notify::Notifier,
    state::{AppState, DbPool},
};

pub fn create_app(pool: DbPool) -> Router {
    create_app_with_notifier(pool, Notifier::new(1000))
}

/// Assembles the router. Callers that want to observe the notification
/// stream (the server binary's delivery worker, tests) pass their own
/// notifier and keep a subscription to it.
pub fn create_app_with_notifier(pool: DbPool, notifier: Notifier) -> Router {
    api::router()
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pool, notifier })
}
