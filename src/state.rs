use diesel::{
    SqliteConnection,
    r2d2::{ConnectionManager, Pool},
};

use crate::notify::Notifier;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Shared handles threaded through the axum router.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub notifier: Notifier,
}

/// Builds the connection pool. In-memory databases get a single connection
/// (SQLite `:memory:` databases are per-connection, so a larger pool would
/// see different databases).
pub fn build_pool(database_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    Pool::builder()
        .max_size(if database_url == ":memory:" { 1 } else { 10 })
        .build(ConnectionManager::<SqliteConnection>::new(database_url))
}
