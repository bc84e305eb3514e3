use std::time::Duration;

use clap::Parser;
use diesel_migrations::MigrationHarness;
use entrydesk::{MIGRATIONS, config::create_app, holds::sweeper, state};

#[derive(Parser)]
pub struct Serve {
    #[clap(long, env = "DATABASE_URL", default_value = "entrydesk.sqlite")]
    database_url: String,
    #[clap(long, default_value = "0.0.0.0:8000")]
    bind: String,
    /// Seconds between hold expiry sweeps.
    #[clap(long, default_value_t = 60)]
    sweep_interval: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let args = Serve::parse();

    let pool = state::build_pool(&args.database_url).unwrap();

    {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().unwrap();
            conn.run_pending_migrations(MIGRATIONS).unwrap();
        })
        .await
        .unwrap();
    }

    tokio::spawn(sweeper::run(
        pool.clone(),
        Duration::from_secs(args.sweep_interval),
    ));

    let app = create_app(pool);

    let listener = tokio::net::TcpListener::bind(&args.bind).await.unwrap();
    tracing::info!("listening on {}", args.bind);
    axum::serve(listener, app).await.unwrap();
}
