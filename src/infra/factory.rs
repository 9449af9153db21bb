use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{EntrantRepository, EventRepository, NotificationRepository};
use crate::domain::services::lifecycle::LifecycleManager;
use crate::infra::repositories::{
    memory_repo::InMemoryStore,
    sqlite_entrant_repo::SqliteEntrantRepo,
    sqlite_event_repo::SqliteEventRepo,
    sqlite_notification_repo::SqliteNotificationRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    if config.uses_memory_store() {
        info!("Using in-memory store (data is lost on shutdown)");

        let store = Arc::new(InMemoryStore::new());
        return build_state(config, store.clone(), store.clone(), store);
    }

    info!("Initializing SQLite connection with WAL Mode...");

    let opts = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid SQLite connection string")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .expect("Failed to connect to SQLite");

    run_sqlite_migrations(&pool).await;

    sqlite_state(config, pool)
}

pub fn sqlite_state(config: &Config, pool: SqlitePool) -> AppState {
    build_state(
        config,
        Arc::new(SqliteEventRepo::new(pool.clone())),
        Arc::new(SqliteEntrantRepo::new(pool.clone())),
        Arc::new(SqliteNotificationRepo::new(pool)),
    )
}

pub fn build_state(
    config: &Config,
    event_repo: Arc<dyn EventRepository>,
    entrant_repo: Arc<dyn EntrantRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
) -> AppState {
    let lifecycle = Arc::new(LifecycleManager::new(
        entrant_repo.clone(),
        event_repo.clone(),
        notification_repo.clone(),
        config.draw_policy,
        config.lottery_seed,
    ));

    AppState {
        config: config.clone(),
        event_repo,
        entrant_repo,
        notification_repo,
        lifecycle,
    }
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
