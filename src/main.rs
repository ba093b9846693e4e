//! Expenses USSD - menu-driven expense tracking over USSD
//!
//! An HTTP service that answers USSD gateway callbacks with a session-backed
//! menu state machine and exposes the underlying financial records.

mod api;
mod config;
mod db;
mod records;
mod session;
mod ussd;

use api::{create_router, AppState};
use config::{AppConfig, SessionBackend};
use db::Database;
use records::DatabaseRecordService;
use session::{MemorySessionStore, SessionStore, SqliteSessionStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expenses_ussd=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    let purged = db.purge_expired_sessions(chrono::Utc::now())?;
    if purged > 0 {
        tracing::info!(count = purged, "Purged expired sessions");
    }

    let sessions = session_store(&config, &db).await?;
    let records = Arc::new(DatabaseRecordService::new(db));
    let state = AppState::new(records, sessions);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        session_backend = %config.session_backend,
        session_ttl_secs = config.session_ttl.as_secs(),
        "Expenses USSD server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn session_store(
    config: &AppConfig,
    db: &Database,
) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error>> {
    match config.session_backend {
        SessionBackend::Sqlite => Ok(Arc::new(SqliteSessionStore::new(
            db.clone(),
            config.session_ttl,
        ))),
        SessionBackend::Memory => Ok(Arc::new(MemorySessionStore::new(config.session_ttl))),
        SessionBackend::Redis => redis_session_store(config).await,
    }
}

#[cfg(feature = "redis")]
async fn redis_session_store(
    config: &AppConfig,
) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error>> {
    let url = config
        .redis_url
        .as_deref()
        .ok_or("EXPENSES_REDIS_URL is required for the redis session backend")?;
    tracing::info!("Connecting to Redis session store");
    let store = session::RedisSessionStore::connect(url, config.session_ttl).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
#[allow(clippy::unused_async)]
async fn redis_session_store(
    _config: &AppConfig,
) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error>> {
    Err("the redis session backend needs a build with the `redis` feature".into())
}
