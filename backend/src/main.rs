//! Adaptive notification engine
//!
//! Runs the water, progress and tracking reminder schedulers against the
//! fitness database and serves health probes until shutdown.

use anyhow::Result;
use fitness_reminders_backend::{
    config,
    db,
    push::NotificationDispatcher,
    routes,
    services::reminders::{ReminderDeps, ReminderSchedulers},
    state::AppState,
    store::PgReminderStore,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        "Starting fitness reminder engine"
    );

    // Create database pool
    info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database.url, config.database.max_connections).await?;

    // Run migrations (skip in production if using separate migration job)
    if !config::AppConfig::is_production() {
        info!("Running database migrations...");
        db::run_migrations(&db_pool).await?;
    }

    let dispatcher = build_dispatcher(&config);
    let store = Arc::new(PgReminderStore::new(db_pool.clone()));
    let schedulers = Arc::new(ReminderSchedulers::from_config(
        &config,
        ReminderDeps::new(store, dispatcher),
    ));
    schedulers.start_all().await;

    let state = AppState::new(db_pool, Arc::clone(&schedulers));
    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Health endpoints listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Serve with graceful shutdown
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Stopping reminder schedulers...");
    schedulers.stop_all().await;

    served?;
    info!("Shutdown complete");
    Ok(())
}

/// Push dispatcher from configuration
///
/// Bad credentials are logged and leave push unconfigured; the schedulers
/// keep running and report the problem on every send.
fn build_dispatcher(config: &config::AppConfig) -> NotificationDispatcher {
    match NotificationDispatcher::from_config(&config.push) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!(error = %e, "Failed to initialize push transport");
            warn!("Notifications will not be delivered until push credentials are fixed");
            NotificationDispatcher::unconfigured()
        }
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "fitness_reminders_backend=info,tower_http=info".into()
        } else {
            "fitness_reminders_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Pretty logging for development
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
