// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use omr_audit::config::Config;
use omr_audit::routes;
use omr_audit::state::AppState;
use omr_audit::store::{PgRecordStore, RecordStore, Stores};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(config.worker_pool_size as u32 + 1)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // The online copy is optional and may be down at startup; requests
    // against it fail with 503 until it comes back.
    let online: Option<Arc<dyn RecordStore>> = match &config.online_database_url {
        Some(url) => match PgPoolOptions::new()
            .max_connections(config.worker_pool_size as u32 + 1)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy(url)
        {
            Ok(online_pool) => {
                tracing::info!("Online database configured.");
                Some(Arc::new(PgRecordStore::new(online_pool)))
            }
            Err(e) => {
                tracing::error!("Invalid ONLINE_DATABASE_URL, online target disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let state = AppState {
        stores: Stores::new(Arc::new(PgRecordStore::new(pool)), online),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    tracing::info!(workers = config.worker_pool_size, "Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listening address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
