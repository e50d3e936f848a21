use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zone_portal::{
    AppState,
    config::{AppConfig, Env, StorageConfig},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{LocalDiskStorage, S3StorageClient, StorageState},
};

/// Builds the attachment backend selected by configuration and provisions its bucket or
/// upload directory.
async fn init_storage(config: &StorageConfig) -> StorageState {
    let storage: StorageState = match config {
        StorageConfig::LocalDisk { dir, public_prefix } => {
            tracing::info!(dir = %dir, "using local-disk attachment storage");
            Arc::new(LocalDiskStorage::new(dir, public_prefix))
        }
        StorageConfig::S3 {
            endpoint,
            region,
            access_key,
            secret_key,
            bucket,
            public_url,
        } => {
            tracing::info!(endpoint = %endpoint, bucket = %bucket, "using S3 attachment storage");
            Arc::new(
                S3StorageClient::new(
                    endpoint,
                    region,
                    access_key,
                    secret_key,
                    bucket,
                    public_url.as_deref(),
                )
                .await,
            )
        }
    };
    storage.ensure_bucket_exists().await;
    storage
}

/// main
///
/// Startup order: configuration, logging, database (with migrations), storage, HTTP.
/// Any failure before the listener is bound aborts the process.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise crate-level debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "zone_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.plaintext_reset && config.env == Env::Production {
        tracing::warn!("ALLOW_PLAINTEXT_RESET is on in production");
    }

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Storage
    let storage = init_storage(&config.storage).await;

    // 5. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        storage,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
