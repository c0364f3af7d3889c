//! Waitless Token Engine - Main Entry Point
//!
//! Composition root: wires the SQLite adapters, the queue service, the
//! JSON-RPC server, and the daily reset scheduler.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waitless_api_rpc::{RpcServer, RpcServerConfig};
use waitless_core::application::{shutdown_channel, DailyResetScheduler, QueueService};
use waitless_core::port::id_provider::UuidProvider;
use waitless_core::port::time_provider::SystemTimeProvider;
use waitless_core::port::BroadcastPublisher;
use waitless_core::port::{
    QueuePublisher, QueueRepository, TimeProvider, TransactionalQueueRepository,
};
use waitless_infra_auth::Argon2SecretVerifier;
use waitless_infra_sqlite::{create_pool, run_migrations, SqliteQueueRepository};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "~/.waitless/queue.db";
const DEFAULT_RPC_PORT: u16 = 9530;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let log_format = std::env::var("WAITLESS_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("waitless=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Waitless Token Engine v{} starting...", VERSION);

    // 2. Load configuration
    let db_path = std::env::var("WAITLESS_DB_PATH")
        .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_DB_PATH).into_owned());

    let rpc_port: u16 = std::env::var("WAITLESS_RPC_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RPC_PORT);

    let utc_offset_minutes: i32 = std::env::var("WAITLESS_UTC_OFFSET_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    info!(db_path = %db_path, "Initializing database...");

    // 3. Initialize database
    if let Some(parent) = Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Cannot create data directory: {}", e))?;
    }
    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let secret_verifier = Arc::new(Argon2SecretVerifier);

    let repo = Arc::new(SqliteQueueRepository::new(pool.clone()));
    let queue_repo: Arc<dyn QueueRepository> = repo.clone();
    let tx_repo: Arc<dyn TransactionalQueueRepository> = repo;

    let publisher = Arc::new(BroadcastPublisher::default());
    let dyn_publisher: Arc<dyn QueuePublisher> = publisher.clone();

    // Drain the fan-out into the daemon log until a push surface consumes it
    let mut events = publisher.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "Queue event published");
        }
    });

    let service = Arc::new(QueueService::new(
        queue_repo.clone(),
        tx_repo,
        dyn_publisher.clone(),
        id_provider,
        time_provider.clone(),
        secret_verifier,
        utc_offset_minutes,
    ));

    // 5. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rpc_config = RpcServerConfig {
        port: rpc_port,
        ..Default::default()
    };
    let rpc_server = RpcServer::new(rpc_config, service);
    let rpc_handle = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 6. Start the daily reset scheduler (sweeps once at startup, then at
    //    every midnight in the configured reference zone)
    info!("Starting daily reset scheduler...");
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler = DailyResetScheduler::new(
        queue_repo,
        dyn_publisher,
        time_provider,
        utc_offset_minutes,
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    info!("System ready. Serving queue requests.");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), scheduler_handle).await;

    info!("Shutdown complete.");

    Ok(())
}
