//! Boothline - Main Entry Point
//!
//! Composition root: configuration, logging, SQLite, the JSON-RPC server and
//! the expiry sweeper.

mod config;
mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use boothline_api_rpc::{BroadcastNotifier, RpcServer, RpcServerConfig};
use boothline_core::application::{
    shutdown_pair, ExpirySweeper, QueueDirectory, QueueEngine, WaitTimeEstimator,
};
use boothline_core::port::id_provider::UuidProvider;
use boothline_core::port::time_provider::SystemTimeProvider;
use boothline_infra_sqlite::{create_pool, run_migrations, SqliteQueueRepository};

use crate::config::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SWEEPER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration, then logging (the filter and format come from config)
    let settings = Settings::load()?;
    let _log_guard = telemetry::init_logging(&settings.log)?;

    info!("Boothline v{} starting...", VERSION);

    // 2. Database
    let db_url = settings.database.expanded_url();
    info!(db_url = %db_url, "Initializing database...");
    let pool = create_pool(&db_url, settings.database.max_connections)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Wiring
    let notifier = BroadcastNotifier::default();
    let engine = QueueEngine::new(WaitTimeEstimator::new(
        settings.engine.default_service_minutes,
    ));
    let directory = Arc::new(
        QueueDirectory::new(
            Arc::new(SqliteQueueRepository::new(pool.clone())),
            Arc::new(notifier.clone()),
            Arc::new(UuidProvider),
            Arc::new(SystemTimeProvider),
        )
        .with_engine(engine)
        .with_default_settings(settings.queue_defaults)
        .with_retry(settings.engine.retry()),
    );

    // 4. JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: settings.rpc.host.clone(),
        port: settings.rpc.port,
    };
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_config, directory.clone(), notifier)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 5. Expiry sweeper
    let (shutdown_trigger, shutdown_signal) = shutdown_pair();
    let sweeper = ExpirySweeper::new(directory).with_interval(settings.sweeper.interval());
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_signal));

    info!(
        rpc_addr = %rpc_addr,
        sweep_interval_secs = settings.sweeper.interval_secs,
        "System ready"
    );

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    shutdown_trigger.trigger();
    if tokio::time::timeout(SWEEPER_STOP_TIMEOUT, sweeper_handle)
        .await
        .is_err()
    {
        error!("Sweeper did not stop in time");
    }

    pool.close().await;
    info!("Shutdown complete.");

    Ok(())
}
