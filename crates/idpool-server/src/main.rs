#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use idpool::{PoolBuilder, TokioExecutor};
use server::config::{CliArgs, ServerConfig};
use server::service::config::{Clock, Pool, Source};
use server::service::handler::AppState;
use server::service::router;
use server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

// mimalloc holds up better than the system allocator under contention,
// notably on musl.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry(config.log_json)?;

    let pool = build_pool(&config).await?;
    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;
    log_startup_info(&config);

    let app = router(AppState::new(pool.clone(), &config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

/// Builds the pool and fills both buffers before the listener opens.
///
/// The fill calls the source synchronously, so it runs on the blocking pool.
async fn build_pool(config: &ServerConfig) -> anyhow::Result<Pool> {
    let source = Source::new(config.datacenter_id, config.worker_id, Clock::default())?;
    let executor = TokioExecutor::current()?;

    let mut builder = PoolBuilder::new(config.buffer_size).backoff(config.refill_backoff);
    if let Some(timeout) = config.startup_timeout {
        builder = builder.startup_timeout(timeout);
    }

    let pool = tokio::task::spawn_blocking(move || builder.build_with_executor(source, executor))
        .await?
        .context("failed to fill the ID pool")?;
    Ok(pool)
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting ID service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting ID service on {} (datacenter {}, worker {}, buffer size {})",
            config.server_addr,
            config.datacenter_id,
            config.worker_id,
            config.buffer_size
        );
    }
}

async fn shutdown_signal(pool: Pool) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // Stops in-flight refills so the blocking pool can drain.
    pool.close();
}
