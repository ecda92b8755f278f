mod cli;

use crate::cli::{LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use stubby_core::LinkBackend;
use stubby_gateway::{App, AppState};
use stubby_storage::{InMemoryBackend, RedisBackend, SqliteBackend};
use stubby_store::{LinkStore, StoreSettings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        expose_info = config.expose_info,
        "starting stubby gateway"
    );

    let settings = StoreSettings {
        max_url_length: config.max_url_length,
        click_failure: config.click_failure.into(),
        operation_timeout: config.operation_timeout(),
    };

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, InMemoryBackend::new(), settings).await?;
        }
        StorageBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("redis url is required when storage backend is redis")?;
            let backend = RedisBackend::connect(redis_url, config.redis_prefix.clone())
                .await
                .context("failed to connect to redis")?;
            run_server(&config, backend, settings).await?;
        }
        StorageBackendArg::Sqlite => {
            let sqlite_url = config
                .sqlite_url
                .as_deref()
                .context("sqlite url is required when storage backend is sqlite")?;
            let backend = SqliteBackend::connect(sqlite_url)
                .await
                .context("failed to open sqlite database")?;
            run_server(&config, backend, settings).await?;
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn run_server<B: LinkBackend>(
    config: &CLI,
    backend: B,
    settings: StoreSettings,
) -> anyhow::Result<()> {
    let store = LinkStore::with_settings(backend, settings);
    let mut state = AppState::new(Arc::new(store)).with_info(config.expose_info);
    if let Some(base_url) = &config.public_base_url {
        state = state.with_public_base_url(base_url.clone());
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    let local_addr: SocketAddr = listener.local_addr()?;
    info!(listen_addr = %local_addr, "gateway listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(error = %err, "cannot listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
