// crates/server/src/main.rs
//! convo-live server binary.
//!
//! Scans the projects root, starts the HTTP server and keeps a file watcher
//! running until shutdown.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use convo_live_server::live::Orchestrator;
use convo_live_server::{create_app, AppState, Config};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config);

    let root = config
        .projects_root()
        .context("could not determine the projects directory")?;

    let orchestrator = Orchestrator::new(&root, config.subscriber_buffer);
    match orchestrator.load_initial().await {
        Ok(count) => tracing::info!(conversations = count, "Loaded conversations"),
        Err(e) => tracing::warn!(error = %e, "Initial scan failed; starting with an empty list"),
    }

    let shutdown = CancellationToken::new();
    let watch_task = if config.no_watch {
        tracing::info!("File watching disabled");
        None
    } else {
        Some(tokio::spawn(
            orchestrator
                .clone()
                .watch_until(config.debounce_window(), shutdown.clone()),
        ))
    };

    let app = create_app(AppState::new(orchestrator));
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        root = %root.display(),
        "convo-live listening"
    );

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await
        .context("server error")?;

    shutdown.cancel();
    if let Some(task) = watch_task {
        let _ = task.await;
    }
    tracing::info!("Shut down cleanly");
    Ok(())
}
