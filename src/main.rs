//! Gallery Events - Entry Point
//!
//! Starts the directory watcher, the derivative pipeline and the WebSocket
//! gateway with graceful shutdown support.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod derivatives;
mod error;
mod hub;
mod models;
mod services;

use api::GatewayServer;
use config::Config;
use derivatives::{DerivativeSet, ImageRenderer};
use hub::EventHub;
use services::{DerivativePipeline, DirectoryWatcher};

#[tokio::main]
async fn main() -> error::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("gallery_events={},tower_http=info", config.log.level).into()
    });
    let (json_layer, pretty_layer) = if config.log.format == "json" {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();

    info!("Starting Gallery Events");

    // Make sure every image folder exists before watching
    let derivatives = Arc::new(DerivativeSet::from_config(&config));
    derivatives.ensure_dirs()?;
    info!("Image directories ready under {}", config.images.root.display());

    let hub = Arc::new(EventHub::new());
    hub.add_log("Image watcher starting...");

    // Create shutdown channel
    let (shutdown_tx, _) = watch::channel(false);

    // Start derivative pipeline
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let pipeline = Arc::new(DerivativePipeline::new(
        hub.clone(),
        derivatives.clone(),
        Arc::new(ImageRenderer::new()),
        &config.pipeline,
    ));
    let pipeline_task = tokio::spawn(pipeline.run(event_rx, shutdown_tx.subscribe()));

    // Start watching; the watcher owns the only event sender
    let watcher = match DirectoryWatcher::start(
        derivatives.source_dir(),
        event_tx,
        config.pipeline.initial_scan,
    ) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!("Failed to start directory watcher: {}", e);
            let _ = shutdown_tx.send(true);
            let _ = pipeline_task.await;
            return Err(e);
        }
    };

    // Start gateway
    let gateway = GatewayServer::new(config.gateway.clone(), hub.clone());
    let gateway_shutdown = shutdown_tx.subscribe();
    let gateway_task = tokio::spawn(async move {
        if let Err(e) = gateway.run(gateway_shutdown).await {
            error!("Gateway error: {}", e);
        }
    });

    info!(
        "Gallery Events started - watching {}, gateway on {}",
        watcher.source_dir().display(),
        config.gateway_addr()
    );

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    // Stop producing events, then tell every service to stop
    drop(watcher);
    let _ = shutdown_tx.send(true);
    hub.shutdown();

    // Wait for all tasks to complete
    let _ = tokio::join!(pipeline_task, gateway_task);

    info!("Gallery Events stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
