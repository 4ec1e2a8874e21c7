//! Gateway server using Axum
//!
//! Accepts browser WebSocket connections and hands each one to the event hub.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::GatewayConfig;
use crate::error::{GalleryError, Result};
use crate::hub::EventHub;

use super::routes;

/// Shared state for gateway handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<EventHub>,
    /// Interval between keep-alive pings
    pub keepalive: Duration,
    pub shutdown: watch::Receiver<bool>,
}

/// WebSocket gateway
pub struct GatewayServer {
    config: GatewayConfig,
    hub: Arc<EventHub>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, hub: Arc<EventHub>) -> Self {
        Self { config, hub }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router
    fn build_router(&self, shutdown: watch::Receiver<bool>) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            keepalive: self.config.keepalive_interval(),
            shutdown,
        };

        routes::create_router(state).layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until shutdown
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = TcpListener::bind(self.addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let router = self.build_router(shutdown.clone());

        match listener.local_addr() {
            Ok(addr) => info!("Gateway listening on ws://{}", addr),
            Err(_) => info!("Gateway listening on ws://{}", self.addr()),
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await
            .map_err(|e| GalleryError::Server(e.to_string()))?;

        info!("Gateway shut down");
        Ok(())
    }
}

/// Resolves once `true` is published. Never resolves if the sender goes away
/// without doing so.
pub(crate) async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
