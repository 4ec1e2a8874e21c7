//! Derivative pipeline
//!
//! Consumes watch events from a single queue. Each event runs in its own
//! task, so files are processed independently; within one added file the
//! size classes render concurrently and are joined before anything is
//! logged. Every handled event ends with a refresh broadcast, even when
//! nothing needed rendering.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::derivatives::{DerivativeSet, Renderer, SizeClass};
use crate::error::RenderError;
use crate::hub::EventHub;
use crate::models::{BroadcastMessage, WatchEvent, WatchKind};

/// Turns watch events into derivative files, log lines and refreshes
pub struct DerivativePipeline {
    hub: Arc<EventHub>,
    derivatives: Arc<DerivativeSet>,
    renderer: Arc<dyn Renderer>,
    render_slots: Semaphore,
    render_timeout: Duration,
    settle_delay: Duration,
}

impl DerivativePipeline {
    pub fn new(
        hub: Arc<EventHub>,
        derivatives: Arc<DerivativeSet>,
        renderer: Arc<dyn Renderer>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            hub,
            derivatives,
            renderer,
            render_slots: Semaphore::new(config.max_concurrent_renders.max(1)),
            render_timeout: config.render_timeout(),
            settle_delay: config.settle_delay(),
        }
    }

    /// Dispatch loop (call in a spawned task).
    ///
    /// Returns once shutdown is signalled, aborting in-flight work, or once
    /// the event queue closes, after in-flight work has finished.
    #[instrument(skip_all)]
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<WatchEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            "Starting derivative pipeline for {}",
            self.derivatives.source_dir().display()
        );

        let mut tasks = JoinSet::new();
        let mut drain = false;

        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => {
                        let pipeline = Arc::clone(&self);
                        tasks.spawn(async move {
                            pipeline.handle(event).await;
                        });
                    }
                    None => {
                        debug!("Watch event queue closed");
                        drain = true;
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Derivative task panicked: {}", e);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Derivative pipeline shutting down");
                        break;
                    }
                }
            }
        }

        if drain {
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!("Derivative task failed: {}", e);
                }
            }
        } else {
            tasks.shutdown().await;
        }
    }

    /// Process one event to completion and return the status line logged for it
    pub async fn handle(&self, event: WatchEvent) -> String {
        match event.kind {
            WatchKind::Add => self.handle_add(&event).await,
            WatchKind::Remove => self.handle_remove(&event).await,
        }
    }

    async fn handle_add(&self, event: &WatchEvent) -> String {
        let filename = event.filename();
        debug!(file = %filename, "Handling added image");

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let targets = self.derivatives.targets_for(&filename);
        let mut pending: Vec<BoxFuture<'_, String>> = Vec::with_capacity(targets.len());
        for (class, target) in targets {
            if exists(&target).await {
                let note = format!("ℹ️ {} already exists", class.title());
                pending.push(future::ready(note).boxed());
            } else {
                pending.push(self.render_one(&event.path, class, target).boxed());
            }
        }

        let mut fragments = vec![format!("🆕 Image detected: {}", filename)];
        fragments.extend(future::join_all(pending).await);

        let summary = fragments.join(" | ");
        self.hub.add_log(summary.clone());
        self.refresh();
        summary
    }

    async fn render_one(&self, source: &Path, class: &SizeClass, target: PathBuf) -> String {
        let result = match self.render_slots.acquire().await {
            Ok(_permit) => {
                match timeout(
                    self.render_timeout,
                    self.renderer.render(source, &target, class.max_width, true),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(RenderError::Timeout {
                        secs: self.render_timeout.as_secs(),
                    }),
                }
            }
            Err(_) => Err(RenderError::Task("render slots closed".to_string())),
        };

        match result {
            Ok(()) => {
                debug!(path = %target.display(), "Rendered {}", class.name);
                format!("✅ Converted to {}", class.label)
            }
            Err(e) => {
                warn!(source = %source.display(), "Failed to render {}: {}", class.name, e);
                format!("❌ {} error: {}", class.title(), e.reason())
            }
        }
    }

    async fn handle_remove(&self, event: &WatchEvent) -> String {
        let filename = event.filename();
        debug!(file = %filename, "Handling removed image");

        let mut fragments = vec![format!("🗑️ Image deleted: {}", filename)];
        for (class, target) in self.derivatives.targets_for(&filename) {
            match tokio::fs::remove_file(&target).await {
                Ok(()) => fragments.push(format!("🗑️ {} removed", class.title())),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %target.display(), "Failed to remove {}: {}", class.name, e);
                    fragments.push(format!("❌ {} removal error: {}", class.title(), e));
                }
            }
        }

        let summary = fragments.join(" | ");
        self.hub.add_log(summary.clone());
        self.refresh();
        summary
    }

    fn refresh(&self) {
        self.hub.broadcast(&BroadcastMessage::Refresh);
        self.hub
            .add_log(format!("Sent refresh to {} clients.", self.hub.client_count()));
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
