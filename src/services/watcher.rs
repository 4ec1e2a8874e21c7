//! Directory watcher
//!
//! Observes the source image directory and publishes a [`WatchEvent`] for
//! every image added or removed. Non-image files are skipped silently.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{GalleryError, Result};
use crate::models::{is_image_path, WatchEvent};

/// Keeps the underlying OS watch alive; dropping it stops the events
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    source_dir: PathBuf,
}

impl DirectoryWatcher {
    /// Start watching `source_dir`, sending events into `tx`.
    ///
    /// With `initial_scan`, every image already present is published as an
    /// add event so missing derivatives get backfilled.
    pub fn start(
        source_dir: impl Into<PathBuf>,
        tx: mpsc::UnboundedSender<WatchEvent>,
        initial_scan: bool,
    ) -> Result<Self> {
        let source_dir = source_dir.into();
        if !source_dir.is_dir() {
            return Err(GalleryError::SourceDirNotFound { path: source_dir });
        }

        let events = tx.clone();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for watch_event in translate(event) {
                        debug!(
                            kind = watch_event.kind.as_str(),
                            file = %watch_event.filename(),
                            "Filesystem change"
                        );
                        let _ = events.send(watch_event);
                    }
                }
                Err(e) => warn!("Watcher error: {}", e),
            }
        })
        .map_err(|e| GalleryError::Watch {
            path: source_dir.clone(),
            source: e,
        })?;

        watcher
            .watch(&source_dir, RecursiveMode::NonRecursive)
            .map_err(|e| GalleryError::Watch {
                path: source_dir.clone(),
                source: e,
            })?;

        info!("Watching {}", source_dir.display());

        if initial_scan {
            let existing = scan_existing(&source_dir)?;
            info!("Queued {} existing images", existing.len());
            for event in existing {
                let _ = tx.send(event);
            }
        }

        Ok(Self {
            _watcher: watcher,
            source_dir,
        })
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

/// Add events for the images currently in `dir`, sorted by name
pub fn scan_existing(dir: &Path) -> Result<Vec<WatchEvent>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    Ok(paths.into_iter().filter_map(WatchEvent::add).collect())
}

/// Map a raw notification to the image events it implies
fn translate(event: Event) -> Vec<WatchEvent> {
    let paths = event.paths.into_iter();

    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.filter_map(WatchEvent::add).collect()
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.filter_map(WatchEvent::remove).collect()
        }
        // The From and To halves have already been delivered separately
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Vec::new(),
        // Backends that cannot tell the two sides of a rename apart
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .filter(|p| is_image_path(p))
            .filter_map(|p| {
                if p.exists() {
                    WatchEvent::add(p)
                } else {
                    WatchEvent::remove(p)
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}
