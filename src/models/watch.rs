use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions the pipeline derives renditions for
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchKind {
    Add,
    Remove,
}

impl WatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchKind::Add => "add",
            WatchKind::Remove => "remove",
        }
    }
}

/// A filesystem change affecting one source image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub kind: WatchKind,
    pub path: PathBuf,
}

impl WatchEvent {
    /// Build an event, or `None` if the path is not a recognized image
    pub fn new(kind: WatchKind, path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if !is_image_path(&path) {
            return None;
        }
        Some(Self { kind, path })
    }

    pub fn add(path: impl Into<PathBuf>) -> Option<Self> {
        Self::new(WatchKind::Add, path)
    }

    pub fn remove(path: impl Into<PathBuf>) -> Option<Self> {
        Self::new(WatchKind::Remove, path)
    }

    /// File name of the source image
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Check whether a path names an image the pipeline handles
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
