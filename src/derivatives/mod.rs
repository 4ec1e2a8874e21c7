//! Derivative renditions
//!
//! A source image in the `full` directory has one derivative per size class,
//! stored under the same file name in that class's directory. Whether the
//! derivative file exists is the only signal of whether it still needs work.

mod renderer;

pub use renderer::{ImageRenderer, Renderer};

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;

/// A named rendition size with its own output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeClass {
    /// Stable identifier, e.g. `thumbnail`
    pub name: String,
    /// Human wording used in status lines, e.g. `medium image`
    pub label: String,
    pub dir: PathBuf,
    pub max_width: u32,
}

impl SizeClass {
    pub fn new(name: &str, label: &str, dir: impl Into<PathBuf>, max_width: u32) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            dir: dir.into(),
            max_width,
        }
    }

    pub fn thumbnail(dir: impl Into<PathBuf>, max_width: u32) -> Self {
        Self::new("thumbnail", "thumbnail", dir, max_width)
    }

    pub fn medium(dir: impl Into<PathBuf>, max_width: u32) -> Self {
        Self::new("medium", "medium image", dir, max_width)
    }

    /// Label with its first letter capitalized
    pub fn title(&self) -> String {
        let mut chars = self.label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn target_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

/// Source directory plus the size classes derived from it
#[derive(Debug, Clone)]
pub struct DerivativeSet {
    source_dir: PathBuf,
    classes: Vec<SizeClass>,
}

impl DerivativeSet {
    pub fn new(source_dir: impl Into<PathBuf>, classes: Vec<SizeClass>) -> Self {
        Self {
            source_dir: source_dir.into(),
            classes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.source_dir(),
            vec![
                SizeClass::thumbnail(config.thumb_dir(), config.images.thumb_width),
                SizeClass::medium(config.medium_dir(), config.images.medium_width),
            ],
        )
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Expected derivative path for every size class
    pub fn targets_for(&self, filename: &str) -> Vec<(&SizeClass, PathBuf)> {
        self.classes
            .iter()
            .map(|class| (class, class.target_for(filename)))
            .collect()
    }

    /// Create any derivative directory that does not exist yet
    pub fn ensure_dirs(&self) -> Result<()> {
        for class in &self.classes {
            std::fs::create_dir_all(&class.dir)?;
        }
        Ok(())
    }
}
