//! Background services

pub mod pipeline;
pub mod watcher;

pub use pipeline::DerivativePipeline;
pub use watcher::{scan_existing, DirectoryWatcher};
