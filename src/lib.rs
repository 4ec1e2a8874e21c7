//! Gallery Events - live updates for a photo gallery
//!
//! Watches a directory of original images, renders thumbnail and medium
//! derivatives for new files, cleans them up for removed ones and streams
//! status lines plus refresh notices to connected browsers over WebSocket.
//!
//! ## Components
//!
//! - [`hub::EventHub`] owns the client registry and a 50-line log buffer
//! - [`services::DirectoryWatcher`] turns filesystem changes into events
//! - [`services::DerivativePipeline`] renders or deletes derivatives
//! - [`api::GatewayServer`] accepts browser connections

pub mod api;
pub mod config;
pub mod derivatives;
pub mod error;
pub mod hub;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{GalleryError, Result};
pub use hub::EventHub;
