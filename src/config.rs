use crate::error::{GalleryError, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket gateway configuration
    pub gateway: GatewayConfig,
    /// Image directory layout and derivative sizes
    pub images: ImagesConfig,
    /// Derivative pipeline tuning
    pub pipeline: PipelineConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port for the WebSocket gateway (default: 3030)
    pub port: u16,
    /// Seconds between keep-alive pings (default: 30)
    pub keepalive_secs: u64,
}

impl GatewayConfig {
    /// Time between keep-alive pings
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

#[derive(Debug, Clone)]
pub struct ImagesConfig {
    /// Root directory holding the source and derivative folders
    pub root: PathBuf,
    /// Folder with original images, relative to root
    pub source_subdir: String,
    /// Folder with thumbnails, relative to root
    pub thumb_subdir: String,
    /// Folder with medium renditions, relative to root
    pub medium_subdir: String,
    /// Target width of thumbnails in pixels
    pub thumb_width: u32,
    /// Target width of medium renditions in pixels
    pub medium_width: u32,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on renders running at the same time
    pub max_concurrent_renders: usize,
    /// Seconds before a single render is abandoned
    pub render_timeout_secs: u64,
    /// Delay before handling an added file, in milliseconds
    pub settle_delay_ms: u64,
    /// Emit add events for images already present at startup
    pub initial_scan: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_renders: 4,
            render_timeout_secs: 120,
            settle_delay_ms: 250,
            initial_scan: true,
        }
    }
}

impl PipelineConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Config {
            gateway: GatewayConfig {
                host: get_env_or("GALLERY_WS_HOST", "0.0.0.0"),
                port: parse_env("GALLERY_WS_PORT", "3030", "a valid port number")?,
                keepalive_secs: parse_env("GALLERY_KEEPALIVE_SECS", "30", "a number of seconds")?,
            },
            images: ImagesConfig {
                root: PathBuf::from(get_env_or("GALLERY_IMAGES_DIR", "public/images")),
                source_subdir: get_env_or("GALLERY_SOURCE_SUBDIR", "full"),
                thumb_subdir: get_env_or("GALLERY_THUMB_SUBDIR", "thumbs"),
                medium_subdir: get_env_or("GALLERY_MEDIUM_SUBDIR", "medium"),
                thumb_width: parse_env("GALLERY_THUMB_WIDTH", "400", "a pixel width")?,
                medium_width: parse_env("GALLERY_MEDIUM_WIDTH", "1200", "a pixel width")?,
            },
            pipeline: PipelineConfig {
                max_concurrent_renders: parse_env(
                    "GALLERY_MAX_CONCURRENT_RENDERS",
                    "4",
                    "a positive number",
                )?,
                render_timeout_secs: parse_env(
                    "GALLERY_RENDER_TIMEOUT_SECS",
                    "120",
                    "a number of seconds",
                )?,
                settle_delay_ms: parse_env(
                    "GALLERY_SETTLE_DELAY_MS",
                    "250",
                    "a number of milliseconds",
                )?,
                initial_scan: parse_env("GALLERY_INITIAL_SCAN", "true", "true or false")?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.images.thumb_width == 0 || self.images.medium_width == 0 {
            return Err(GalleryError::InvalidConfig(
                "derivative widths must be greater than zero".into(),
            ));
        }
        if self.pipeline.max_concurrent_renders == 0 {
            return Err(GalleryError::InvalidConfig(
                "GALLERY_MAX_CONCURRENT_RENDERS must be at least 1".into(),
            ));
        }
        if self.gateway.keepalive_secs == 0 {
            return Err(GalleryError::InvalidConfig(
                "GALLERY_KEEPALIVE_SECS must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the gateway listen address
    pub fn gateway_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }

    /// Directory holding the original images
    pub fn source_dir(&self) -> PathBuf {
        self.images.root.join(&self.images.source_subdir)
    }

    /// Directory holding thumbnails
    pub fn thumb_dir(&self) -> PathBuf {
        self.images.root.join(&self.images.thumb_subdir)
    }

    /// Directory holding medium renditions
    pub fn medium_dir(&self) -> PathBuf {
        self.images.root.join(&self.images.medium_subdir)
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: &str, expected: &str) -> Result<T> {
    get_env_or(key, default)
        .trim()
        .parse()
        .map_err(|_| GalleryError::InvalidConfig(format!("{} must be {}", key, expected)))
}
