use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the gallery events service
#[derive(Error, Debug)]
pub enum GalleryError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Filesystem errors
    #[error("Source directory not found: {}", path.display())]
    SourceDirNotFound { path: PathBuf },

    #[error("Failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Server errors
    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for gallery operations
pub type Result<T> = std::result::Result<T, GalleryError>;

/// Errors produced while rendering a single derivative
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("failed to encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    #[error("invalid target width {0}")]
    InvalidWidth(u32),

    #[error("render timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("render task failed: {0}")]
    Task(String),
}

impl RenderError {
    /// Short reason suitable for a status line shown to clients
    pub fn reason(&self) -> String {
        match self {
            RenderError::Open { source, .. } => source.to_string(),
            RenderError::Decode { reason, .. } | RenderError::Encode { reason, .. } => {
                reason.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Delivery failure on a single client channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,

    #[error("channel buffer is full")]
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_dir_error_includes_path() {
        let err = GalleryError::SourceDirNotFound {
            path: PathBuf::from("/srv/images/full"),
        };
        assert!(err.to_string().contains("/srv/images/full"));
    }

    #[test]
    fn test_render_error_reason_is_short() {
        let err = RenderError::Decode {
            path: PathBuf::from("/srv/images/full/photo.jpg"),
            reason: "unexpected EOF".to_string(),
        };
        assert_eq!(err.reason(), "unexpected EOF");
        assert!(err.to_string().contains("photo.jpg"));

        let err = RenderError::Timeout { secs: 5 };
        assert_eq!(err.reason(), "render timed out after 5s");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GalleryError = io.into();
        assert!(matches!(err, GalleryError::Io(_)));
    }
}
