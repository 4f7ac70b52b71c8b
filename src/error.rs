use std::time::Duration;

use thiserror::Error;

/// Why a background preload did not produce a usable image.
///
/// Preload failures are never fatal; they are logged and recorded so the
/// host can fall back to another image.
#[derive(Debug, Error)]
pub enum PreloadError {
    /// Local file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Remote fetch failed before a response arrived.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Remote host answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Bytes arrived but are not a decodable image.
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Decode worker panicked or was aborted.
    #[error("decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// `preload` was called outside a tokio runtime.
    #[error("no tokio runtime to run the preload on")]
    NoRuntime,

    /// Host shut down before the load finished.
    #[error("cancelled")]
    Cancelled,
}
