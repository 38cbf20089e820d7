//! Viewer error types

use comicflip_core::SourceError;

/// Errors surfaced to whoever drives the viewer
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The document could not be opened; any previous one stays open
    #[error(transparent)]
    Open(#[from] SourceError),

    /// Worker threads could not be started
    #[error("failed to start render workers: {0}")]
    Workers(#[from] std::io::Error),
}

/// Result type for viewer operations
pub type ViewerResult<T> = Result<T, ViewerError>;
