//! Render error types

/// Errors that can occur while decoding or scaling a page
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No bytes to decode
    #[error("page data is empty")]
    EmptyInput,

    /// The bytes are not a supported raster image
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Both resize paths failed
    #[error("failed to resize image: {0}")]
    Resize(String),
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
