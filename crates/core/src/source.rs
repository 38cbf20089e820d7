//! The page source contract shared by every container kind

use std::error::Error as StdError;
use std::path::PathBuf;

/// Errors raised while opening a container or fetching page bytes
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Nothing renderable after filtering to known text/image extensions
    #[error("no images or info files found in {}", .0.display())]
    EmptyContent(PathBuf),

    /// A zero-byte file presented as an archive
    #[error("{} is an empty archive", .0.display())]
    EmptyArchive(PathBuf),

    /// Missing, unreadable or structurally corrupt container
    #[error("could not read {}: {source}", .path.display())]
    CorruptOrUnreadable {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The requested page name is not in the container
    #[error("page not found: {0}")]
    NotFound(String),

    /// Extension does not match any known container or image type
    #[error("unsupported file type: {} (open a .cbz, .cbr, .cbt, directory or image file)", .0.display())]
    Unsupported(PathBuf),

    /// An external unpacker needed for this container is not installed
    #[error("{tool} is required for this archive; install it with: {hint}")]
    MissingTool { tool: &'static str, hint: &'static str },

    /// Reading an existing page failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Wrap any error as `CorruptOrUnreadable` for `path`
    pub fn corrupt<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        SourceError::CorruptOrUnreadable { path: path.into(), source: source.into() }
    }

    /// Errors that should be shown to the user when opening a document
    pub fn is_open_failure(&self) -> bool {
        !matches!(self, SourceError::NotFound(_) | SourceError::Io(_))
    }
}

/// Result type for page source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Which loader produced a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Zip-like archive read in place
    Zip,

    /// Tarball read in place
    Tar,

    /// Archive unpacked by an external tool into a scratch directory
    Extracted,

    /// Plain directory tree
    Directory,

    /// A single image file
    SingleImage,
}

/// Ordered pages of one open document plus a byte fetch.
///
/// Implementations are immutable after construction apart from `cleanup`,
/// and `get_bytes` may be called from several worker threads at once.
/// Sources that cannot read concurrently serialize internally.
pub trait PageSource: Send + Sync {
    /// Page names in display order; never empty
    fn pages(&self) -> &[String];

    /// Raw bytes of a page, `NotFound` if the name is not in the container
    fn get_bytes(&self, name: &str) -> SourceResult<Vec<u8>>;

    /// Release backing resources. Idempotent; the default does nothing.
    fn cleanup(&self) {}

    /// Loader that produced this source
    fn kind(&self) -> SourceKind;

    /// Number of pages
    fn len(&self) -> usize {
        self.pages().len()
    }

    /// Always false for a successfully constructed source
    fn is_empty(&self) -> bool {
        self.pages().is_empty()
    }

    /// Name of the page at `index`
    fn page_name(&self, index: usize) -> Option<&str> {
        self.pages().get(index).map(String::as_str)
    }
}
