//! One [`PageSource`](crate::PageSource) implementation per container kind

mod directory;
mod single;
mod tar;
mod unar;
mod zip;

pub use directory::DirectorySource;
pub use single::SingleImageSource;
pub use tar::TarSource;
pub use unar::{ExtractedSource, Unpacker};
pub use zip::ZipSource;

use crate::source::{SourceError, SourceResult};
use std::fs;
use std::path::Path;

/// Reject missing paths and zero-byte archives before handing them to a parser.
pub(crate) fn check_archive_file(path: &Path) -> SourceResult<()> {
    let metadata = fs::metadata(path).map_err(|e| SourceError::corrupt(path, e))?;
    if !metadata.is_file() {
        return Err(SourceError::corrupt(path, "not a regular file"));
    }
    if metadata.len() == 0 {
        return Err(SourceError::EmptyArchive(path.to_path_buf()));
    }
    Ok(())
}

/// Walk `root` recursively, returning `/`-separated paths relative to it.
pub(crate) fn collect_relative_files(root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Ok(relative) = path.strip_prefix(root) {
                    let parts: Vec<_> =
                        relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                    names.push(parts.join("/"));
                }
            }
        }
    }

    Ok(names)
}

/// Resolve a page name under `root`, refusing anything that escapes it.
pub(crate) fn resolve_under(root: &Path, name: &str) -> SourceResult<std::path::PathBuf> {
    let relative = Path::new(name);
    let escapes = relative.components().any(|c| {
        !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir)
    });
    if escapes {
        return Err(SourceError::NotFound(name.to_string()));
    }
    Ok(root.join(relative))
}

/// Map a read failure on a known page to `NotFound` when the file is gone.
pub(crate) fn read_page_file(path: &Path, name: &str) -> SourceResult<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SourceError::NotFound(name.to_string()))
        }
        Err(e) => Err(SourceError::Io(e)),
    }
}
