//! Plain directory trees

use super::{collect_relative_files, read_page_file, resolve_under};
use crate::page::order_pages;
use crate::source::{PageSource, SourceError, SourceKind, SourceResult};
use std::path::{Path, PathBuf};

/// Page source over a directory of images and info files.
///
/// Pages are paths relative to the root. There is nothing to release, so
/// `cleanup` is a no-op.
pub struct DirectorySource {
    root: PathBuf,
    pages: Vec<String>,
}

impl DirectorySource {
    /// Walk `root` recursively and collect its pages.
    pub fn open<P: AsRef<Path>>(root: P) -> SourceResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(SourceError::corrupt(root, "not a directory"));
        }

        let names = collect_relative_files(root).map_err(|e| SourceError::corrupt(root, e))?;
        let pages = order_pages(names);
        if pages.is_empty() {
            return Err(SourceError::EmptyContent(root.to_path_buf()));
        }

        log::info!("Opened directory {} with {} pages", root.display(), pages.len());
        Ok(Self { root: root.to_path_buf(), pages })
    }

    /// Directory the pages live under
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PageSource for DirectorySource {
    fn pages(&self) -> &[String] {
        &self.pages
    }

    fn get_bytes(&self, name: &str) -> SourceResult<Vec<u8>> {
        let path = resolve_under(&self.root, name)?;
        read_page_file(&path, name)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Directory
    }
}
