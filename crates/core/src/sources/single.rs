//! A lone image file opened as a one-page document

use super::read_page_file;
use crate::page::is_image_name;
use crate::source::{PageSource, SourceError, SourceKind, SourceResult};
use std::path::{Path, PathBuf};

/// One-page source wrapping a single image file.
pub struct SingleImageSource {
    path: PathBuf,
    pages: Vec<String>,
}

impl SingleImageSource {
    /// Wrap `path`; the page is named after the file.
    pub fn open<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !is_image_name(&name) {
            return Err(SourceError::Unsupported(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(SourceError::corrupt(path, "not an image file"));
        }

        Ok(Self { path: path.to_path_buf(), pages: vec![name] })
    }
}

impl PageSource for SingleImageSource {
    fn pages(&self) -> &[String] {
        &self.pages
    }

    fn get_bytes(&self, name: &str) -> SourceResult<Vec<u8>> {
        if name != self.pages[0] {
            return Err(SourceError::NotFound(name.to_string()));
        }
        read_page_file(&self.path, name)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::SingleImage
    }
}
