//! Zip-like archives (`.cbz`, `.zip`) read in place

use super::check_archive_file;
use crate::page::order_pages;
use crate::source::{PageSource, SourceError, SourceKind, SourceResult};
use ::zip::result::ZipError;
use ::zip::ZipArchive;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Upper bound on the buffer reserved up front for one entry. The declared
/// size comes from the archive and may be forged.
const PREALLOC_LIMIT: u64 = 64 * 1024 * 1024;

/// Page source over an open zip archive.
///
/// The archive handle needs `&mut` access per read, so reads from several
/// workers are serialized behind a mutex. `cleanup` drops the handle.
pub struct ZipSource {
    path: PathBuf,
    pages: Vec<String>,
    archive: Mutex<Option<ZipArchive<File>>>,
}

impl ZipSource {
    /// Open `path` and index its pages (images may sit in sub-folders).
    pub fn open<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        let path = path.as_ref();
        check_archive_file(path)?;

        let file = File::open(path).map_err(|e| SourceError::corrupt(path, e))?;
        let archive = ZipArchive::new(file).map_err(|e| SourceError::corrupt(path, e))?;

        let pages = order_pages(archive.file_names().filter(|name| !name.ends_with('/')));
        if pages.is_empty() {
            return Err(SourceError::EmptyContent(path.to_path_buf()));
        }

        log::info!("Opened zip {} with {} pages", path.display(), pages.len());
        Ok(Self { path: path.to_path_buf(), pages, archive: Mutex::new(Some(archive)) })
    }

    /// Archive this source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSource for ZipSource {
    fn pages(&self) -> &[String] {
        &self.pages
    }

    fn get_bytes(&self, name: &str) -> SourceResult<Vec<u8>> {
        let mut guard = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        let archive = guard
            .as_mut()
            .ok_or_else(|| SourceError::Io(io::Error::new(io::ErrorKind::Other, "archive closed")))?;

        let mut entry = archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => SourceError::NotFound(name.to_string()),
            ZipError::Io(io) => SourceError::Io(io),
            other => SourceError::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
        })?;

        let hint = entry.size().min(PREALLOC_LIMIT);
        let mut bytes = Vec::with_capacity(usize::try_from(hint).unwrap_or(0));
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn cleanup(&self) {
        let mut guard = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            log::debug!("Closed zip {}", self.path.display());
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Zip
    }
}
