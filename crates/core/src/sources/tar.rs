//! Tarballs (`.cbt`, `.tar`) read in place

use super::check_archive_file;
use crate::page::order_pages;
use crate::source::{PageSource, SourceError, SourceKind, SourceResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Location of one member's data inside the tarball
#[derive(Debug, Clone, Copy)]
struct Member {
    offset: u64,
    size: u64,
}

/// Page source over an uncompressed tarball.
///
/// Members are indexed once at open; reads seek straight to the member data
/// through a shared handle guarded by a mutex.
pub struct TarSource {
    path: PathBuf,
    pages: Vec<String>,
    members: HashMap<String, Member>,
    file: Mutex<Option<File>>,
}

impl TarSource {
    /// Open `path` and index its regular-file members.
    pub fn open<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        let path = path.as_ref();
        check_archive_file(path)?;

        let members = index_members(path).map_err(|e| SourceError::corrupt(path, e))?;
        let pages = order_pages(members.keys().cloned());
        if pages.is_empty() {
            return Err(SourceError::EmptyContent(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| SourceError::corrupt(path, e))?;
        log::info!("Opened tar {} with {} pages", path.display(), pages.len());
        Ok(Self { path: path.to_path_buf(), pages, members, file: Mutex::new(Some(file)) })
    }
}

fn index_members(path: &Path) -> io::Result<HashMap<String, Member>> {
    let mut archive = ::tar::Archive::new(File::open(path)?);
    let mut members = HashMap::new();

    for entry in archive.entries()? {
        let entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().replace('\\', "/");
        members.insert(name, Member { offset: entry.raw_file_position(), size: entry.size() });
    }

    Ok(members)
}

impl PageSource for TarSource {
    fn pages(&self) -> &[String] {
        &self.pages
    }

    fn get_bytes(&self, name: &str) -> SourceResult<Vec<u8>> {
        let member =
            *self.members.get(name).ok_or_else(|| SourceError::NotFound(name.to_string()))?;

        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let file = guard
            .as_mut()
            .ok_or_else(|| SourceError::Io(io::Error::new(io::ErrorKind::Other, "archive closed")))?;

        file.seek(SeekFrom::Start(member.offset))?;
        let mut bytes = vec![0u8; member.size as usize];
        file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn cleanup(&self) {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            log::debug!("Closed tar {}", self.path.display());
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Tar
    }
}
