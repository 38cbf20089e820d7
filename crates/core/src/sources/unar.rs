//! RAR-like archives unpacked by an external `unar` into a scratch directory

use super::{check_archive_file, collect_relative_files, read_page_file, resolve_under};
use crate::page::order_pages;
use crate::perf::PerfTimer;
use crate::source::{PageSource, SourceError, SourceKind, SourceResult};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

/// Name used for scratch directories, so stray ones are easy to spot
pub const SCRATCH_PREFIX: &str = "comicflip_";

const TOOL: &str = "unar";

#[cfg(target_os = "macos")]
const INSTALL_HINT: &str = "brew install unar";
#[cfg(target_os = "windows")]
const INSTALL_HINT: &str = "scoop install unar";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const INSTALL_HINT: &str = "sudo apt install unar";

/// Runs the external unpacker.
///
/// The command line is `<program> [args..] -q -o <scratch dir> <archive>`.
#[derive(Debug, Clone)]
pub struct Unpacker {
    program: OsString,
    args: Vec<OsString>,
    scratch_root: Option<PathBuf>,
}

impl Default for Unpacker {
    fn default() -> Self {
        Self::new(TOOL)
    }
}

impl Unpacker {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self { program: program.into(), args: Vec::new(), scratch_root: None }
    }

    /// Arguments placed before the `-q -o` pair
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Create scratch directories under `root` instead of the system temp dir
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Unpack `archive` and index the extracted pages.
    ///
    /// The scratch directory is removed again on every failure path.
    pub fn extract(&self, archive: &Path) -> SourceResult<ExtractedSource> {
        check_archive_file(archive)?;
        let _timer = PerfTimer::new("unar_extract").with_extra(archive.display().to_string());

        let scratch = self.scratch_dir().map_err(SourceError::Io)?;
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("-q")
            .arg("-o")
            .arg(scratch.path())
            .arg(archive)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    SourceError::MissingTool { tool: TOOL, hint: INSTALL_HINT }
                }
                _ => SourceError::corrupt(archive, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::warn!("{TOOL} failed on {}: {stderr}", archive.display());
            let message = if stderr.is_empty() {
                format!("{TOOL} exited with {}", output.status)
            } else {
                stderr
            };
            return Err(SourceError::corrupt(archive, message));
        }

        ExtractedSource::from_dir(archive, scratch)
    }

    fn scratch_dir(&self) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

/// Pages unpacked into a scratch directory owned by this source.
///
/// `cleanup` deletes the directory. Later reads fail.
pub struct ExtractedSource {
    archive: PathBuf,
    root: PathBuf,
    pages: Vec<String>,
    scratch: Mutex<Option<TempDir>>,
}

impl ExtractedSource {
    /// Take ownership of an already populated scratch directory
    pub fn from_dir(archive: &Path, scratch: TempDir) -> SourceResult<Self> {
        let root = scratch.path().to_path_buf();
        let names = collect_relative_files(&root).map_err(|e| SourceError::corrupt(archive, e))?;
        let pages = order_pages(names);
        if pages.is_empty() {
            return Err(SourceError::EmptyContent(archive.to_path_buf()));
        }

        log::info!(
            "Extracted {} pages from {} into {}",
            pages.len(),
            archive.display(),
            root.display()
        );
        Ok(Self { archive: archive.to_path_buf(), root, pages, scratch: Mutex::new(Some(scratch)) })
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Scratch directory holding the pages
    pub fn scratch_path(&self) -> &Path {
        &self.root
    }
}

impl PageSource for ExtractedSource {
    fn pages(&self) -> &[String] {
        &self.pages
    }

    fn get_bytes(&self, name: &str) -> SourceResult<Vec<u8>> {
        // Only the removal check needs the lock; file reads run in parallel
        let removed = self.scratch.lock().unwrap_or_else(PoisonError::into_inner).is_none();
        if removed {
            return Err(SourceError::Io(io::Error::other("extracted pages were removed")));
        }
        let path = resolve_under(&self.root, name)?;
        read_page_file(&path, name)
    }

    fn cleanup(&self) {
        let scratch = self.scratch.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(dir) = scratch {
            log::debug!("Removing scratch directory {}", self.root.display());
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove {}: {e}", self.root.display());
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Extracted
    }
}

impl Drop for ExtractedSource {
    fn drop(&mut self) {
        self.cleanup();
    }
}
