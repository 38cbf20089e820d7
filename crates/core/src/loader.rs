//! Container detection and dispatch to the matching page source

use crate::page::is_image_name;
use crate::perf::PerfTimer;
use crate::source::{PageSource, SourceError, SourceResult};
use crate::sources::{DirectorySource, SingleImageSource, TarSource, Unpacker, ZipSource};
use std::path::Path;

/// Container kinds recognised by [`open_comic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Directory,
    /// `.cbz` / `.zip`
    Zip,
    /// `.cbt` / `.tar`
    Tar,
    /// `.cbr` / `.rar` / `.ace` / `.cba`, unpacked with `unar`
    External,
    /// A single image file
    Image,
}

impl ContainerKind {
    /// Classify `path` by file type and extension. `None` means unsupported.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.is_dir() {
            return Some(Self::Directory);
        }

        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "cbz" | "zip" => Some(Self::Zip),
            "cbt" | "tar" => Some(Self::Tar),
            "cbr" | "rar" | "ace" | "cba" => Some(Self::External),
            _ => {
                let name = path.file_name()?.to_string_lossy();
                is_image_name(&name).then_some(Self::Image)
            }
        }
    }
}

/// Open any supported container with the default unpacker.
pub fn open_comic<P: AsRef<Path>>(path: P) -> SourceResult<Box<dyn PageSource>> {
    open_comic_with(path, &Unpacker::default())
}

/// Open any supported container, using `unpacker` for RAR-like archives.
pub fn open_comic_with<P: AsRef<Path>>(
    path: P,
    unpacker: &Unpacker,
) -> SourceResult<Box<dyn PageSource>> {
    let path = path.as_ref();
    let _timer = PerfTimer::new("open_comic").with_extra(path.display().to_string());

    if !path.exists() {
        return Err(SourceError::corrupt(path, "no such file or directory"));
    }

    let kind = ContainerKind::detect(path).ok_or_else(|| SourceError::Unsupported(path.to_path_buf()))?;
    log::debug!("Opening {} as {:?}", path.display(), kind);

    let source: Box<dyn PageSource> = match kind {
        ContainerKind::Directory => Box::new(DirectorySource::open(path)?),
        ContainerKind::Zip => Box::new(ZipSource::open(path)?),
        ContainerKind::Tar => Box::new(TarSource::open(path)?),
        ContainerKind::External => Box::new(unpacker.extract(path)?),
        ContainerKind::Image => Box::new(SingleImageSource::open(path)?),
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;
    use crate::sources::fixtures;
    use std::fs;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(ContainerKind::detect(Path::new("a.CBZ")), Some(ContainerKind::Zip));
        assert_eq!(ContainerKind::detect(Path::new("a.zip")), Some(ContainerKind::Zip));
        assert_eq!(ContainerKind::detect(Path::new("a.cbt")), Some(ContainerKind::Tar));
        assert_eq!(ContainerKind::detect(Path::new("a.cbr")), Some(ContainerKind::External));
        assert_eq!(ContainerKind::detect(Path::new("a.ace")), Some(ContainerKind::External));
        assert_eq!(ContainerKind::detect(Path::new("a.webp")), Some(ContainerKind::Image));
        assert_eq!(ContainerKind::detect(Path::new("a.pdf")), None);
        assert_eq!(ContainerKind::detect(Path::new("noext")), None);
    }

    #[test]
    fn test_open_zip_in_natural_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::write_zip(
            dir.path(),
            "issue.cbz",
            &[
                ("p10.png", vec![10]),
                ("p2.png", vec![2]),
                ("info.txt", b"hello".to_vec()),
                ("p1.png", vec![1]),
            ],
        );

        let source = open_comic(&path).unwrap();
        assert_eq!(source.pages(), &["info.txt", "p1.png", "p2.png", "p10.png"]);
        assert_eq!(source.kind(), SourceKind::Zip);
        assert_eq!(source.get_bytes("info.txt").unwrap(), b"hello");
    }

    #[test]
    fn test_open_each_kind() {
        let dir = tempfile::tempdir().unwrap();
        let entries = fixtures::sample_entries();

        let tar = fixtures::write_tar(dir.path(), "issue.cbt", &entries);
        assert_eq!(open_comic(&tar).unwrap().kind(), SourceKind::Tar);

        let tree = dir.path().join("tree");
        fixtures::write_tree(&tree, &entries);
        assert_eq!(open_comic(&tree).unwrap().kind(), SourceKind::Directory);

        let image = dir.path().join("cover.jpg");
        fs::write(&image, b"jpeg").unwrap();
        let single = open_comic(&image).unwrap();
        assert_eq!(single.kind(), SourceKind::SingleImage);
        assert_eq!(single.pages(), &["cover.jpg"]);
    }

    #[test]
    fn test_open_failures() {
        let dir = tempfile::tempdir().unwrap();

        let pdf = dir.path().join("book.pdf");
        fs::write(&pdf, b"%PDF").unwrap();
        assert!(matches!(open_comic(&pdf), Err(SourceError::Unsupported(_))));

        let empty = dir.path().join("empty.cbz");
        fs::write(&empty, b"").unwrap();
        assert!(matches!(open_comic(&empty), Err(SourceError::EmptyArchive(_))));

        let empty_rar = dir.path().join("empty.cbr");
        fs::write(&empty_rar, b"").unwrap();
        assert!(matches!(open_comic(&empty_rar), Err(SourceError::EmptyArchive(_))));

        assert!(matches!(
            open_comic(dir.path().join("gone.cbz")),
            Err(SourceError::CorruptOrUnreadable { .. })
        ));
    }

    #[test]
    fn test_open_with_custom_unpacker() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("issue.cbr");
        fs::write(&archive, b"Rar!").unwrap();

        let unpacker = Unpacker::new("comicflip-no-such-unpacker");
        assert!(matches!(
            open_comic_with(&archive, &unpacker),
            Err(SourceError::MissingTool { .. })
        ));
    }
}
