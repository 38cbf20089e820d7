//! Page classification and display ordering

use crate::natural::natural_cmp;
use std::path::Path;

/// Raster formats the resize backend can decode.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Info pages shown as a text overlay.
pub const TEXT_EXTENSIONS: &[&str] = &["nfo", "txt"];

/// What a page name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// Info/text page (`.nfo`, `.txt`)
    Text,

    /// Raster image page
    Image,
}

impl PageKind {
    /// Classify a page name by extension; `None` for anything unsupported.
    pub fn of(name: &str) -> Option<Self> {
        if is_text_name(name) {
            Some(PageKind::Text)
        } else if is_image_name(name) {
            Some(PageKind::Image)
        } else {
            None
        }
    }
}

fn extension_in(name: &str, set: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            set.iter().any(|candidate| *candidate == ext)
        })
        .unwrap_or(false)
}

/// True when the name looks like a supported image.
pub fn is_image_name(name: &str) -> bool {
    extension_in(name, IMAGE_EXTENSIONS)
}

/// True when the name looks like an info text file.
pub fn is_text_name(name: &str) -> bool {
    extension_in(name, TEXT_EXTENSIONS)
}

/// Filter names down to pages and put them in display order.
///
/// Text pages come first, then images; each group is naturally sorted.
/// Names that are neither are dropped.
pub fn order_pages<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut text = Vec::new();
    let mut images = Vec::new();

    for name in names {
        let name = name.into();
        match PageKind::of(&name) {
            Some(PageKind::Text) => text.push(name),
            Some(PageKind::Image) => images.push(name),
            None => {}
        }
    }

    text.sort_by(|a, b| natural_cmp(a, b));
    images.sort_by(|a, b| natural_cmp(a, b));
    text.dedup();
    images.dedup();
    text.extend(images);
    text
}
