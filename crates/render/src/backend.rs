//! Decode + scale implementations

use crate::error::{RenderError, RenderResult};
use crate::fit::{fit_dimensions, FitMode};
use crate::PageImage;
use fast_image_resize as fir;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::sync::Arc;

/// Decodes raw page bytes and scales them into a target box.
///
/// Implementations are called from every worker thread at once and must
/// behave as a pure function of their inputs.
pub trait ResizeBackend: Send + Sync {
    fn render(&self, raw: &[u8], width: u32, height: u32, fit: FitMode) -> RenderResult<PageImage>;
}

impl<B: ResizeBackend + ?Sized> ResizeBackend for Arc<B> {
    fn render(&self, raw: &[u8], width: u32, height: u32, fit: FitMode) -> RenderResult<PageImage> {
        (**self).render(raw, width, height, fit)
    }
}

/// Backend built on the `image` decoders.
///
/// Scaling goes through `fast_image_resize` (Lanczos3 convolution) and drops
/// back to `image::imageops::resize` if that fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageBackend;

impl ImageBackend {
    pub fn new() -> Self {
        Self
    }

    fn fast_resize(src: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, String> {
        let src_image = fir::images::Image::from_vec_u8(
            src.width(),
            src.height(),
            src.as_raw().to_vec(),
            fir::PixelType::U8x4,
        )
        .map_err(|e| e.to_string())?;
        let mut dst_image = fir::images::Image::new(width, height, fir::PixelType::U8x4);

        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
        let mut resizer = fir::Resizer::new();
        resizer.resize(&src_image, &mut dst_image, &options).map_err(|e| e.to_string())?;

        RgbaImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| "resized buffer has the wrong length".to_string())
    }
}

impl ResizeBackend for ImageBackend {
    fn render(&self, raw: &[u8], width: u32, height: u32, fit: FitMode) -> RenderResult<PageImage> {
        if raw.is_empty() {
            return Err(RenderError::EmptyInput);
        }

        let decoded = image::load_from_memory(raw)?.to_rgba8();
        let (out_w, out_h) = fit_dimensions(decoded.width(), decoded.height(), width, height, fit);
        if (out_w, out_h) == decoded.dimensions() {
            return Ok(Arc::new(decoded));
        }

        let scaled = match Self::fast_resize(&decoded, out_w, out_h) {
            Ok(scaled) => scaled,
            Err(e) => {
                log::warn!("Fast resize to {out_w}x{out_h} failed ({e}), using fallback");
                imageops::resize(&decoded, out_w, out_h, FilterType::Lanczos3)
            }
        };
        Ok(Arc::new(scaled))
    }
}

/// Cheap nearest-neighbour rescale of an already decoded page.
///
/// Only meant for a throwaway preview while the real render is in flight.
pub fn preview_nearest(image: &RgbaImage, width: u32, height: u32, fit: FitMode) -> PageImage {
    let (out_w, out_h) = fit_dimensions(image.width(), image.height(), width, height, fit);
    Arc::new(imageops::resize(image, out_w, out_h, FilterType::Nearest))
}
