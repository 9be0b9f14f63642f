//! The transform engine: one decoded image in, one resized image out.
//!
//! Pure pixel work, no I/O. The source is borrowed and never mutated, so a
//! single decode can feed any number of outputs.

use super::calculations::{center_crop_origin, fill_dimensions, fit_dimensions};
use super::params::{ResizeBox, ResizeMethod};
use image::DynamicImage;
use image::imageops::FilterType;

/// Lanczos3 for both up- and down-scaling.
const FILTER: FilterType = FilterType::Lanczos3;

/// Resize `source` into `target` using `method`.
///
/// - [`ResizeMethod::Fit`]: result fits inside the box, aspect preserved.
/// - [`ResizeMethod::Fill`]: result is exactly the box, excess center-cropped.
///
/// The source must have non-zero dimensions; decoders never produce otherwise.
pub fn resize(source: &DynamicImage, target: ResizeBox, method: ResizeMethod) -> DynamicImage {
    let src = (source.width(), source.height());
    let tgt = (target.width, target.height);

    match method {
        ResizeMethod::Fit => {
            let (w, h) = fit_dimensions(src, tgt);
            source.resize_exact(w, h, FILTER)
        }
        ResizeMethod::Fill => {
            let filled = fill_dimensions(src, tgt);
            let scaled = source.resize_exact(filled.0, filled.1, FILTER);
            let (x, y) = center_crop_origin(filled, tgt);
            scaled.crop_imm(x, y, tgt.0, tgt.1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::target_height;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn fit_downscale_matches_max_width() {
        let src = gradient(1000, 500);
        let h = target_height((1000, 500), 300);
        let out = resize(&src, ResizeBox::new(300, h), ResizeMethod::Fit);
        assert_eq!((out.width(), out.height()), (300, 150));
    }

    #[test]
    fn fit_preserves_aspect_within_rounding() {
        let src = gradient(640, 427);
        let h = target_height((640, 427), 200);
        let out = resize(&src, ResizeBox::new(200, h), ResizeMethod::Fit);
        assert!(out.width() <= 200 && out.height() <= h);
        let src_aspect = 640.0 / 427.0;
        let out_aspect = out.width() as f64 / out.height() as f64;
        assert!((src_aspect - out_aspect).abs() < 0.02);
    }

    #[test]
    fn fit_upscales_small_source() {
        let src = gradient(50, 25);
        let out = resize(&src, ResizeBox::new(200, 100), ResizeMethod::Fit);
        assert_eq!((out.width(), out.height()), (200, 100));
    }

    #[test]
    fn fill_produces_exact_box() {
        let src = gradient(800, 600);
        let out = resize(&src, ResizeBox::new(400, 500), ResizeMethod::Fill);
        assert_eq!((out.width(), out.height()), (400, 500));
    }

    #[test]
    fn fill_with_primary_height_for_narrower_thumbnail() {
        // Thumbnail box height is derived from the primary width, not its own
        let src = gradient(1000, 500);
        let h = target_height((1000, 500), 300);
        let out = resize(&src, ResizeBox::new(100, h), ResizeMethod::Fill);
        assert_eq!((out.width(), out.height()), (100, 150));
    }

    #[test]
    fn source_is_untouched() {
        let src = gradient(120, 80);
        let before = src.clone();
        let _ = resize(&src, ResizeBox::new(30, 20), ResizeMethod::Fill);
        let _ = resize(&src, ResizeBox::new(30, 20), ResizeMethod::Fit);
        assert_eq!(src, before);
    }

    #[test]
    fn resize_is_deterministic() {
        let src = gradient(321, 123);
        let a = resize(&src, ResizeBox::new(100, 38), ResizeMethod::Fit);
        let b = resize(&src, ResizeBox::new(100, 38), ResizeMethod::Fit);
        assert_eq!(a, b);
    }
}
