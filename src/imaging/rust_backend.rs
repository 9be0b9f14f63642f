//! Pure Rust codec backend on the `image` crate.
//!
//! ## Format mapping
//!
//! | Extension | Decode | Encode |
//! |---|---|---|
//! | `jpg`, `jpeg` | yes | `JpegEncoder` with configured [`Quality`], alpha dropped |
//! | `png` | yes | default PNG encoder |
//! | `gif` | yes | single frame, RGBA |
//! | `tif`, `tiff` | yes | default TIFF encoder |
//! | `webp` | yes | lossless WebP |
//!
//! Files whose extension is unknown are still decoded by sniffing the
//! content, but cannot be encoded.

use super::backend::{BackendError, ImageBackend};
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// Extensions with a decoder and encoder compiled in.
const SUPPORTED: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Returns the image file extensions this backend can read and write.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    SUPPORTED.iter().map(|(ext, _)| *ext)
}

fn format_for(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, fmt)| *fmt)
}

/// Codec backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the format mapping.
pub struct RustBackend {
    quality: Quality,
}

impl RustBackend {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, data: &[u8], path: &Path) -> Result<DynamicImage, BackendError> {
        let decoded = match format_for(path) {
            Some(format) => image::load_from_memory_with_format(data, format),
            None => image::load_from_memory(data),
        };
        decoded.map_err(|e| BackendError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<Vec<u8>, BackendError> {
        let format = format_for(path).ok_or_else(|| {
            BackendError::UnsupportedFormat(
                path.extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default(),
            )
        })?;

        let encode_err = |e: image::ImageError| BackendError::Encode {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut buf = Cursor::new(Vec::new());
        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buf, self.quality.value());
                rgb.write_with_encoder(encoder).map_err(encode_err)?;
            }
            ImageFormat::Gif => {
                DynamicImage::ImageRgba8(image.to_rgba8())
                    .write_to(&mut buf, format)
                    .map_err(encode_err)?;
            }
            ImageFormat::WebP => {
                // The pure-Rust WebP encoder accepts only 8-bit RGB(A)
                let converted = if image.color().has_alpha() {
                    DynamicImage::ImageRgba8(image.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(image.to_rgb8())
                };
                converted.write_to(&mut buf, format).map_err(encode_err)?;
            }
            _ => image.write_to(&mut buf, format).map_err(encode_err)?,
        }
        Ok(buf.into_inner())
    }
}
