//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two codec operations the media
//! service needs: decode bytes into an [`DynamicImage`], and encode an image
//! back into bytes for a given output path. The output format is always
//! chosen from the path's extension.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Decoding and encoding work on byte buffers so the service can be
//! paired with any [`FileSystem`](crate::storage::FileSystem).

use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: String, message: String },
}

/// Trait for image codec backends.
///
/// `path` is used as a format hint and for error messages; backends never
/// touch the file system themselves.
pub trait ImageBackend: Send + Sync {
    /// Decode an encoded image.
    fn decode(&self, data: &[u8], path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `image` in the format implied by `path`'s extension.
    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations and returns canned results.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon::join.
    #[derive(Default)]
    pub struct MockBackend {
        pub decoded: Mutex<Option<DynamicImage>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Encode {
            path: String,
            width: u32,
            height: u32,
        },
    }

    impl MockBackend {
        pub fn with_image(image: DynamicImage) -> Self {
            Self {
                decoded: Mutex::new(Some(image)),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, _data: &[u8], path: &Path) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_string_lossy().to_string()));

            self.decoded
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| BackendError::Decode {
                    path: path.display().to_string(),
                    message: "No mock image".to_string(),
                })
        }

        fn encode(&self, image: &DynamicImage, path: &Path) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                path: path.to_string_lossy().to_string(),
                width: image.width(),
                height: image.height(),
            });
            Ok(format!("{}x{}", image.width(), image.height()).into_bytes())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_image(DynamicImage::new_rgb8(8, 4));
        let img = backend.decode(b"", Path::new("/media/a.jpg")).unwrap();
        assert_eq!((img.width(), img.height()), (8, 4));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode(p) if p == "/media/a.jpg"));
    }

    #[test]
    fn mock_without_image_fails_decode() {
        let backend = MockBackend::default();
        assert!(matches!(
            backend.decode(b"", Path::new("x.png")),
            Err(BackendError::Decode { .. })
        ));
    }

    #[test]
    fn mock_records_encode_dimensions() {
        let backend = MockBackend::default();
        let bytes = backend
            .encode(&DynamicImage::new_rgb8(30, 20), Path::new("/assets/b.png"))
            .unwrap();
        assert_eq!(bytes, b"30x20");
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Encode {
                width: 30,
                height: 20,
                ..
            }
        ));
    }
}
