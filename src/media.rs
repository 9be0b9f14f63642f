//! Media processing service.
//!
//! Turns an uploaded file in the media folder into the display image and its
//! `thumb_` companion in the asset folder:
//!
//! ```text
//! media/photo.jpg ──decode once──┬── resize(image_resize)     ──> assets/summer.jpg
//!                                └── resize(thumbnail_resize) ──> assets/thumb_summer.jpg
//! ```
//!
//! Both outputs use the box `(max_width, floor(max_width * h / w))` computed
//! from the **image** spec and the source dimensions; the thumbnail only
//! differs in its own width and method. The two resizes and encodes run in
//! parallel on the rayon pool, the writes happen in order (display image
//! first). A failed thumbnail write leaves the display image in place.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::imaging::{ImageBackend, ResizeBox, ResizeSpec, resize, target_height};
use crate::storage::FileSystem;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of the thumbnail written next to every processed image.
pub const THUMB_PREFIX: &str = "thumb_";

/// Which file to process and what to call the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProcessRequest {
    /// File name inside the media folder.
    pub file: String,
    /// Base name of the outputs; the source extension is appended.
    #[serde(rename = "newName")]
    pub new_name: String,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub media_dir: PathBuf,
    pub asset_dir: PathBuf,
    pub image: ResizeSpec,
    pub thumbnail: ResizeSpec,
}

impl MediaConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            media_dir: config.server.media_folder.clone(),
            asset_dir: config.server.asset_folder.clone(),
            image: config.image_resize,
            thumbnail: config.thumbnail_resize,
        }
    }
}

pub struct MediaProcessor {
    fs: Arc<dyn FileSystem>,
    backend: Arc<dyn ImageBackend>,
    config: MediaConfig,
}

/// `photo.jpg` -> `.jpg`, `README` -> empty.
pub fn dotted_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// A bare file name: non-empty, no separators, not `.` or `..`.
pub(crate) fn validate_file_name(field: &str, name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation(field, "must not be empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(AppError::validation(field, "must be a plain file name"));
    }
    Ok(())
}

impl MediaProcessor {
    pub fn new(fs: Arc<dyn FileSystem>, backend: Arc<dyn ImageBackend>, config: MediaConfig) -> Self {
        Self { fs, backend, config }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Process `request.file` and return the new file name
    /// (`new_name` + source extension).
    pub fn process_media_file(&self, request: &MediaProcessRequest) -> AppResult<String> {
        validate_file_name("file", &request.file)?;
        validate_file_name("newName", &request.new_name)?;

        let source_path = self.config.media_dir.join(&request.file);
        let new_file_name = format!("{}{}", request.new_name, dotted_extension(&request.file));
        let image_path = self.config.asset_dir.join(&new_file_name);
        let thumb_path = self
            .config
            .asset_dir
            .join(format!("{THUMB_PREFIX}{new_file_name}"));

        let data = self
            .fs
            .read(&source_path)
            .map_err(|e| AppError::fs("read", &source_path, e))?;
        let source = self
            .backend
            .decode(&data, &source_path)
            .map_err(|e| AppError::invalid_image("decode", &source_path, e))?;
        drop(data);

        let (width, height) = (source.width(), source.height());
        if width == 0 || height == 0 {
            return Err(AppError::invalid_image(
                "decode",
                &source_path,
                "image has no pixels",
            ));
        }
        let box_height = target_height((width, height), self.config.image.max_width);

        tracing::info!(
            source = %source_path.display(),
            width,
            height,
            box_height,
            "processing media file"
        );

        let (image_bytes, thumb_bytes) = rayon::join(
            || self.render(&source, self.config.image, box_height, &image_path),
            || self.render(&source, self.config.thumbnail, box_height, &thumb_path),
        );
        let (image_bytes, thumb_bytes) = (image_bytes?, thumb_bytes?);

        self.fs
            .create_dir_all(&self.config.asset_dir)
            .map_err(|e| AppError::fs("create directory", &self.config.asset_dir, e))?;
        self.fs
            .write(&image_path, &image_bytes)
            .map_err(|e| AppError::fs("write", &image_path, e))?;
        self.fs
            .write(&thumb_path, &thumb_bytes)
            .map_err(|e| AppError::fs("write", &thumb_path, e))?;

        tracing::info!(
            image = %image_path.display(),
            thumbnail = %thumb_path.display(),
            "media file processed"
        );
        Ok(new_file_name)
    }

    fn render(
        &self,
        source: &DynamicImage,
        spec: ResizeSpec,
        box_height: u32,
        output: &Path,
    ) -> AppResult<Vec<u8>> {
        let target = ResizeBox::new(spec.max_width, box_height);
        let resized = resize(source, target, spec.method);
        tracing::debug!(
            output = %output.display(),
            method = %spec.method,
            width = resized.width(),
            height = resized.height(),
            "resized"
        );
        self.backend
            .encode(&resized, output)
            .map_err(|e| AppError::invalid_image("encode", output, e))
    }
}
