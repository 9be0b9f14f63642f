//! The media folder: uploaded originals waiting to be processed.

use crate::error::{AppError, AppResult};
use crate::media::{THUMB_PREFIX, dotted_extension, validate_file_name};
use crate::storage::FileSystem;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub struct MediaLibrary {
    fs: Arc<dyn FileSystem>,
    media_dir: PathBuf,
}

/// Name an upload is stored under: `<unix nanos><ext>`.
///
/// The extension is kept only when it is plain ASCII alphanumerics.
pub fn upload_file_name(original: &str, unix_nanos: i64) -> String {
    let ext = dotted_extension(original);
    if ext.chars().skip(1).all(|c| c.is_ascii_alphanumeric()) {
        format!("{unix_nanos}{ext}")
    } else {
        unix_nanos.to_string()
    }
}

impl MediaLibrary {
    pub fn new(fs: Arc<dyn FileSystem>, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            media_dir: media_dir.into(),
        }
    }

    /// File names directly in the media folder, sorted. A missing folder
    /// lists as empty.
    pub fn list(&self) -> AppResult<Vec<String>> {
        match self.fs.list_files(&self.media_dir) {
            Ok(files) => Ok(files),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::fs("list", &self.media_dir, e)),
        }
    }

    /// Store an upload under a timestamp name and return that name.
    pub fn upload(&self, original_name: &str, data: &[u8]) -> AppResult<String> {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.upload_as(&upload_file_name(original_name, nanos), data)
    }

    fn upload_as(&self, file_name: &str, data: &[u8]) -> AppResult<String> {
        let path = self.media_dir.join(file_name);
        self.fs
            .create_dir_all(&self.media_dir)
            .map_err(|e| AppError::fs("create directory", &self.media_dir, e))?;
        self.fs
            .write(&path, data)
            .map_err(|e| AppError::fs("write", &path, e))?;
        tracing::info!(path = %path.display(), bytes = data.len(), "media uploaded");
        Ok(file_name.to_string())
    }

    /// Remove a media file, then its `thumb_` companion if there is one.
    pub fn delete(&self, file: &str) -> AppResult<()> {
        if file.contains("..") {
            return Err(AppError::validation("file", "must not contain '..'"));
        }
        validate_file_name("file", file)?;

        let path = self.media_dir.join(file);
        if !self.fs.exists(&path) {
            return Err(AppError::fs(
                "stat",
                &path,
                io::Error::new(io::ErrorKind::NotFound, "file not found"),
            ));
        }
        self.fs
            .remove_file(&path)
            .map_err(|e| AppError::fs("delete", &path, e))?;
        tracing::info!(path = %path.display(), "media deleted");

        let thumb = self.media_dir.join(format!("{THUMB_PREFIX}{file}"));
        match self.fs.remove_file(&thumb) {
            Ok(()) => tracing::info!(path = %thumb.display(), "thumbnail deleted"),
            Err(e) => tracing::debug!(path = %thumb.display(), error = %e, "no thumbnail removed"),
        }
        Ok(())
    }
}
