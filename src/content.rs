//! Markdown post files.
//!
//! Posts live in one folder per language. API callers address a post as
//! `<lang>/<path>` (`de/2024/hello.md`), which [`ContentStore::resolve`]
//! maps onto the configured folder. Listings return paths relative to the
//! language folder.

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::storage::FileSystem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::De, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "de" => Ok(Language::De),
            "en" => Ok(Language::En),
            other => Err(AppError::validation(
                "language",
                format!("'{other}' is not one of de, en"),
            )),
        }
    }
}

/// Listing of both language folders, as returned without a `lang` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostListing {
    pub de: Vec<String>,
    pub en: Vec<String>,
}

pub struct ContentStore {
    fs: Arc<dyn FileSystem>,
    german_folder: PathBuf,
    english_folder: PathBuf,
}

impl ContentStore {
    pub fn new(fs: Arc<dyn FileSystem>, server: &ServerConfig) -> Self {
        Self {
            fs,
            german_folder: server.german_folder.clone(),
            english_folder: server.english_folder.clone(),
        }
    }

    pub fn folder(&self, language: Language) -> &Path {
        match language {
            Language::De => &self.german_folder,
            Language::En => &self.english_folder,
        }
    }

    /// Map `de/...` or `en/...` onto the language folder.
    ///
    /// Rejects anything else, including absolute paths and `..`.
    pub fn resolve(&self, file: &str) -> AppResult<PathBuf> {
        if file.contains("..") {
            return Err(AppError::validation("file", "must not contain '..'"));
        }
        let (lang, rest) = file
            .split_once('/')
            .ok_or_else(|| AppError::validation("file", "must start with de/ or en/"))?;
        let language: Language = lang
            .parse()
            .map_err(|_| AppError::validation("file", "must start with de/ or en/"))?;

        let relative = Path::new(rest);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if rest.is_empty() || !plain {
            return Err(AppError::validation("file", "must name a file below the language folder"));
        }
        Ok(self.folder(language).join(relative))
    }

    /// Markdown files of one language, relative and sorted. A missing
    /// folder lists as empty.
    pub fn list(&self, language: Language) -> AppResult<Vec<String>> {
        let folder = self.folder(language);
        match self.fs.walk_files(folder, "md") {
            Ok(files) => Ok(files),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(folder = %folder.display(), "language folder missing");
                Ok(Vec::new())
            }
            Err(e) => Err(AppError::fs("list", folder, e)),
        }
    }

    pub fn list_all(&self) -> AppResult<PostListing> {
        Ok(PostListing {
            de: self.list(Language::De)?,
            en: self.list(Language::En)?,
        })
    }

    pub fn load(&self, file: &str) -> AppResult<String> {
        let path = self.resolve(file)?;
        let bytes = self
            .fs
            .read(&path)
            .map_err(|e| AppError::fs("read", &path, e))?;
        let content = String::from_utf8(bytes).map_err(|e| {
            AppError::fs("read", &path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        tracing::info!(path = %path.display(), bytes = content.len(), "post loaded");
        Ok(content)
    }

    /// Write `content` to the post, creating parent folders.
    pub fn save(&self, file: &str, content: &[u8]) -> AppResult<PathBuf> {
        let path = self.resolve(file)?;
        self.write(&path, content)?;
        tracing::info!(path = %path.display(), bytes = content.len(), "post saved");
        Ok(path)
    }

    pub fn delete(&self, file: &str) -> AppResult<()> {
        let path = self.resolve(file)?;
        self.fs
            .remove_file(&path)
            .map_err(|e| AppError::fs("delete", &path, e))?;
        tracing::info!(path = %path.display(), "post deleted");
        Ok(())
    }

    /// Write a new post named `file_name` into the language folder.
    pub fn create(&self, language: Language, file_name: &str, content: &str) -> AppResult<PathBuf> {
        let path = self.folder(language).join(file_name);
        self.write(&path, content.as_bytes())?;
        tracing::info!(path = %path.display(), bytes = content.len(), "post created");
        Ok(path)
    }

    fn write(&self, path: &Path, content: &[u8]) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| AppError::fs("create directory", parent, e))?;
        }
        self.fs
            .write(path, content)
            .map_err(|e| AppError::fs("write", path, e))
    }
}
