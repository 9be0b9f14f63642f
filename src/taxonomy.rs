//! Tag and category usage counters.
//!
//! Stored as pretty-printed JSON in the data folder:
//!
//! ```json
//! {
//!   "tags": [
//!     { "name": "rust", "count": 3 }
//!   ]
//! }
//! ```
//!
//! `categories.json` has the same shape under `"categories"`. Counters are
//! read, updated and rewritten whole; concurrent updates race and the last
//! write wins.

use crate::error::{AppError, AppResult};
use crate::storage::FileSystem;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taxonomy {
    Tags,
    Categories,
}

impl Taxonomy {
    /// JSON key and file stem.
    pub fn key(self) -> &'static str {
        match self {
            Taxonomy::Tags => "tags",
            Taxonomy::Categories => "categories",
        }
    }
}

/// Add one use of each name: existing entries increment, new ones are
/// appended with count 1 in input order.
pub fn record_usage(terms: &mut Vec<Term>, names: &[String]) {
    for name in names {
        match terms.iter_mut().find(|t| &t.name == name) {
            Some(term) => term.count += 1,
            None => terms.push(Term {
                name: name.clone(),
                count: 1,
            }),
        }
    }
}

/// On-disk document; only the key matching the file is present.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TermsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<Term>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<Term>>,
}

impl TermsFile {
    fn with(taxonomy: Taxonomy, terms: Vec<Term>) -> Self {
        match taxonomy {
            Taxonomy::Tags => Self {
                tags: Some(terms),
                ..Self::default()
            },
            Taxonomy::Categories => Self {
                categories: Some(terms),
                ..Self::default()
            },
        }
    }

    fn take(self, taxonomy: Taxonomy) -> Vec<Term> {
        match taxonomy {
            Taxonomy::Tags => self.tags,
            Taxonomy::Categories => self.categories,
        }
        .unwrap_or_default()
    }
}

pub struct TaxonomyStore {
    fs: Arc<dyn FileSystem>,
    data_dir: PathBuf,
}

impl TaxonomyStore {
    pub fn new(fs: Arc<dyn FileSystem>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self, taxonomy: Taxonomy) -> PathBuf {
        self.data_dir.join(format!("{}.json", taxonomy.key()))
    }

    /// All terms. A missing file yields an empty list.
    pub fn load(&self, taxonomy: Taxonomy) -> AppResult<Vec<Term>> {
        let path = self.path(taxonomy);
        let bytes = match self.fs.read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::fs("read", &path, e)),
        };

        let document: TermsFile =
            serde_json::from_slice(&bytes).map_err(|e| invalid_json(&path, e))?;
        Ok(document.take(taxonomy))
    }

    pub fn record(&self, taxonomy: Taxonomy, names: &[String]) -> AppResult<Vec<Term>> {
        let mut terms = self.load(taxonomy)?;
        record_usage(&mut terms, names);
        self.save(taxonomy, &terms)?;
        tracing::info!(
            taxonomy = taxonomy.key(),
            added = names.len(),
            total = terms.len(),
            "counters updated"
        );
        Ok(terms)
    }

    fn save(&self, taxonomy: Taxonomy, terms: &[Term]) -> AppResult<()> {
        let path = self.path(taxonomy);
        let document = TermsFile::with(taxonomy, terms.to_vec());
        let json = serde_json::to_vec_pretty(&document).map_err(|e| invalid_json(&path, e))?;

        self.fs
            .create_dir_all(&self.data_dir)
            .map_err(|e| AppError::fs("create directory", &self.data_dir, e))?;
        self.fs
            .write(&path, &json)
            .map_err(|e| AppError::fs("write", &path, e))
    }
}

fn invalid_json(path: &Path, err: serde_json::Error) -> AppError {
    AppError::fs("parse", path, io::Error::new(io::ErrorKind::InvalidData, err))
}
