//! # Post Desk
//!
//! The backend of a bilingual (German/English) Markdown blog editor. It serves
//! the editor frontend, reads and writes post files, keeps an uploaded-media
//! folder, turns media into display images and thumbnails for the site's
//! asset folder, and asks an external service to generate header images.
//!
//! # Architecture
//!
//! Everything is plain files on disk; there is no database. The HTTP layer is
//! a thin shell over services that take a [`storage::FileSystem`], so each
//! service is tested against an in-memory tree.
//!
//! ```text
//! HTTP (axum)  →  api::*  →  AppContext services  →  FileSystem / ImageBackend / HttpTransport
//! CLI  (clap)  ─────────────┘
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`server`] | Router, middleware stack, static frontend, graceful shutdown |
//! | [`api`] | Route handlers: content, media, create-post |
//! | [`context`] | [`context::AppContext`]: every service built once from the config |
//! | [`config`] | Layered `config.toml` loading, env overrides, validation |
//! | [`content`] | Post files per language folder; path confinement |
//! | [`library`] | Uploaded originals: list, timestamp-named upload, delete |
//! | [`media`] | Media processing pipeline: display image + `thumb_` thumbnail |
//! | [`imaging`] | Pure-Rust resize math, resize engine, codec backend |
//! | [`generation`] | ImagePig client over a swappable HTTP transport |
//! | [`posts`] | Create-post: front matter, thumbnail resolution, counters |
//! | [`taxonomy`] | Tag and category usage counters in `tags.json` |
//! | [`storage`] | File system seam: disk and in-memory implementations |
//! | [`error`] | [`error::AppError`] taxonomy and its JSON error response |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Validate, Then Touch the Disk
//!
//! Every operation checks its inputs (names, languages, dates, API key) before
//! the first read or write. A rejected request leaves no partial files.
//!
//! ## Primary First, Thumbnail Second
//!
//! Media processing renders both outputs in parallel on the rayon pool but
//! writes them sequentially. If the thumbnail write fails the display image
//! stays; reprocessing the same file rewrites both with identical bytes.
//!
//! ## Atomic Writes
//!
//! [`storage::OsFileSystem`] writes to a sibling temp file and renames it over
//! the target, so a reader never sees half a post or half an image.
//!
//! ## Errors Carry Their Category
//!
//! Bad input, file-system failures and upstream-API failures are separate
//! variants, and the HTTP status is derived from the variant alone.

pub mod api;
pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod generation;
pub mod imaging;
pub mod library;
pub mod logging;
pub mod media;
pub mod posts;
pub mod server;
pub mod storage;
pub mod taxonomy;
