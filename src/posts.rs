//! Creating a new post.
//!
//! ```text
//! NewPostRequest
//!   -> validate (title, date, language)
//!   -> slug (given, or derived from the title)
//!   -> thumbnail: existing URL | local media file -> media processing
//!                 | nothing -> reuse <slug>.jpg or generate it
//!   -> front matter -> <title-stem>.md in the language folder
//!   -> tag / category counters
//! ```
//!
//! Steps run in order and stop at the first error; files written by earlier
//! steps (a generated thumbnail, say) stay on disk.

use crate::content::{ContentStore, Language};
use crate::error::{AppError, AppResult};
use crate::generation::ImageGenerator;
use crate::media::{MediaProcessRequest, MediaProcessor, validate_file_name};
use crate::storage::FileSystem;
use crate::taxonomy::{Taxonomy, TaxonomyStore};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

/// Date format the editor sends (`<input type="datetime-local">`).
const DATE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thumbnail {
    pub url: String,
    pub local_file: String,
    pub author: String,
    pub author_url: String,
    pub origin: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewPostRequest {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub date: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub thumbnail: Thumbnail,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedPost {
    pub filename: String,
    pub path: String,
}

/// URL-safe slug: lowercase ASCII letters and digits, runs of anything else
/// collapsed into a single `-`. German umlauts and ß are transliterated.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        let replacement = match c {
            'ä' => "ae",
            'ö' => "oe",
            'ü' => "ue",
            'ß' => "ss",
            _ => "",
        };
        if !replacement.is_empty() || c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            if replacement.is_empty() {
                slug.push(c);
            } else {
                slug.push_str(replacement);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// File stem for a post title: lowercase, spaces to `-`, everything outside
/// `[a-z0-9-]` dropped.
pub fn title_file_stem(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// `it's` -> `'it''s'`
fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Post date in UTC, second precision. Unparseable input falls back to `now`.
pub fn front_matter_date(input: &str, now: DateTime<Utc>) -> String {
    let date = NaiveDateTime::parse_from_str(input, DATE_INPUT_FORMAT)
        .map(|naive| naive.and_utc())
        .unwrap_or(now);
    date.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The YAML front matter block of a new draft.
pub fn generate_front_matter(post: &NewPostRequest, now: DateTime<Utc>) -> String {
    let mut out = String::from("---\n");
    // Writing to a String cannot fail
    let _ = writeln!(out, "title: {}", single_quoted(&post.title));
    let _ = writeln!(out, "slug: {}", post.slug);
    if !post.description.is_empty() {
        let _ = writeln!(out, "description: {}", single_quoted(&post.description));
    }
    let _ = writeln!(out, "date: {}", front_matter_date(&post.date, now));
    if !post.tags.is_empty() {
        let _ = writeln!(out, "tags: [{}]", post.tags.join(","));
    }
    if !post.categories.is_empty() {
        let _ = writeln!(out, "categories: [{}]", post.categories.join(","));
    }

    let thumb = &post.thumbnail;
    if !thumb.url.is_empty() {
        out.push_str("thumbnail:\n");
        let _ = writeln!(out, "  url: {}", thumb.url);
        for (key, value) in [
            ("author", &thumb.author),
            ("authorUrl", &thumb.author_url),
            ("origin", &thumb.origin),
        ] {
            if !value.is_empty() {
                let _ = writeln!(out, "  {key}: {value}");
            }
        }
    }
    out.push_str("draft: true\n---\n");
    out
}

#[derive(Debug, Clone)]
pub struct PostConfig {
    pub media_dir: PathBuf,
    pub asset_dir: PathBuf,
    pub asset_url_prefix: String,
    pub resize_generated: bool,
}

pub struct PostService {
    fs: Arc<dyn FileSystem>,
    content: Arc<ContentStore>,
    media: Arc<MediaProcessor>,
    generator: Arc<dyn ImageGenerator>,
    taxonomy: Arc<TaxonomyStore>,
    config: PostConfig,
}

impl PostService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        content: Arc<ContentStore>,
        media: Arc<MediaProcessor>,
        generator: Arc<dyn ImageGenerator>,
        taxonomy: Arc<TaxonomyStore>,
        config: PostConfig,
    ) -> Self {
        Self {
            fs,
            content,
            media,
            generator,
            taxonomy,
            config,
        }
    }

    pub async fn create_post(&self, request: NewPostRequest) -> AppResult<CreatedPost> {
        self.create_post_at(request, Utc::now()).await
    }

    /// [`create_post`](Self::create_post) with an explicit clock for the
    /// date fallback.
    pub async fn create_post_at(
        &self,
        mut post: NewPostRequest,
        now: DateTime<Utc>,
    ) -> AppResult<CreatedPost> {
        if post.title.trim().is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        if post.date.trim().is_empty() {
            return Err(AppError::validation("date", "Date is required"));
        }
        let language: Language = post.language.parse()?;
        let stem = title_file_stem(&post.title);
        if stem.is_empty() {
            return Err(AppError::validation(
                "title",
                "must contain at least one ASCII letter or digit",
            ));
        }

        if post.slug.is_empty() {
            post.slug = slugify(&post.title);
            if post.slug.is_empty() {
                return Err(AppError::validation("slug", "cannot be derived from the title"));
            }
            tracing::info!(slug = %post.slug, title = %post.title, "generated slug");
        }
        // The slug names the thumbnail file in the asset folder
        validate_file_name("slug", &post.slug)?;

        self.resolve_thumbnail(&mut post).await?;

        let front_matter = generate_front_matter(&post, now);
        let filename = format!("{stem}.md");
        let path = self.content.create(language, &filename, &front_matter)?;

        self.taxonomy.record(Taxonomy::Tags, &post.tags)?;
        self.taxonomy.record(Taxonomy::Categories, &post.categories)?;

        tracing::info!(filename = %filename, path = %path.display(), "post created");
        Ok(CreatedPost {
            filename,
            path: path.display().to_string(),
        })
    }

    /// Fill in `thumbnail.url` from a local file or a generated image.
    async fn resolve_thumbnail(&self, post: &mut NewPostRequest) -> AppResult<()> {
        let thumb = &post.thumbnail;
        if !thumb.url.is_empty() {
            return Ok(());
        }

        let file_name = if thumb.local_file.is_empty() {
            self.ensure_generated(&post.slug, &post.title).await?
        } else {
            let request = MediaProcessRequest {
                file: thumb.local_file.clone(),
                new_name: post.slug.clone(),
            };
            self.process_media(request).await?
        };
        post.thumbnail.url = format!("{}{}", self.config.asset_url_prefix, file_name);
        tracing::info!(url = %post.thumbnail.url, "thumbnail set");
        Ok(())
    }

    /// `<slug>.jpg` in the asset folder, generated from `prompt` unless it
    /// already exists.
    async fn ensure_generated(&self, slug: &str, prompt: &str) -> AppResult<String> {
        let file_name = format!("{slug}.jpg");
        let asset_dir = &self.config.asset_dir;
        let dest = asset_dir.join(&file_name);

        self.fs
            .create_dir_all(asset_dir)
            .map_err(|e| AppError::fs("create directory", asset_dir, e))?;
        if self.fs.exists(&dest) {
            tracing::info!(path = %dest.display(), "thumbnail already exists");
            return Ok(file_name);
        }

        if !self.config.resize_generated {
            self.generator.generate_landscape_image(prompt, &dest).await?;
            return Ok(file_name);
        }

        let media_dir = &self.config.media_dir;
        self.fs
            .create_dir_all(media_dir)
            .map_err(|e| AppError::fs("create directory", media_dir, e))?;
        self.generator
            .generate_landscape_image(prompt, &media_dir.join(&file_name))
            .await?;
        self.process_media(MediaProcessRequest {
            file: file_name,
            new_name: slug.to_string(),
        })
        .await
    }

    async fn process_media(&self, request: MediaProcessRequest) -> AppResult<String> {
        let media = self.media.clone();
        tokio::task::spawn_blocking(move || media.process_media_file(&request))
            .await
            .map_err(|e| {
                AppError::fs(
                    "process",
                    &self.config.media_dir,
                    std::io::Error::other(e),
                )
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::imaging::{ImageBackend, ResizeMethod, ResizeSpec, RustBackend};
    use crate::media::MediaConfig;
    use crate::storage::MemoryFileSystem;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use image::{DynamicImage, RgbImage};
    use std::path::Path;
    use std::sync::Mutex;

    /// Writes a small real JPEG and records prompts.
    struct StubGenerator {
        fs: Arc<MemoryFileSystem>,
        calls: Mutex<Vec<(String, PathBuf)>>,
        fail: bool,
    }

    impl StubGenerator {
        fn new(fs: Arc<MemoryFileSystem>) -> Arc<Self> {
            Arc::new(Self {
                fs,
                calls: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing(fs: Arc<MemoryFileSystem>) -> Arc<Self> {
            Arc::new(Self {
                fs,
                calls: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn calls(&self) -> Vec<(String, PathBuf)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageGenerator for StubGenerator {
        async fn generate_landscape_image(&self, prompt: &str, output: &Path) -> AppResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), output.to_path_buf()));
            if self.fail {
                return Err(crate::error::ApiError::new("stub", "/flux", "down")
                    .with_status(503)
                    .into());
            }
            let jpeg = RustBackend::default()
                .encode(&DynamicImage::ImageRgb8(RgbImage::new(120, 80)), output)
                .unwrap();
            self.fs
                .write(output, &jpeg)
                .map_err(|e| AppError::fs("write", output, e))
        }
    }

    struct Harness {
        fs: Arc<MemoryFileSystem>,
        generator: Arc<StubGenerator>,
        service: PostService,
    }

    fn harness_with(fs: MemoryFileSystem, resize_generated: bool, failing: bool) -> Harness {
        let fs = Arc::new(fs);
        let generator = if failing {
            StubGenerator::failing(fs.clone())
        } else {
            StubGenerator::new(fs.clone())
        };
        let server = ServerConfig {
            german_folder: PathBuf::from("/content/de"),
            english_folder: PathBuf::from("/content/en"),
            media_folder: PathBuf::from("/media"),
            asset_folder: PathBuf::from("/assets"),
            data_folder: PathBuf::from("/data"),
            ..ServerConfig::default()
        };
        let backend: Arc<dyn ImageBackend> = Arc::new(RustBackend::default());
        let media = MediaProcessor::new(
            fs.clone(),
            backend,
            MediaConfig {
                media_dir: server.media_folder.clone(),
                asset_dir: server.asset_folder.clone(),
                image: ResizeSpec {
                    method: ResizeMethod::Fit,
                    max_width: 60,
                },
                thumbnail: ResizeSpec {
                    method: ResizeMethod::Fill,
                    max_width: 20,
                },
            },
        );
        let service = PostService::new(
            fs.clone(),
            Arc::new(ContentStore::new(fs.clone(), &server)),
            Arc::new(media),
            generator.clone(),
            Arc::new(TaxonomyStore::new(fs.clone(), &server.data_folder)),
            PostConfig {
                media_dir: server.media_folder.clone(),
                asset_dir: server.asset_folder.clone(),
                asset_url_prefix: server.asset_url_prefix.clone(),
                resize_generated,
            },
        );
        Harness {
            fs,
            generator,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryFileSystem::new(), false, false)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn request(title: &str) -> NewPostRequest {
        NewPostRequest {
            title: title.to_string(),
            date: "2024-05-01T10:30".to_string(),
            language: "en".to_string(),
            ..NewPostRequest::default()
        }
    }

    fn read_string(fs: &MemoryFileSystem, path: &str) -> String {
        String::from_utf8(fs.read(Path::new(path)).unwrap()).unwrap()
    }

    // =========================================================================
    // Slugs and names
    // =========================================================================

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust  2024 -- notes "), "rust-2024-notes");
        assert_eq!(slugify("Über Größe"), "ueber-groesse");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn title_file_stem_drops_foreign_characters() {
        assert_eq!(title_file_stem("Hello World"), "hello-world");
        assert_eq!(title_file_stem("Hello, World!"), "hello-world");
        assert_eq!(title_file_stem("Über  uns"), "ber--uns");
    }

    // =========================================================================
    // Front matter
    // =========================================================================

    #[test]
    fn front_matter_full() {
        let post = NewPostRequest {
            title: "It's here".into(),
            slug: "its-here".into(),
            description: "A post".into(),
            date: "2024-05-01T10:30".into(),
            tags: vec!["rust".into(), "web".into()],
            categories: vec!["dev".into()],
            thumbnail: Thumbnail {
                url: "/img/blog/its-here.jpg".into(),
                author: "Jo".into(),
                author_url: "https://example.test/jo".into(),
                origin: "imagepig".into(),
                ..Thumbnail::default()
            },
            language: "en".into(),
        };
        assert_eq!(
            generate_front_matter(&post, now()),
            "---\n\
             title: 'It''s here'\n\
             slug: its-here\n\
             description: 'A post'\n\
             date: 2024-05-01T10:30:00Z\n\
             tags: [rust,web]\n\
             categories: [dev]\n\
             thumbnail:\n  \
               url: /img/blog/its-here.jpg\n  \
               author: Jo\n  \
               authorUrl: https://example.test/jo\n  \
               origin: imagepig\n\
             draft: true\n\
             ---\n"
        );
    }

    #[test]
    fn front_matter_minimal_skips_empty_sections() {
        let mut post = request("Hi");
        post.slug = "hi".into();
        assert_eq!(
            generate_front_matter(&post, now()),
            "---\ntitle: 'Hi'\nslug: hi\ndate: 2024-05-01T10:30:00Z\ndraft: true\n---\n"
        );
    }

    #[test]
    fn unparseable_date_uses_now() {
        assert_eq!(front_matter_date("yesterday", now()), "2024-06-01T12:00:00Z");
        assert_eq!(front_matter_date("2024-05-01T10:30:15", now()), "2024-06-01T12:00:00Z");
    }

    // =========================================================================
    // create_post
    // =========================================================================

    #[tokio::test]
    async fn generates_thumbnail_when_none_given() {
        let h = harness();
        let mut post = request("Hello World");
        post.tags = vec!["rust".into()];
        post.categories = vec!["dev".into()];

        let created = h.service.create_post_at(post, now()).await.unwrap();

        assert_eq!(created.filename, "hello-world.md");
        assert_eq!(created.path, "/content/en/hello-world.md");
        assert_eq!(
            h.generator.calls(),
            vec![("Hello World".to_string(), PathBuf::from("/assets/hello-world.jpg"))]
        );
        let text = read_string(&h.fs, "/content/en/hello-world.md");
        assert!(text.contains("slug: hello-world\n"));
        assert!(text.contains("  url: /img/blog/hello-world.jpg\n"));
        assert!(read_string(&h.fs, "/data/tags.json").contains("\"rust\""));
        assert!(read_string(&h.fs, "/data/categories.json").contains("\"dev\""));
    }

    #[tokio::test]
    async fn reuses_existing_generated_thumbnail() {
        let h = harness_with(
            MemoryFileSystem::new().with_file("/assets/hello-world.jpg", "old"),
            false,
            false,
        );
        h.service
            .create_post_at(request("Hello World"), now())
            .await
            .unwrap();
        assert!(h.generator.calls().is_empty());
        assert_eq!(h.fs.read(Path::new("/assets/hello-world.jpg")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn resize_generated_runs_media_processing() {
        let h = harness_with(MemoryFileSystem::new(), true, false);
        let created = h
            .service
            .create_post_at(request("Hello World"), now())
            .await
            .unwrap();
        assert_eq!(created.filename, "hello-world.md");
        assert_eq!(
            h.generator.calls()[0].1,
            PathBuf::from("/media/hello-world.jpg")
        );
        assert!(h.fs.exists(Path::new("/assets/hello-world.jpg")));
        assert!(h.fs.exists(Path::new("/assets/thumb_hello-world.jpg")));
    }

    #[tokio::test]
    async fn local_file_is_processed_with_slug_name() {
        let h = harness();
        let jpeg = RustBackend::default()
            .encode(&DynamicImage::ImageRgb8(RgbImage::new(100, 50)), Path::new("a.jpg"))
            .unwrap();
        h.fs.create_dir_all(Path::new("/media")).unwrap();
        h.fs.write(Path::new("/media/123.jpg"), &jpeg).unwrap();

        let mut post = request("Trip");
        post.slug = "summer-trip".into();
        post.thumbnail.local_file = "123.jpg".into();
        h.service.create_post_at(post, now()).await.unwrap();

        assert!(h.generator.calls().is_empty());
        assert!(h.fs.exists(Path::new("/assets/summer-trip.jpg")));
        assert!(h.fs.exists(Path::new("/assets/thumb_summer-trip.jpg")));
        assert!(read_string(&h.fs, "/content/en/trip.md").contains("url: /img/blog/summer-trip.jpg"));
    }

    #[tokio::test]
    async fn explicit_url_is_kept() {
        let h = harness();
        let mut post = request("Linked");
        post.thumbnail.url = "https://cdn.example.test/x.jpg".into();
        post.thumbnail.local_file = "ignored.jpg".into();
        h.service.create_post_at(post, now()).await.unwrap();
        assert!(h.generator.calls().is_empty());
        assert!(read_string(&h.fs, "/content/en/linked.md").contains("url: https://cdn.example.test/x.jpg"));
    }

    #[tokio::test]
    async fn validation_happens_before_side_effects() {
        let h = harness();
        for post in [
            NewPostRequest {
                title: String::new(),
                ..request("x")
            },
            NewPostRequest {
                date: String::new(),
                ..request("x")
            },
            NewPostRequest {
                language: "fr".into(),
                ..request("x")
            },
            request("!!!"),
        ] {
            let err = h.service.create_post_at(post, now()).await.unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }
        assert!(h.fs.paths().is_empty());
        assert!(h.generator.calls().is_empty());
    }

    #[tokio::test]
    async fn slug_cannot_leave_the_asset_folder() {
        let h = harness();
        for slug in ["../etc/pwned", "a/b", "..", "nested\\name"] {
            let mut post = request("Hello World");
            post.slug = slug.into();
            let err = h.service.create_post_at(post, now()).await.unwrap_err();
            assert!(
                matches!(err, AppError::Validation { ref field, .. } if field == "slug"),
                "{slug}: {err:?}"
            );
        }
        assert!(h.generator.calls().is_empty());
        assert!(h.fs.paths().is_empty());
    }

    #[tokio::test]
    async fn generator_failure_aborts_without_post() {
        let h = harness_with(MemoryFileSystem::new(), false, true);
        let err = h
            .service
            .create_post_at(request("Hello"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
        assert!(!h.fs.exists(Path::new("/content/en/hello.md")));
    }

    #[test]
    fn request_deserializes_camel_case() {
        let req: NewPostRequest = serde_json::from_str(
            r#"{"title":"T","date":"2024-01-01T00:00","language":"de",
                "thumbnail":{"localFile":"a.jpg","authorUrl":"u"}}"#,
        )
        .unwrap();
        assert_eq!(req.thumbnail.local_file, "a.jpg");
        assert_eq!(req.thumbnail.author_url, "u");
        assert!(req.tags.is_empty());
    }
}
