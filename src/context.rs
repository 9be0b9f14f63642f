//! Service wiring shared by the HTTP handlers and the CLI.

use crate::config::AppConfig;
use crate::content::ContentStore;
use crate::generation::{ImageGenerator, ImagePigClient, ReqwestTransport, TransportError};
use crate::imaging::{ImageBackend, RustBackend};
use crate::library::MediaLibrary;
use crate::media::{MediaConfig, MediaProcessor};
use crate::posts::{PostConfig, PostService};
use crate::storage::{FileSystem, OsFileSystem};
use crate::taxonomy::TaxonomyStore;
use std::sync::Arc;
use std::time::Duration;

/// Every service, built once from an immutable [`AppConfig`].
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub content: Arc<ContentStore>,
    pub library: Arc<MediaLibrary>,
    pub media: Arc<MediaProcessor>,
    pub generator: Arc<dyn ImageGenerator>,
    pub taxonomy: Arc<TaxonomyStore>,
    pub posts: Arc<PostService>,
}

impl AppContext {
    /// Production wiring: real disk, `image` codecs, ImagePig over reqwest.
    pub fn new(config: AppConfig) -> Result<Self, TransportError> {
        let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem::new());
        let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(
            config.image_generation.timeout_secs,
        ))?);
        let generator = Arc::new(ImagePigClient::new(
            transport,
            fs.clone(),
            &config.image_generation,
        ));
        let backend = Arc::new(RustBackend::new(config.encoding.quality()));
        Ok(Self::from_parts(config, fs, backend, generator))
    }

    pub fn from_parts(
        config: AppConfig,
        fs: Arc<dyn FileSystem>,
        backend: Arc<dyn ImageBackend>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        let server = &config.server;
        let content = Arc::new(ContentStore::new(fs.clone(), server));
        let library = Arc::new(MediaLibrary::new(fs.clone(), &server.media_folder));
        let taxonomy = Arc::new(TaxonomyStore::new(fs.clone(), &server.data_folder));
        let media = Arc::new(MediaProcessor::new(
            fs.clone(),
            backend,
            MediaConfig::from_app_config(&config),
        ));
        let posts = Arc::new(PostService::new(
            fs,
            content.clone(),
            media.clone(),
            generator.clone(),
            taxonomy.clone(),
            PostConfig {
                media_dir: server.media_folder.clone(),
                asset_dir: server.asset_folder.clone(),
                asset_url_prefix: server.asset_url_prefix.clone(),
                resize_generated: config.image_generation.resize_generated,
            },
        ));

        Self {
            config: Arc::new(config),
            content,
            library,
            media,
            generator,
            taxonomy,
            posts,
        }
    }
}
