//! Application configuration.
//!
//! Stock defaults are overlaid with one sparse user file and then with a few
//! environment variables. The result is validated once at startup and passed
//! by value into every service; nothing reads configuration at request time.
//!
//! ## Lookup
//!
//! In the config directory (`--config-dir`, default `.`):
//!
//! ```text
//! config.<APP_ENV>.toml   # first match wins (APP_ENV defaults to "development")
//! config.toml
//! (none)                  # stock defaults only
//! ```
//!
//! ## Environment overrides
//!
//! | Variable | Key |
//! |---|---|
//! | `IMAGEPIG_API_KEY` | `image_generation.api_key` |
//! | `SERVER_HOST` | `server.host` |
//! | `SERVER_PORT` | `server.port` |
//!
//! ## Partial Configuration
//!
//! ```toml
//! [thumbnail_resize]
//! method = "fill"
//! max_width = 600
//! ```
//!
//! Unknown keys are rejected to catch typos early. `gen-config` prints the
//! full documented file.

use crate::imaging::{Quality, ResizeSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Display image written by media processing.
    pub image_resize: ResizeSpec,
    /// `thumb_` companion written next to it.
    pub thumbnail_resize: ResizeSpec,
    pub encoding: EncodingConfig,
    pub image_generation: ImageGenerationConfig,
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
    /// Editor toolbar shortcodes, served to the frontend as-is.
    pub shortcodes: Vec<Shortcode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Editor frontend, served for every path the API does not claim.
    pub static_dir: PathBuf,
    /// Posts for `de/...` file parameters.
    pub german_folder: PathBuf,
    /// Posts for `en/...` file parameters.
    pub english_folder: PathBuf,
    /// Uploaded originals.
    pub media_folder: PathBuf,
    /// Processed and generated images.
    pub asset_folder: PathBuf,
    /// `tags.json` and `categories.json`.
    pub data_folder: PathBuf,
    /// Public URL prefix of `asset_folder`, used in post front matter.
    pub asset_url_prefix: String,
    /// Request body limit for uploads and saves.
    pub upload_limit_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            static_dir: PathBuf::from("static"),
            german_folder: PathBuf::from("../content/de/blog"),
            english_folder: PathBuf::from("../content/en/blog"),
            media_folder: PathBuf::from("static/media-data"),
            asset_folder: PathBuf::from("../assets/img/blog"),
            data_folder: PathBuf::from("data"),
            asset_url_prefix: "/img/blog/".to_string(),
            upload_limit_mb: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// JPEG quality for processed images (1-100).
    pub jpeg_quality: u32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

impl EncodingConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.jpeg_quality)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageGenerationConfig {
    pub base_url: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Never written back out; prefer `IMAGEPIG_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Generate into the media folder and run media processing on the
    /// result instead of writing straight to the asset folder.
    pub resize_generated: bool,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.imagepig.com".to_string(),
            endpoint: "/flux".to_string(),
            timeout_secs: 30,
            api_key: None,
            resize_generated: false,
        }
    }
}

impl ImageGenerationConfig {
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Shortcode {
    pub id: String,
    pub code: String,
    pub icon: String,
    pub order: u32,
    #[serde(default)]
    pub tooltip: String,
}

pub fn default_shortcodes() -> Vec<Shortcode> {
    vec![
        Shortcode {
            id: "bold".to_string(),
            code: "**text**".to_string(),
            icon: "bold".to_string(),
            order: 1,
            tooltip: "Make text bold".to_string(),
        },
        Shortcode {
            id: "italic".to_string(),
            code: "_text_".to_string(),
            icon: "italic".to_string(),
            order: 2,
            tooltip: "Make text italic".to_string(),
        },
    ]
}

impl AppConfig {
    /// Stock defaults, including the default shortcodes.
    pub fn stock() -> Self {
        Self {
            shortcodes: default_shortcodes(),
            ..Self::default()
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be 1-65535".into(),
            ));
        }
        let folders = [
            ("server.static_dir", &self.server.static_dir),
            ("server.german_folder", &self.server.german_folder),
            ("server.english_folder", &self.server.english_folder),
            ("server.media_folder", &self.server.media_folder),
            ("server.asset_folder", &self.server.asset_folder),
            ("server.data_folder", &self.server.data_folder),
        ];
        for (key, folder) in folders {
            if folder.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.image_resize.max_width == 0 {
            return Err(ConfigError::Validation(
                "image_resize.max_width must be positive".into(),
            ));
        }
        if self.thumbnail_resize.max_width == 0 {
            return Err(ConfigError::Validation(
                "thumbnail_resize.max_width must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.encoding.jpeg_quality) {
            return Err(ConfigError::Validation(
                "encoding.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.image_generation.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "image_generation.timeout_secs must be positive".into(),
            ));
        }
        if self.server.upload_limit_mb == 0 {
            return Err(ConfigError::Validation(
                "server.upload_limit_mb must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::stock())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `[[shortcodes]]` list replaces the stock list.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// The config file that applies to `app_env`, if any.
pub fn find_config_file(dir: &Path, app_env: &str) -> Option<PathBuf> {
    [format!("config.{app_env}.toml"), "config.toml".to_string()]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides. `lookup` is `std::env::var` in production.
pub fn apply_env_overrides(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(key) = lookup("IMAGEPIG_API_KEY").filter(|k| !k.is_empty()) {
        config.image_generation.api_key = Some(key);
    }
    if let Some(host) = lookup("SERVER_HOST").filter(|h| !h.is_empty()) {
        config.server.host = host;
    }
    if let Some(port) = lookup("SERVER_PORT").filter(|p| !p.is_empty()) {
        config.server.port = port.parse().map_err(|_| {
            ConfigError::Validation(format!("SERVER_PORT must be 1-65535, got {port:?}"))
        })?;
    }
    Ok(())
}

/// Load, merge, override and validate, reading overrides through `lookup`.
pub fn load_config_with_env(
    dir: &Path,
    app_env: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match find_config_file(dir, app_env) {
        Some(path) => merge_toml(base, load_raw_config(&path)?),
        None => base,
    };
    let mut config: AppConfig = merged.try_into()?;
    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;
    Ok(config)
}

/// Load config for `app_env` from `dir` using the process environment.
pub fn load_config(dir: &Path, app_env: &str) -> Result<AppConfig, ConfigError> {
    load_config_with_env(dir, app_env, |name| std::env::var(name).ok())
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Post Desk Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Lookup order in the config directory:
#   config.<APP_ENV>.toml   (APP_ENV defaults to "development")
#   config.toml
# Only the first file found is used. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# HTTP server and folders
# ---------------------------------------------------------------------------
[server]
host = "127.0.0.1"            # SERVER_HOST overrides
port = 8081                   # SERVER_PORT overrides
static_dir = "static"         # Editor frontend
german_folder = "../content/de/blog"
english_folder = "../content/en/blog"
media_folder = "static/media-data"
asset_folder = "../assets/img/blog"
data_folder = "data"          # tags.json, categories.json
asset_url_prefix = "/img/blog/"
upload_limit_mb = 32

# ---------------------------------------------------------------------------
# Media processing
# ---------------------------------------------------------------------------
# method: "fit"  scales into the box, no cropping
#         "fill" scales and center-crops to exactly fill the box
#                ("resize" is accepted as an alias of "fill")
# Both outputs share the box height derived from image_resize.max_width
# and the source aspect ratio.
[image_resize]
method = "fit"
max_width = 2800

[thumbnail_resize]
method = "fit"
max_width = 2800

[encoding]
jpeg_quality = 95             # 1 = worst, 100 = best

# ---------------------------------------------------------------------------
# Thumbnail generation (ImagePig FLUX)
# ---------------------------------------------------------------------------
[image_generation]
base_url = "https://api.imagepig.com"
endpoint = "/flux"
timeout_secs = 30
# api_key = "..."             # Prefer the IMAGEPIG_API_KEY variable
# Run generated images through media processing (writes the thumb_ pair).
resize_generated = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
level = "info"                # RUST_LOG takes precedence
format = "json"               # "json" or "pretty"

# ---------------------------------------------------------------------------
# Editor shortcodes (a user list replaces this one entirely)
# ---------------------------------------------------------------------------
[[shortcodes]]
id = "bold"
code = "**text**"
icon = "bold"
order = 1
tooltip = "Make text bold"

[[shortcodes]]
id = "italic"
code = "_text_"
icon = "italic"
order = 2
tooltip = "Make text italic"
"##
}
