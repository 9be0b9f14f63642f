use clap::{Parser, Subcommand};
use post_desk::{config, context::AppContext, logging, media::MediaProcessRequest, server};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "post-desk")]
#[command(about = "Backend for a bilingual Markdown blog editor")]
#[command(long_about = "\
Backend for a bilingual Markdown blog editor

Serves the editor frontend and a JSON API over the blog's content tree:
post files per language, an uploaded-media folder, processed images in
the site's asset folder, and tag/category usage counters.

Layout (paths come from the [server] config section):

  ../content/de/blog/          # German posts        (german_folder)
  ../content/en/blog/          # English posts       (english_folder)
  static/                      # Editor frontend     (static_dir)
  static/media-data/           # Uploaded originals  (media_folder)
  ../assets/img/blog/          # Display + thumb_    (asset_folder)
  data/tags.json               # Usage counters      (data_folder)

Configuration is read from config.<APP_ENV>.toml, falling back to
config.toml, in --config-dir. IMAGEPIG_API_KEY, SERVER_HOST and
SERVER_PORT override the file. In development (the default APP_ENV)
a .env file is loaded first.

Run 'post-desk gen-config' to generate a documented config.toml.")]
#[command(version = env!("POST_DESK_BUILD"))]
struct Cli {
    /// Directory holding config.toml / config.<env>.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Resize one media file into a display image and a thumbnail
    ProcessMedia {
        /// File name inside the media folder
        #[arg(long)]
        file: String,
        /// Output base name, without extension
        #[arg(long)]
        new_name: String,
    },
    /// Generate a landscape image from a text prompt
    GenerateImage {
        #[arg(long)]
        prompt: String,
        /// Where to write the decoded image
        #[arg(long)]
        output: PathBuf,
    },
    /// Load and validate the configuration, then print it
    CheckConfig,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);

    if let Command::GenConfig = command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
    if app_env == "development" {
        dotenv::dotenv().ok();
    }

    let config = config::load_config(&cli.config_dir, &app_env)?;
    logging::init(&config.logging);
    match config::find_config_file(&cli.config_dir, &app_env) {
        Some(path) => tracing::info!(env = %app_env, path = %path.display(), "configuration loaded"),
        None => tracing::info!(env = %app_env, "no config file, using defaults"),
    }
    init_thread_pool(&config.processing);

    match command {
        Command::Serve => {
            let ctx = AppContext::new(config)?;
            runtime()?.block_on(server::serve(ctx))?;
        }
        Command::ProcessMedia { file, new_name } => {
            let ctx = AppContext::new(config)?;
            let request = MediaProcessRequest { file, new_name };
            let written = ctx.media.process_media_file(&request)?;
            println!("{written}");
        }
        Command::GenerateImage { prompt, output } => {
            let ctx = AppContext::new(config)?;
            runtime()?.block_on(ctx.generator.generate_landscape_image(&prompt, &output))?;
            println!("{}", output.display());
        }
        Command::CheckConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            println!("# configuration is valid");
        }
        // printed before config load
        Command::GenConfig => {}
    }

    Ok(())
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
