use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use geoshow::config::{parse_style, Config};

#[derive(Parser, Debug)]
#[command(name = "geoshow")]
#[command(about = "Show geotagged photos from local folders, buckets and Flickr on a map")]
#[command(version)]
struct Args {
    /// Photo source URIs, in priority order. A bare path is a local directory.
    #[arg(env = "SHOW_SOURCES", value_delimiter = ',')]
    sources: Vec<String>,

    /// Configuration file path
    #[arg(short, long, env = "SHOW_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "SHOW_HOST")]
    host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "SHOW_PORT")]
    port: Option<u16>,

    /// Map provider: leaflet or protomaps
    #[arg(long, env = "SHOW_MAP_PROVIDER")]
    map_provider: Option<String>,

    /// Tile URI for the map provider
    #[arg(long, env = "SHOW_MAP_TILE_URI")]
    map_tile_uri: Option<String>,

    /// Protomaps theme
    #[arg(long, env = "SHOW_PROTOMAPS_THEME")]
    protomaps_theme: Option<String>,

    /// Layer style, as JSON or a path to a JSON file
    #[arg(long, env = "SHOW_STYLE")]
    style: Option<String>,

    /// Point style, as JSON or a path to a JSON file
    #[arg(long, env = "SHOW_POINT_STYLE")]
    point_style: Option<String>,

    /// Feature property shown in popups (repeatable)
    #[arg(long = "label", env = "SHOW_LABEL_PROPERTIES", value_delimiter = ',')]
    label_properties: Vec<String>,

    /// Value for {flickr-client-uri} in source URIs
    #[arg(long, env = "SHOW_FLICKR_CLIENT_URI")]
    flickr_client_uri: Option<String>,

    /// Value for {flickr-root-uri} in source URIs
    #[arg(long, env = "SHOW_FLICKR_ROOT_URI")]
    flickr_root_uri: Option<String>,

    /// Maximum number of photos processed at once
    #[arg(long, env = "SHOW_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Give up on a single photo after this many seconds
    #[arg(long, env = "SHOW_UNIT_TIMEOUT_SECS")]
    unit_timeout_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, env = "SHOW_VERBOSE")]
    verbose: bool,

    /// Log format: pretty or json
    #[arg(long, env = "SHOW_LOG_FORMAT")]
    log_format: Option<String>,
}

impl Args {
    /// Apply command-line values on top of the file configuration.
    fn apply(self, config: &mut Config) -> Result<()> {
        if !self.sources.is_empty() {
            config.sources.uris = self.sources;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(provider) = self.map_provider {
            config.map.provider = provider;
        }
        if self.map_tile_uri.is_some() {
            config.map.tile_uri = self.map_tile_uri;
        }
        if let Some(theme) = self.protomaps_theme {
            config.map.protomaps_theme = theme;
        }
        if let Some(raw) = self.style {
            config.map.style = Some(parse_style(&raw).context("Failed to load --style")?);
        }
        if let Some(raw) = self.point_style {
            config.map.point_style =
                Some(parse_style(&raw).context("Failed to load --point-style")?);
        }
        if !self.label_properties.is_empty() {
            config.map.label_properties = self.label_properties;
        }
        if self.flickr_client_uri.is_some() {
            config.sources.flickr_client_uri = self.flickr_client_uri;
        }
        if self.flickr_root_uri.is_some() {
            config.sources.flickr_root_uri = self.flickr_root_uri;
        }
        if let Some(concurrency) = self.concurrency {
            config.indexer.concurrency = concurrency;
        }
        if self.unit_timeout_secs.is_some() {
            config.indexer.unit_timeout_secs = self.unit_timeout_secs;
        }
        if self.verbose {
            config.logging.verbose = true;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        Ok(())
    }
}

fn init_tracing(config: &Config) {
    let default_level = if config.logging.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(feature = "ui")]
fn ui() -> Option<axum::Router> {
    Some(geoshow_ui::ui_router())
}

#[cfg(not(feature = "ui"))]
fn ui() -> Option<axum::Router> {
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    args.apply(&mut config)?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!(
        sources = config.sources.uris.len(),
        provider = %config.map.provider,
        "Starting geoshow on {}",
        config.server.bind_addr()
    );

    geoshow::run(&config, ui()).await?;

    Ok(())
}
