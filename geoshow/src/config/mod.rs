//! Configuration management for geoshow
//!
//! Settings come from an optional TOML file; every section has defaults so an
//! empty file (or no file) is a valid configuration. Command-line flags are
//! applied on top by the server binary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use geoshow_fs::{Substitutions, FLICKR_CLIENT_TOKEN, FLICKR_ROOT_TOKEN};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub map: MapSettings,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port, 0 picks a free one.
    #[serde(default)]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where photos come from.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SourcesConfig {
    /// Source URIs in priority order. A bare path is a local directory.
    #[serde(default)]
    pub uris: Vec<String>,
    /// Value for `{flickr-client-uri}` tokens in source URIs.
    #[serde(default)]
    pub flickr_client_uri: Option<String>,
    /// Value for `{flickr-root-uri}` tokens in source URIs.
    #[serde(default)]
    pub flickr_root_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapSettings {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub tile_uri: Option<String>,
    #[serde(default = "default_protomaps_theme")]
    pub protomaps_theme: String,
    #[serde(default)]
    pub style: Option<Value>,
    #[serde(default)]
    pub point_style: Option<Value>,
    /// Feature properties shown as the popup label, in order.
    #[serde(default)]
    pub label_properties: Vec<String>,
}

fn default_provider() -> String {
    "leaflet".to_string()
}

fn default_protomaps_theme() -> String {
    "white".to_string()
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            tile_uri: None,
            protomaps_theme: default_protomaps_theme(),
            style: None,
            point_style: None,
            label_properties: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    /// Maximum number of files processed at once (default: 64)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Give up on a single file after this many seconds.
    #[serde(default)]
    pub unit_timeout_secs: Option<u64>,
}

fn default_concurrency() -> usize {
    64
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            unit_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Token values applied to source URIs before they are resolved.
    pub fn substitutions(&self) -> Substitutions {
        Substitutions::new()
            .with_optional(FLICKR_CLIENT_TOKEN, self.sources.flickr_client_uri.as_deref())
            .with_optional(FLICKR_ROOT_TOKEN, self.sources.flickr_root_uri.as_deref())
    }

    /// Reject settings that cannot start a server.
    pub fn validate(&self) -> Result<()> {
        if self.sources.uris.is_empty() {
            return Err(Error::NoSources);
        }
        if self.indexer.concurrency == 0 {
            return Err(Error::Config("indexer.concurrency must be at least 1".into()));
        }
        if self.indexer.unit_timeout_secs == Some(0) {
            return Err(Error::Config("indexer.unit_timeout_secs must be at least 1".into()));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(Error::Config(format!(
                    "unknown logging.format '{}', expected pretty or json",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// Parse a style payload given either inline as JSON or as a path to a JSON file.
pub fn parse_style(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let content = fs::read_to_string(trimmed)
        .map_err(|e| Error::Config(format!("failed to read style file {}: {}", trimmed, e)))?;
    Ok(serde_json::from_str(&content)?)
}
