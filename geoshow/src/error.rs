use geoshow_fs::FsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Source error: {0}")]
    Source(#[from] FsError),

    #[error("No photo sources configured")]
    NoSources,

    #[error("Failed to walk {scheme} source: {source}")]
    Walk {
        scheme: String,
        #[source]
        source: FsError,
    },

    #[error("Index error: {0}")]
    Index(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Map error: {0}")]
    Map(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
