//! Startup and shutdown.
//!
//! ```text
//! Config ─▶ substitutions ─▶ resolve sources ─▶ map config ─▶ index ─▶ serving table ─▶ serve
//!                                   │                                                     │
//!                                   └──────────────── close on error or Ctrl-C ◀──────────┘
//! ```

use axum::Router;
use std::future::Future;
use tracing::info;

use geoshow_fs::{close_all, SourceHandle, SourceRegistry};

use crate::api::{ApiServer, MapConfig};
use crate::config::Config;
use crate::error::Result;
use crate::index::{FeatureCollection, Indexer};
use crate::serving::ServingTable;

/// Everything needed to start serving.
pub struct Prepared {
    pub sources: Vec<SourceHandle>,
    pub features: FeatureCollection,
    pub serving: ServingTable,
    pub map: MapConfig,
}

impl Prepared {
    pub fn into_server(self) -> (ApiServer, Vec<SourceHandle>) {
        (ApiServer::new(self.features, self.serving, self.map), self.sources)
    }
}

/// Resolve sources, index them and build the serving table.
///
/// Sources already constructed are closed before an error is returned.
pub async fn prepare(config: &Config) -> Result<Prepared> {
    prepare_with(config, &SourceRegistry::with_default_sources()).await
}

/// Like [`prepare`] with a caller-provided registry.
pub async fn prepare_with(config: &Config, registry: &SourceRegistry) -> Result<Prepared> {
    config.validate()?;

    let sources = registry
        .resolve_all(&config.sources.uris, &config.substitutions())
        .await?;
    info!(sources = sources.len(), "Resolved photo sources");

    match build(config, &sources).await {
        Ok((features, serving, map)) => Ok(Prepared {
            sources,
            features,
            serving,
            map,
        }),
        Err(e) => {
            close_all(&sources).await;
            Err(e)
        }
    }
}

async fn build(
    config: &Config,
    sources: &[SourceHandle],
) -> Result<(FeatureCollection, ServingTable, MapConfig)> {
    let map = MapConfig::from_settings(&config.map)?;
    let features = Indexer::from_config(&config.indexer).index(sources).await?;
    let serving = ServingTable::build(sources)?;
    Ok((features, serving, map))
}

/// Prepare and serve until `shutdown` resolves, then close every source.
pub async fn run_until<F>(config: &Config, ui: Option<Router>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (mut server, sources) = prepare(config).await?.into_server();
    if let Some(ui) = ui {
        server = server.with_ui(ui);
    }

    let served = server.serve(&config.server.bind_addr(), shutdown).await;

    info!("Closing photo sources");
    close_all(&sources).await;
    served
}

/// Prepare and serve until Ctrl-C.
pub async fn run(config: &Config, ui: Option<Router>) -> Result<()> {
    run_until(config, ui, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    })
    .await
}
