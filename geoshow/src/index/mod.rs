//! Concurrent photo indexing.
//!
//! Every source is walked at the same time. Each file found becomes an
//! extraction unit (open, decode GPS, normalize path) spawned on a per-source
//! `JoinSet`; a shared semaphore bounds how many units run at once. `index`
//! returns only after every unit of every source has finished, so the
//! resulting collection is a fixed snapshot.
//!
//! ```text
//!  source A ──list──▶ unit unit unit ─┐
//!  source B ──list──▶ unit unit ──────┼──▶ Mutex<Vec<LocatedFeature>> ──▶ FeatureCollection
//!  source C ──list──▶ unit ───────────┘        (fan-in barrier)
//!                      ▲
//!            Semaphore(concurrency)
//! ```
//!
//! A failing listing aborts the run. A file that cannot be opened, has no
//! location, or is not an image at all is logged at debug level and skipped.

pub mod location;
pub mod geojson;

use futures::future::try_join_all;
use futures::TryStreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use geoshow_fs::{PhotoSource, SourceHandle};

use crate::config::IndexerConfig;
use crate::error::{Error, Result};
use crate::serving::image_path;

pub use self::location::{decode_location, Location, LocationError};
pub use self::geojson::{FeatureCollection, LocatedFeature, Point, IMAGE_PATH};

/// Builds the feature collection for a set of sources.
#[derive(Debug, Clone)]
pub struct Indexer {
    concurrency: usize,
    unit_timeout: Option<Duration>,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::from_config(&IndexerConfig::default())
    }
}

impl Indexer {
    /// An indexer running at most `concurrency` extraction units at once.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            unit_timeout: None,
        }
    }

    pub fn from_config(config: &IndexerConfig) -> Self {
        Self::new(config.concurrency)
            .with_unit_timeout(config.unit_timeout_secs.map(Duration::from_secs))
    }

    /// Give up on a single file after `timeout`.
    pub fn with_unit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.unit_timeout = timeout;
        self
    }

    /// Walk every source and collect one feature per located photo.
    pub async fn index(&self, sources: &[SourceHandle]) -> Result<FeatureCollection> {
        let started = Instant::now();
        let features = Arc::new(Mutex::new(Vec::new()));
        let permits = Arc::new(Semaphore::new(self.concurrency));

        let walks = sources
            .iter()
            .map(|source| self.walk(source.clone(), features.clone(), permits.clone()));
        let files: usize = try_join_all(walks).await?.into_iter().sum();

        let features = std::mem::take(&mut *features.lock());
        info!(
            sources = sources.len(),
            files,
            features = features.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Indexing complete"
        );

        Ok(FeatureCollection::new(features))
    }

    /// List one source and run an extraction unit per file. Returns the
    /// number of files seen.
    async fn walk(
        &self,
        source: SourceHandle,
        features: Arc<Mutex<Vec<LocatedFeature>>>,
        permits: Arc<Semaphore>,
    ) -> Result<usize> {
        let scheme = source.scheme().to_string();
        let mut units = JoinSet::new();
        let mut files = 0usize;

        {
            let mut entries = source.list_stream(source.root());
            while let Some(entry) = entries.try_next().await.map_err(|e| Error::Walk {
                scheme: scheme.clone(),
                source: e,
            })? {
                if entry.is_dir {
                    continue;
                }
                files += 1;

                let permit = permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Index(e.to_string()))?;
                let source = source.clone();
                let features = features.clone();
                let timeout = self.unit_timeout;

                units.spawn(async move {
                    let _permit = permit;
                    let path = entry.path;
                    let unit = extract_feature(&*source, &path);

                    let feature = match timeout {
                        Some(limit) => match tokio::time::timeout(limit, unit).await {
                            Ok(feature) => feature,
                            Err(_) => {
                                warn!(
                                    scheme = %source.scheme(),
                                    path = %path,
                                    timeout_secs = limit.as_secs(),
                                    "Extraction timed out, skipping"
                                );
                                None
                            }
                        },
                        None => unit.await,
                    };

                    if let Some(feature) = feature {
                        features.lock().push(feature);
                    }
                });
            }
        }

        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                warn!(scheme = %scheme, error = %e, "Extraction unit failed");
            }
        }

        debug!(scheme = %scheme, files, "Walked source");
        Ok(files)
    }
}

/// Open one file and turn it into a feature if it carries a GPS position.
async fn extract_feature(source: &dyn PhotoSource, path: &str) -> Option<LocatedFeature> {
    let scheme = source.scheme();

    let file = match source.open(path).await {
        Ok(file) => file,
        Err(e) => {
            debug!(scheme = %scheme, path = %path, error = %e, "Failed to open image for reading, skipping");
            return None;
        }
    };
    if file.is_placeholder() {
        debug!(scheme = %scheme, path = %path, "Placeholder entry, skipping");
        return None;
    }

    let data = match file.bytes().await {
        Ok(data) => data,
        Err(e) => {
            debug!(scheme = %scheme, path = %path, error = %e, "Failed to read image, skipping");
            return None;
        }
    };

    let location = match tokio::task::spawn_blocking(move || decode_location(&data)).await {
        Ok(Ok(location)) => location,
        Ok(Err(e)) => {
            debug!(scheme = %scheme, path = %path, error = %e, "No usable location, skipping");
            return None;
        }
        Err(e) => {
            warn!(scheme = %scheme, path = %path, error = %e, "Location decoding task failed");
            return None;
        }
    };

    let normalized = match source.normalize(path) {
        Ok(normalized) => normalized,
        Err(e) => {
            debug!(scheme = %scheme, path = %path, error = %e, "Failed to normalize path, skipping");
            return None;
        }
    };
    let image_path = image_path(scheme, &normalized);

    info!(
        image_path = %image_path,
        latitude = location.latitude,
        longitude = location.longitude,
        "Add feature for photo"
    );

    Some(LocatedFeature::new(
        Point::new(location.longitude, location.latitude),
        image_path,
    ))
}
