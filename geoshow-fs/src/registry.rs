//! Provider registry: URI scheme to source factory.
//!
//! The registry is an explicit value built once at startup. Factories are
//! installed with [`SourceRegistry::register`] (or all at once with
//! [`SourceRegistry::with_default_sources`]) before the first `resolve`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FsError, Result};
use crate::local::LocalSource;
use crate::traits::SourceHandle;
use crate::uri::{SourceUri, Substitutions};

/// Constructs a source from a parsed URI.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    async fn create(&self, uri: &SourceUri) -> Result<SourceHandle>;
}

#[async_trait]
impl<F> SourceFactory for F
where
    F: Fn(&SourceUri) -> Result<SourceHandle> + Send + Sync,
{
    async fn create(&self, uri: &SourceUri) -> Result<SourceHandle> {
        self(uri)
    }
}

/// Factory for local directories (`local://` or no scheme).
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFactory;

#[async_trait]
impl SourceFactory for LocalFactory {
    async fn create(&self, uri: &SourceUri) -> Result<SourceHandle> {
        Ok(Arc::new(LocalSource::new(uri.local_path())?))
    }
}

/// Factory for object-storage buckets.
#[cfg(feature = "blob")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BlobFactory;

#[cfg(feature = "blob")]
#[async_trait]
impl SourceFactory for BlobFactory {
    async fn create(&self, uri: &SourceUri) -> Result<SourceHandle> {
        Ok(Arc::new(crate::blob::BlobSource::open_uri(uri)?))
    }
}

/// Factory for Flickr collections.
#[cfg(feature = "flickr")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FlickrFactory;

#[cfg(feature = "flickr")]
#[async_trait]
impl SourceFactory for FlickrFactory {
    async fn create(&self, uri: &SourceUri) -> Result<SourceHandle> {
        Ok(Arc::new(crate::flickr::FlickrSource::open_uri(uri)?))
    }
}

/// Registry mapping schemes to factories.
#[derive(Default)]
pub struct SourceRegistry {
    factories: HashMap<String, Arc<dyn SourceFactory>>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in provider installed.
    pub fn with_default_sources() -> Self {
        let mut registry = Self::new();
        registry.install_defaults();
        registry
    }

    fn install_defaults(&mut self) {
        self.factories
            .insert("local".to_string(), Arc::new(LocalFactory));

        #[cfg(feature = "blob")]
        for scheme in crate::blob::BLOB_SCHEMES {
            self.factories
                .insert(scheme.to_string(), Arc::new(BlobFactory));
        }

        #[cfg(feature = "flickr")]
        self.factories
            .insert("flickr".to_string(), Arc::new(FlickrFactory));
    }

    /// Register a factory for `scheme`.
    ///
    /// # Errors
    ///
    /// Returns `FsError::DuplicateScheme` if the scheme is already bound.
    pub fn register(
        &mut self,
        scheme: impl Into<String>,
        factory: impl SourceFactory + 'static,
    ) -> Result<()> {
        let scheme = scheme.into();
        if self.factories.contains_key(&scheme) {
            return Err(FsError::DuplicateScheme(scheme));
        }
        debug!(scheme = %scheme, "Registered source factory");
        self.factories.insert(scheme, Arc::new(factory));
        Ok(())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.factories.contains_key(scheme)
    }

    /// Construct the source a URI refers to.
    ///
    /// # Errors
    ///
    /// Returns `FsError::UnknownScheme` if no factory is bound to the URI's
    /// scheme, or whatever the factory fails with.
    pub async fn resolve(&self, raw: &str) -> Result<SourceHandle> {
        let uri = SourceUri::parse(raw)?;
        let factory = self
            .factories
            .get(uri.scheme())
            .ok_or_else(|| FsError::UnknownScheme(uri.scheme().to_string()))?;

        let source = factory
            .create(&uri)
            .await
            .map_err(|e| e.context("resolve", redact(&uri)))?;

        info!(
            scheme = %source.scheme(),
            backend = source.backend_name(),
            root = %source.root(),
            "Resolved photo source"
        );
        Ok(source)
    }

    /// Apply `substitutions` to the raw URI, then resolve it.
    pub async fn resolve_with(&self, raw: &str, substitutions: &Substitutions) -> Result<SourceHandle> {
        self.resolve(&substitutions.apply(raw)).await
    }

    /// Resolve an ordered list of URIs.
    ///
    /// All-or-nothing: on the first failure the sources built so far are
    /// closed and the error is returned.
    pub async fn resolve_all(
        &self,
        uris: &[String],
        substitutions: &Substitutions,
    ) -> Result<Vec<SourceHandle>> {
        let mut sources = Vec::with_capacity(uris.len());
        for raw in uris {
            match self.resolve_with(raw, substitutions).await {
                Ok(source) => sources.push(source),
                Err(e) => {
                    close_all(&sources).await;
                    return Err(e);
                }
            }
        }
        Ok(sources)
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Close every source, logging failures.
pub async fn close_all(sources: &[SourceHandle]) {
    for source in sources {
        if let Err(e) = source.close().await {
            warn!(scheme = %source.scheme(), error = %e, "Failed to close photo source");
        }
    }
}

/// The URI without its query, which may carry credentials.
fn redact(uri: &SourceUri) -> String {
    match uri.as_str().split_once('?') {
        Some((base, _)) => format!("{}?...", base),
        None => uri.as_str().to_string(),
    }
}
