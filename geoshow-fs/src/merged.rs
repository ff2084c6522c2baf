//! Merged read-only view over same-scheme sources.
//!
//! Several sources may share a scheme (two local directories, say). They are
//! served through one view that tries each constituent in order:
//!
//! ```text
//! ┌─────────────┐
//! │ open(path)  │
//! └──────┬──────┘
//!        ▼
//! ┌─────────────┐    Found
//! │  source 0   │────────────► Return
//! └──────┬──────┘
//!        │ Not found
//!        ▼
//! ┌─────────────┐    Found
//! │  source 1   │────────────► Return
//! └──────┬──────┘
//!        │ Not found
//!        ▼
//!      ...         ──────────► NotFound
//! ```
//!
//! First match wins: if two constituents both hold `x.jpg`, the earlier one
//! is served and the later one is unreachable through this view. Errors
//! other than "not found" stop the search and are returned as-is.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

use crate::error::{FsError, Result};
use crate::traits::{EntryStream, PhotoSource, SourceFile, SourceHandle};

/// Ordered union of sources sharing one scheme.
pub struct MergedSource {
    scheme: String,
    layers: Vec<SourceHandle>,
}

impl MergedSource {
    /// Merge `layers`, which must all report `scheme`.
    ///
    /// # Errors
    ///
    /// Returns `FsError::Backend` if `layers` is empty or mixes schemes.
    pub fn new(scheme: impl Into<String>, layers: Vec<SourceHandle>) -> Result<Self> {
        let scheme = scheme.into();
        if layers.is_empty() {
            return Err(FsError::Backend(format!("no sources to merge for '{}'", scheme)));
        }
        if let Some(other) = layers.iter().find(|l| l.scheme() != scheme) {
            return Err(FsError::Backend(format!(
                "cannot merge '{}' source into '{}' view",
                other.scheme(),
                scheme
            )));
        }
        Ok(Self { scheme, layers })
    }

    pub fn layers(&self) -> &[SourceHandle] {
        &self.layers
    }
}

impl std::fmt::Debug for MergedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedSource")
            .field("scheme", &self.scheme)
            .field("layers", &self.layers.len())
            .finish()
    }
}

#[async_trait]
impl PhotoSource for MergedSource {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn root(&self) -> &str {
        self.layers[0].root()
    }

    fn list_stream<'a>(&'a self, root: &'a str) -> EntryStream<'a> {
        Box::pin(try_stream! {
            let mut seen = HashSet::new();
            for layer in &self.layers {
                let mut entries = layer.list_stream(root);
                while let Some(entry) = entries.try_next().await? {
                    if seen.insert(entry.path.clone()) {
                        yield entry;
                    }
                }
            }
        })
    }

    #[instrument(skip(self), fields(scheme = %self.scheme, path = %path))]
    async fn open(&self, path: &str) -> Result<SourceFile> {
        for (idx, layer) in self.layers.iter().enumerate() {
            match layer.open(path).await {
                Ok(file) => {
                    debug!(layer = idx, "Opened from merged source");
                    return Ok(file);
                }
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(FsError::NotFound(path.to_string()))
    }

    fn normalize(&self, path: &str) -> Result<String> {
        let mut first_err = None;
        for layer in &self.layers {
            match layer.normalize(path) {
                Ok(normalized) => return Ok(normalized),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        Err(first_err.unwrap_or_else(|| FsError::NotFound(path.to_string())))
    }

    async fn close(&self) -> Result<()> {
        let mut result = Ok(());
        for layer in &self.layers {
            if let Err(e) = layer.close().await {
                warn!(scheme = %self.scheme, error = %e, "Failed to close merged layer");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn backend_name(&self) -> &'static str {
        "merged"
    }
}
