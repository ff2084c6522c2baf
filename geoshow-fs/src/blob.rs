//! Object-storage bucket source.
//!
//! Uses the `object_store` crate, so one adapter covers every backend it
//! understands through `parse_url_opts`:
//!
//! ```text
//! file:///data/photos
//! memory:///
//! s3://my-bucket/photos?region=eu-west-1
//! ```
//!
//! Query parameters are passed through as store options (`region`,
//! `endpoint`, `access_key_id`, ...). The path component becomes a prefix
//! under which all source paths live.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{FsError, Result, ResultExt};
use crate::path::{clean_relative, join};
use crate::traits::{EntryStream, PhotoSource, SourceEntry, SourceFile};
use crate::uri::SourceUri;

/// Schemes handled by [`BlobSource`].
pub const BLOB_SCHEMES: &[&str] = &["file", "memory", "s3", "s3a"];

/// A bucket (or bucket prefix) exposed as a read-only photo source.
///
/// `scheme()` is the scheme of the bucket URI (`s3`, `file`, ...), keeping
/// photos from different backends in separate serving buckets.
pub struct BlobSource {
    scheme: String,
    store: RwLock<Option<Arc<dyn ObjectStore>>>,
    prefix: String,
}

impl BlobSource {
    /// Open the bucket identified by `uri`.
    pub fn open_uri(uri: &SourceUri) -> Result<Self> {
        let mut url = uri.to_url()?;
        let options: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        url.set_query(None);

        let (store, prefix) = object_store::parse_url_opts(&url, options)
            .map_err(|e| FsError::from(e).context("open bucket", uri.as_str()))?;

        debug!(url = %url, prefix = %prefix, "Opened bucket");

        Ok(Self::from_store(
            uri.scheme(),
            Arc::from(store),
            prefix.as_ref().to_string(),
        ))
    }

    /// Create from an existing ObjectStore instance.
    pub fn from_store(
        scheme: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            store: RwLock::new(Some(store)),
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    fn store(&self) -> Result<Arc<dyn ObjectStore>> {
        self.store
            .read()
            .clone()
            .ok_or_else(|| FsError::Closed(format!("{}://{}", self.scheme, self.prefix)))
    }

    /// Convert a source path to an object_store Path.
    fn to_object_path(&self, path: &str) -> Result<ObjectPath> {
        let relative = clean_relative(path)?;
        Ok(ObjectPath::from(join(&self.prefix, &relative)))
    }

    /// Convert an object_store Path back to a source path.
    fn from_object_path(&self, obj_path: &ObjectPath) -> Option<String> {
        let path_str = obj_path.as_ref();
        let relative = if self.prefix.is_empty() {
            path_str
        } else {
            path_str.strip_prefix(&self.prefix)?.trim_start_matches('/')
        };
        if relative.is_empty() {
            None
        } else {
            Some(relative.to_string())
        }
    }
}

impl std::fmt::Debug for BlobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobSource")
            .field("scheme", &self.scheme)
            .field("prefix", &self.prefix)
            .field("closed", &self.store.read().is_none())
            .finish()
    }
}

#[async_trait]
impl PhotoSource for BlobSource {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn root(&self) -> &str {
        "."
    }

    fn list_stream<'a>(&'a self, root: &'a str) -> EntryStream<'a> {
        Box::pin(try_stream! {
            let store = self.store()?;
            let obj_prefix = self.to_object_path(root)?;
            debug!("Listing {}://{}", self.scheme, obj_prefix);

            let prefix = if obj_prefix.as_ref().is_empty() {
                None
            } else {
                Some(&obj_prefix)
            };
            let mut listing = store.list(prefix);

            while let Some(meta) = listing
                .try_next()
                .await
                .map_err(|e| FsError::from(e).context("list", root))?
            {
                if let Some(path) = self.from_object_path(&meta.location) {
                    yield SourceEntry {
                        path,
                        is_dir: false,
                        size: Some(meta.size as u64),
                        modified: Some(meta.last_modified),
                    };
                }
            }
        })
    }

    #[instrument(skip(self), fields(scheme = %self.scheme, path = %path))]
    async fn open(&self, path: &str) -> Result<SourceFile> {
        let obj_path = self.to_object_path(path).context("open", path)?;
        if obj_path.as_ref().is_empty() {
            return Err(FsError::NotFound(path.to_string()));
        }
        debug!("Reading {}://{}", self.scheme, obj_path);

        let result = match self.store()?.get(&obj_path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(FsError::NotFound(path.to_string()))
            }
            Err(e) => return Err(FsError::from(e).context("open", path)),
        };

        let size = result.meta.size as u64;
        let modified = result.meta.last_modified;
        let body = result.into_stream().map_err(FsError::from);

        Ok(SourceFile::new(path, Box::pin(body))
            .with_size(Some(size))
            .with_modified(modified))
    }

    fn normalize(&self, path: &str) -> Result<String> {
        Ok(path.to_string())
    }

    async fn close(&self) -> Result<()> {
        if self.store.write().take().is_some() {
            debug!(scheme = %self.scheme, prefix = %self.prefix, "Closed bucket");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "object_store"
    }
}
