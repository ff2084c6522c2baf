//! Scheme-partitioned serving table.
//!
//! Every `image:path` is `<scheme>/<path>`. The serving table maps each
//! scheme to the one source able to open `<path>`: the adapter itself when
//! it is alone in its scheme, or a [`MergedSource`] over all same-scheme
//! adapters in list order (first match wins).
//!
//! The table is built once after the sources are known and never changes.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use geoshow_fs::{FsError, MergedSource, SourceFile, SourceHandle};

use crate::error::{Error, Result};

/// Build the `image:path` of a normalized source path.
pub fn image_path(scheme: &str, normalized: &str) -> String {
    format!("{}/{}", scheme, normalized.trim_start_matches('/'))
}

/// Split `<scheme>/<rest>` on the first separator.
pub fn split_image_path(path: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = path.trim_start_matches('/').split_once('/')?;
    if scheme.is_empty() || rest.is_empty() {
        None
    } else {
        Some((scheme, rest))
    }
}

/// Why a photo request could not be served.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("no photo at {0}")]
    NotFound(String),

    #[error("failed to open {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: FsError,
    },
}

impl ServeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServeError::NotFound(_))
    }
}

/// Immutable scheme → source map used to serve photo bytes.
#[derive(Clone)]
pub struct ServingTable {
    entries: BTreeMap<String, SourceHandle>,
}

impl ServingTable {
    /// Partition `sources` by scheme, merging same-scheme sources in order.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSources` if `sources` is empty.
    pub fn build(sources: &[SourceHandle]) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::NoSources);
        }

        let mut groups: BTreeMap<String, Vec<SourceHandle>> = BTreeMap::new();
        for source in sources {
            groups
                .entry(source.scheme().to_string())
                .or_default()
                .push(source.clone());
        }

        let mut entries = BTreeMap::new();
        for (scheme, mut group) in groups {
            let entry: SourceHandle = if group.len() == 1 {
                group.remove(0)
            } else {
                debug!(scheme = %scheme, sources = group.len(), "Merging same-scheme sources");
                Arc::new(MergedSource::new(scheme.clone(), group)?)
            };
            entries.insert(scheme, entry);
        }

        Ok(Self { entries })
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, scheme: &str) -> Option<&SourceHandle> {
        self.entries.get(scheme)
    }

    /// Open the photo at `<scheme>/<rest>`.
    ///
    /// Unknown schemes, malformed paths, missing files, directories and
    /// placeholder entries are all `ServeError::NotFound`; any other source
    /// failure is `ServeError::Source`.
    pub async fn open(&self, path: &str) -> std::result::Result<SourceFile, ServeError> {
        let not_found = || ServeError::NotFound(path.to_string());

        let (scheme, rest) = split_image_path(path).ok_or_else(not_found)?;
        let source = self.entries.get(scheme).ok_or_else(not_found)?;

        match source.open(rest).await {
            Ok(file) if file.is_placeholder() => Err(not_found()),
            Ok(file) => Ok(file),
            Err(e) if e.is_not_found() => Err(not_found()),
            Err(e)
                if matches!(
                    e.root_cause(),
                    FsError::InvalidPath(_) | FsError::MalformedReference(_)
                ) =>
            {
                Err(not_found())
            }
            Err(e) => Err(ServeError::Source {
                path: path.to_string(),
                source: e,
            }),
        }
    }
}

impl std::fmt::Debug for ServingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServingTable")
            .field("schemes", &self.schemes().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use geoshow_fs::{Bytes, EntryStream, LocalSource, PhotoSource};
    use tempfile::TempDir;

    /// In-memory source answering for any scheme.
    struct StubSource {
        scheme: &'static str,
        files: Vec<(&'static str, &'static [u8])>,
    }

    #[async_trait]
    impl PhotoSource for StubSource {
        fn scheme(&self) -> &str {
            self.scheme
        }

        fn root(&self) -> &str {
            "."
        }

        fn list_stream<'a>(&'a self, _root: &'a str) -> EntryStream<'a> {
            stream::empty().boxed()
        }

        async fn open(&self, path: &str) -> geoshow_fs::Result<SourceFile> {
            match self.files.iter().find(|(name, _)| *name == path) {
                Some((_, data)) => Ok(SourceFile::from_bytes(path, Bytes::from_static(data))),
                None if path == "broken.jpg" => Err(FsError::Backend("upstream exploded".into())),
                None => Err(FsError::NotFound(path.to_string())),
            }
        }

        fn normalize(&self, path: &str) -> geoshow_fs::Result<String> {
            Ok(path.to_string())
        }

        async fn close(&self) -> geoshow_fs::Result<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "stub"
        }
    }

    fn local(files: &[(&str, &str)]) -> (SourceHandle, TempDir) {
        let temp = TempDir::new().unwrap();
        for (name, data) in files {
            std::fs::write(temp.path().join(name), data).unwrap();
        }
        (Arc::new(LocalSource::new(temp.path()).unwrap()), temp)
    }

    async fn read(table: &ServingTable, path: &str) -> Vec<u8> {
        table.open(path).await.unwrap().bytes().await.unwrap().to_vec()
    }

    #[test]
    fn test_image_path_round_trip() {
        assert_eq!(image_path("local", "2024/a.jpg"), "local/2024/a.jpg");
        assert_eq!(image_path("flickr", "/65535/1_a_o.jpg"), "flickr/65535/1_a_o.jpg");

        assert_eq!(split_image_path("flickr/65535/1_a_o.jpg"), Some(("flickr", "65535/1_a_o.jpg")));
        assert_eq!(split_image_path("/local/a.jpg"), Some(("local", "a.jpg")));
        assert_eq!(split_image_path("local"), None);
        assert_eq!(split_image_path("local/"), None);
    }

    #[test]
    fn test_build_requires_sources() {
        assert!(matches!(ServingTable::build(&[]), Err(Error::NoSources)));
    }

    #[tokio::test]
    async fn test_dispatch_by_scheme() {
        let (local_source, _temp) = local(&[("a.jpg", "local bytes")]);
        let flickr: SourceHandle = Arc::new(StubSource {
            scheme: "flickr",
            files: vec![("123.jpg", b"flickr bytes")],
        });
        let table = ServingTable::build(&[local_source, flickr]).unwrap();

        assert_eq!(table.schemes().collect::<Vec<_>>(), vec!["flickr", "local"]);
        assert_eq!(read(&table, "local/a.jpg").await, b"local bytes");
        assert_eq!(read(&table, "flickr/123.jpg").await, b"flickr bytes");

        let err = table.open("unknown/x").await.unwrap_err();
        assert!(err.is_not_found());

        // Same file name, other scheme
        assert!(table.open("flickr/a.jpg").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_same_scheme_first_match_wins() {
        let (first, _t1) = local(&[("x.jpg", "first")]);
        let (second, _t2) = local(&[("x.jpg", "second"), ("y.jpg", "second only")]);
        let table = ServingTable::build(&[first, second]).unwrap();

        assert_eq!(table.schemes().count(), 1);
        assert_eq!(table.get("local").unwrap().backend_name(), "merged");
        assert_eq!(read(&table, "local/x.jpg").await, b"first");
        assert_eq!(read(&table, "local/y.jpg").await, b"second only");
    }

    #[tokio::test]
    async fn test_error_classification() {
        let stub: SourceHandle = Arc::new(StubSource {
            scheme: "stub",
            files: vec![],
        });
        let table = ServingTable::build(&[stub]).unwrap();

        assert!(table.open("stub/missing.jpg").await.unwrap_err().is_not_found());

        let err = table.open("stub/broken.jpg").await.unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_escape_attempt_is_not_found() {
        let (source, _temp) = local(&[("a.jpg", "a")]);
        let table = ServingTable::build(&[source]).unwrap();

        assert!(table.open("local/../etc/passwd").await.unwrap_err().is_not_found());
    }
}
