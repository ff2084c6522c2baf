//! Core source trait definitions.
//!
//! The `PhotoSource` trait is the capability contract every adapter (local
//! directory, object-storage bucket, remote photo API) implements in full.
//! The indexer walks sources through it and the HTTP layer serves bytes
//! through it.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Shared handle to a constructed source.
pub type SourceHandle = Arc<dyn PhotoSource>;

/// Stream of entries produced by a recursive listing.
pub type EntryStream<'a> = BoxStream<'a, Result<SourceEntry>>;

/// Stream of file content chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// One item of a recursive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path in the adapter's own path semantics, openable with `open`
    pub path: String,
    /// Whether this entry is a directory (the indexer skips these)
    pub is_dir: bool,
    /// Size in bytes if known
    pub size: Option<u64>,
    /// Last modification time if known
    pub modified: Option<DateTime<Utc>>,
}

impl SourceEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size: None,
            modified: None,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            size: None,
            modified: None,
        }
    }
}

/// What an opened file represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Real content
    Regular,
    /// Zero-length marker for an aggregate listing entry; never carries a photo
    Placeholder,
}

/// An opened file: metadata plus a lazily consumed byte stream.
///
/// Dropping the value closes the underlying stream.
pub struct SourceFile {
    pub name: String,
    pub size: Option<u64>,
    pub modified: DateTime<Utc>,
    pub kind: FileKind,
    body: ByteStream,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, body: ByteStream) -> Self {
        Self {
            name: name.into(),
            size: None,
            modified: Utc::now(),
            kind: FileKind::Regular,
            body,
        }
    }

    /// A zero-length placeholder file, modified "now".
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: Some(0),
            modified: Utc::now(),
            kind: FileKind::Placeholder,
            body: stream::empty().boxed(),
        }
    }

    /// In-memory file, mostly useful for tests and small payloads.
    pub fn from_bytes(name: impl Into<String>, data: Bytes) -> Self {
        let size = data.len() as u64;
        Self::new(name, stream::once(async move { Ok(data) }).boxed()).with_size(Some(size))
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = modified;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == FileKind::Placeholder
    }

    /// Consume the file and collect its whole body.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = match self.size {
            Some(size) => BytesMut::with_capacity(size as usize),
            None => BytesMut::new(),
        };
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Consume the file, keeping only its body stream.
    pub fn into_stream(self) -> ByteStream {
        self.body
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("modified", &self.modified)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A geotagged photo source.
///
/// Each adapter implements every method; there are no inherited defaults.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the indexer opens files from many
/// tasks at once and the HTTP layer shares the same handles.
///
/// # Error Handling
///
/// Missing paths are reported as `FsError::NotFound` (possibly wrapped in
/// context), which the serving layer turns into a 404.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Provider kind of this source, used as the `image:path` prefix and as
    /// the serving-table bucket.
    fn scheme(&self) -> &str;

    /// Traversal starting point, in the adapter's own path semantics.
    fn root(&self) -> &str;

    /// Recursively list everything under `root`.
    fn list_stream<'a>(&'a self, root: &'a str) -> EntryStream<'a>;

    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// Returns `FsError::NotFound` if the path does not exist or is a directory.
    async fn open(&self, path: &str) -> Result<SourceFile>;

    /// Rewrite an internal path into its externally addressable form.
    fn normalize(&self, path: &str) -> Result<String>;

    /// Release long-lived resources (connections, bucket handles).
    async fn close(&self) -> Result<()>;

    /// Get the backend name for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
