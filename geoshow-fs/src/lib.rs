//! Pluggable photo sources for geoshow.
//!
//! This crate provides the `PhotoSource` trait every source adapter
//! implements, a registry resolving source URIs to adapters, and a merged
//! view used to serve several same-scheme sources as one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  Source URIs                                    │
//! │  ~/Pictures   s3://bucket/x   flickr://?...     │
//! │        │             │             │            │
//! │        └─────────────┼─────────────┘            │
//! │                      ▼                          │
//! │   Substitutions ─▶ SourceRegistry::resolve      │
//! │                      │                          │
//! │        ┌─────────────┼─────────────┐            │
//! │        ▼             ▼             ▼            │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐         │
//! │  │  Local   │ │   Blob   │ │  Flickr  │         │
//! │  └──────────┘ └──────────┘ └──────────┘         │
//! │        └──── PhotoSource (one trait) ──┘        │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use geoshow_fs::{SourceRegistry, Substitutions};
//!
//! # async fn example() -> geoshow_fs::Result<()> {
//! let registry = SourceRegistry::with_default_sources();
//! let sources = registry
//!     .resolve_all(&["./photos".to_string()], &Substitutions::new())
//!     .await?;
//!
//! for source in &sources {
//!     let mut entries = source.list_stream(source.root());
//!     while let Some(entry) = entries.try_next().await? {
//!         if !entry.is_dir {
//!             let bytes = source.open(&entry.path).await?.bytes().await?;
//!             println!("{}/{}: {} bytes", source.scheme(), entry.path, bytes.len());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `blob` - Object-storage buckets via `object_store` (default)
//! - `flickr` - Flickr photo API via `reqwest` (default)

mod error;
mod local;
mod merged;
mod path;
mod registry;
mod traits;
mod uri;

#[cfg(feature = "blob")]
mod blob;

#[cfg(feature = "flickr")]
pub mod flickr;

pub use error::{FsError, Result, ResultExt};
pub use local::LocalSource;
pub use merged::MergedSource;
pub use path::{clean_relative, join};
pub use registry::{close_all, LocalFactory, SourceFactory, SourceRegistry};
pub use traits::{
    ByteStream, EntryStream, FileKind, PhotoSource, SourceEntry, SourceFile, SourceHandle,
};
pub use uri::{SourceUri, Substitutions, DEFAULT_SCHEME, FLICKR_CLIENT_TOKEN, FLICKR_ROOT_TOKEN};

#[cfg(feature = "blob")]
pub use blob::{BlobSource, BLOB_SCHEMES};
#[cfg(feature = "blob")]
pub use registry::BlobFactory;

#[cfg(feature = "flickr")]
pub use flickr::{FlickrClient, FlickrSource};
#[cfg(feature = "flickr")]
pub use registry::FlickrFactory;

// Re-export bytes for convenience
pub use bytes::Bytes;
