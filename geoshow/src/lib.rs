//! Geotagged photo map server.
//!
//! Photos are read from any number of sources (local directories, object
//! storage buckets, Flickr), indexed concurrently into GeoJSON points and
//! served back to a map viewer over HTTP.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod index;
pub mod serving;

pub use app::{prepare, run, Prepared};
pub use error::{Error, Result};
pub use index::{FeatureCollection, Indexer, LocatedFeature};
pub use serving::ServingTable;
