//! Flickr photo API source.
//!
//! ```text
//! flickr://?client-uri=<client uri>&root=<listing query>
//!
//! flickr://?client-uri=api%3A%2F%2F%3Fkey%3D...&root=method%3Dflickr.photosets.getPhotos%26photoset_id%3D42
//! ```
//!
//! The root is not a path but the query of a paginated API method returning
//! a standard photos response. Listing yields one synthetic entry per photo,
//! `<root>/#<static path>`, which only turns into bytes when opened:
//!
//! ```text
//!   list_stream(root)                     open(entry)
//!   ┌──────────────────┐  entries   ┌───────────────────────────────┐
//!   │ paginated method │ ─────────▶ │ photo id?  → photos.getInfo   │
//!   │ + url_* extras   │            │ static path → GET static host │
//!   └──────────────────┘            │ otherwise  → placeholder file │
//!                                   └───────────────────────────────┘
//! ```

mod client;
mod reference;

pub use client::{FlickrClient, DEFAULT_API_ENDPOINT, DEFAULT_STATIC_HOST};
pub use reference::{derive_photo_path, is_photo_reference, matches_photo_url, normalize_reference};

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::form_urlencoded;

use crate::error::{FsError, Result, ResultExt};
use crate::traits::{EntryStream, PhotoSource, SourceEntry, SourceFile};
use crate::uri::SourceUri;

/// Photo size URLs requested when listing, best first.
/// See <https://www.flickr.com/services/api/misc.urls.html>.
pub const URL_EXTRAS: &[&str] = &["url_o", "url_4k", "url_f", "url_k", "url_b"];

const REQUIRED_EXTRAS: &[&str] = &["lastupdate"];

/// A remote Flickr collection exposed as a photo source.
#[derive(Debug, Clone)]
pub struct FlickrSource {
    client: FlickrClient,
    root: String,
}

impl FlickrSource {
    pub fn new(client: FlickrClient, root: impl Into<String>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    /// Build from a `flickr://?client-uri=...&root=...` URI.
    pub fn open_uri(uri: &SourceUri) -> Result<Self> {
        let params = uri.query_params();

        let client_uri = params
            .get("client-uri")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FsError::InvalidUri("flickr source is missing client-uri".to_string()))?;
        let root = params
            .get("root")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FsError::InvalidUri("flickr source is missing root".to_string()))?;

        let client = FlickrClient::from_uri(client_uri)
            .map_err(|e| e.context("create Flickr client", uri.scheme()))?;

        Ok(Self::new(client, root.as_str()))
    }

    /// Arguments for a listing call: the root query plus size/lastupdate extras.
    fn listing_args(root: &str) -> Vec<(String, String)> {
        let mut args: Vec<(String, String)> = form_urlencoded::parse(root.as_bytes())
            .into_owned()
            .collect();

        let mut extras: Vec<String> = match args.iter().position(|(k, _)| k == "extras") {
            Some(idx) => args
                .remove(idx)
                .1
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => URL_EXTRAS.iter().map(|s| s.to_string()).collect(),
        };
        args.retain(|(k, _)| k != "extras");

        for required in REQUIRED_EXTRAS {
            if !extras.iter().any(|e| e == required) {
                extras.push(required.to_string());
            }
        }

        args.push(("extras".to_string(), extras.join(",")));
        args
    }

    /// Turn one photo of a listing response into a synthetic entry.
    fn photo_entry(root: &str, photo: &Value) -> Option<SourceEntry> {
        let url_path = URL_EXTRAS.iter().find_map(|key| {
            let raw = photo.get(*key)?.as_str()?;
            let url = url::Url::parse(raw).ok()?;
            Some(url.path().to_string())
        })?;

        let modified = photo
            .get("lastupdate")
            .and_then(|v| match v {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            })
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Some(SourceEntry {
            path: format!("{}/#{}", root, url_path),
            is_dir: false,
            size: None,
            modified,
        })
    }

    /// Resolve an openable name to the static path of its photo asset.
    async fn static_path(&self, name: &str) -> Result<String> {
        if matches_photo_url(name) {
            let path = derive_photo_path(name)?;
            debug!(name = %name, path = %path, "Derived static path");
            return Ok(path);
        }

        let args = vec![
            ("method".to_string(), "flickr.photos.getInfo".to_string()),
            ("photo_id".to_string(), name.to_string()),
        ];
        let body = self.client.call(&args).await?;
        let photo = body
            .get("photo")
            .ok_or_else(|| FsError::Backend(format!("getInfo for {} has no photo", name)))?;

        let field = |key: &str| -> Option<String> {
            match photo.get(key)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };
        let required = |key: &str| -> Result<String> {
            field(key).ok_or_else(|| {
                FsError::Backend(format!("getInfo for {} is missing {}", name, key))
            })
        };

        let id = required("id")?;
        let server = required("server")?;

        let path = match (field("originalsecret"), field("originalformat")) {
            (Some(secret), Some(format)) if !secret.is_empty() => {
                format!("/{}/{}_{}_o.{}", server, id, secret, format)
            }
            _ => format!("/{}/{}_{}_b.jpg", server, id, required("secret")?),
        };
        Ok(path)
    }
}

fn parse_last_modified(value: Option<&reqwest::header::HeaderValue>) -> Option<DateTime<Utc>> {
    let raw = value?.to_str().ok()?;
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl PhotoSource for FlickrSource {
    fn scheme(&self) -> &str {
        "flickr"
    }

    fn root(&self) -> &str {
        &self.root
    }

    fn list_stream<'a>(&'a self, root: &'a str) -> EntryStream<'a> {
        Box::pin(try_stream! {
            let mut pages = self.client.paginate(Self::listing_args(root));

            while let Some(body) = pages.try_next().await.context("list", root)? {
                let photos = client::photo_container(&body)
                    .and_then(|c| c.get("photo"))
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        FsError::Backend("Failed to derive photos from response".to_string())
                    })?;

                for photo in photos {
                    match Self::photo_entry(root, photo) {
                        Some(entry) => {
                            yield entry;
                        }
                        None => {
                            let id = photo.get("id").and_then(Value::as_str).unwrap_or("?");
                            warn!(photo_id = %id, "Photo has no usable URL extra, skipping");
                        }
                    }
                }
            }
        })
    }

    #[instrument(skip(self), fields(name = %path))]
    async fn open(&self, path: &str) -> Result<SourceFile> {
        if !is_photo_reference(path) {
            debug!("Not a photo reference, returning placeholder");
            return Ok(SourceFile::placeholder(path));
        }

        let static_path = self.static_path(path).await.context("open", path)?;
        let response = self
            .client
            .fetch_static(&static_path)
            .await
            .context("open", path)?;

        let size = response.content_length();
        let last_modified = response.headers().get(reqwest::header::LAST_MODIFIED);
        let modified = match parse_last_modified(last_modified) {
            Some(t) => t,
            None => {
                debug!("Missing or unparseable Last-Modified, using now");
                Utc::now()
            }
        };

        let body = response.bytes_stream().map_err(FsError::from).boxed();

        Ok(SourceFile::new(path, body)
            .with_size(size)
            .with_modified(modified))
    }

    fn normalize(&self, path: &str) -> Result<String> {
        normalize_reference(path)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "flickr"
    }
}
