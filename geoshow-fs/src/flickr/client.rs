//! Minimal Flickr REST client.

use async_stream::try_stream;
use futures::stream::BoxStream;
use reqwest::Client;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;
use url::Url;

use crate::error::{FsError, Result};
use crate::uri::SourceUri;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.flickr.com/services/rest/";
pub const DEFAULT_STATIC_HOST: &str = "https://live.staticflickr.com";

/// API-key authenticated Flickr client.
///
/// Built from a client URI:
///
/// ```text
/// api://?key=<api key>[&endpoint=<rest url>][&static-host=<url>]
/// ```
#[derive(Clone)]
pub struct FlickrClient {
    http: Client,
    api_key: String,
    endpoint: Url,
    static_host: Url,
}

impl FlickrClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            api_key: api_key.into(),
            endpoint: parse_url(DEFAULT_API_ENDPOINT)?,
            static_host: parse_url(DEFAULT_STATIC_HOST)?,
        })
    }

    /// Build a client from a client URI.
    pub fn from_uri(raw: &str) -> Result<Self> {
        let uri = SourceUri::parse(raw)?;
        if uri.scheme() != "api" {
            return Err(FsError::InvalidUri(format!(
                "unsupported Flickr client scheme '{}'",
                uri.scheme()
            )));
        }

        let params = uri.query_params();
        let key = params
            .get("key")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FsError::InvalidUri("Flickr client URI is missing 'key'".to_string()))?;

        let mut client = Self::new(key.as_str())?;
        if let Some(endpoint) = params.get("endpoint") {
            client.endpoint = parse_url(endpoint)?;
        }
        if let Some(host) = params.get("static-host") {
            client.static_host = parse_url(host)?;
        }
        Ok(client)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Call an API method and return the decoded response.
    ///
    /// `args` must include `method`.
    pub async fn call(&self, args: &[(String, String)]) -> Result<Value> {
        let method = args
            .iter()
            .find(|(k, _)| k == "method")
            .map(|(_, v)| v.clone())
            .ok_or_else(|| FsError::InvalidUri("Flickr API call is missing 'method'".to_string()))?;

        debug!(method = %method, "Calling Flickr API");

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(args)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("nojsoncallback", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FsError::Upstream {
                status: response.status().as_u16(),
                url: method,
            });
        }

        let body: Value = response.json().await?;

        if body.get("stat").and_then(Value::as_str) == Some("fail") {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(FsError::Backend(format!("{} failed: {}", method, message)));
        }

        Ok(body)
    }

    /// Call a paginated method, yielding one response per page.
    pub fn paginate<'a>(&'a self, args: Vec<(String, String)>) -> BoxStream<'a, Result<Value>> {
        Box::pin(try_stream! {
            let mut page: u64 = 1;
            loop {
                let mut page_args: Vec<(String, String)> =
                    args.iter().filter(|(k, _)| k != "page").cloned().collect();
                page_args.push(("page".to_string(), page.to_string()));

                let body = self.call(&page_args).await?;
                let pages = photo_container(&body).and_then(page_count).unwrap_or(1);
                yield body;

                if page >= pages {
                    break;
                }
                page += 1;
            }
        })
    }

    /// Resolve a static asset path against the static host. The host's own
    /// path (e.g. `http://proxy/flickr`) is kept as a prefix.
    fn static_url(&self, path: &str) -> Result<Url> {
        let mut base = self.static_host.clone();
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| FsError::MalformedReference(format!("{}: {}", path, e)))
    }

    /// Fetch a static photo asset by path (e.g. `/65535/123_abc_o.jpg`).
    pub async fn fetch_static(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.static_url(path)?;

        debug!(url = %url, "Fetching static photo");

        let response = self.http.get(url.clone()).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(FsError::Upstream {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl fmt::Debug for FlickrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlickrClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("static_host", &self.static_host.as_str())
            .finish()
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| FsError::InvalidUri(format!("{}: {}", raw, e)))
}

/// The first top-level object carrying a `photo` array, as in the
/// "standard photos response" (`photos`, `photoset`, ...).
pub fn photo_container(body: &Value) -> Option<&Map<String, Value>> {
    body.as_object()?
        .values()
        .filter_map(Value::as_object)
        .find(|obj| obj.get("photo").is_some_and(Value::is_array))
}

fn page_count(container: &Map<String, Value>) -> Option<u64> {
    match container.get("pages")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_uri() {
        let client =
            FlickrClient::from_uri("api://?key=abc&endpoint=http://127.0.0.1:9/rest/").unwrap();
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:9/rest/");
        assert_eq!(client.api_key, "abc");

        let client = FlickrClient::from_uri("api://?key=abc").unwrap();
        assert_eq!(client.endpoint().as_str(), DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_from_uri_rejects_bad_clients() {
        assert!(FlickrClient::from_uri("api://").is_err());
        assert!(FlickrClient::from_uri("oauth1://?consumer_key=x").is_err());
        assert!(FlickrClient::from_uri("api://?key=abc&endpoint=not a url").is_err());
    }

    #[test]
    fn test_static_url_keeps_host_prefix() {
        let client = FlickrClient::from_uri("api://?key=abc").unwrap();
        assert_eq!(
            client.static_url("/65535/1_aaa_o.jpg").unwrap().as_str(),
            "https://live.staticflickr.com/65535/1_aaa_o.jpg"
        );

        for host in ["http://proxy/flickr", "http://proxy/flickr/"] {
            let raw = format!("api://?key=abc&static-host={}", host);
            let client = FlickrClient::from_uri(&raw).unwrap();
            assert_eq!(
                client.static_url("/65535/1_aaa_o.jpg").unwrap().as_str(),
                "http://proxy/flickr/65535/1_aaa_o.jpg",
                "{host}"
            );
        }
    }

    #[test]
    fn test_debug_hides_key() {
        let client = FlickrClient::from_uri("api://?key=secret-key").unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }

    #[test]
    fn test_photo_container_and_pages() {
        let body = json!({
            "photoset": { "id": "42", "page": 1, "pages": "3", "photo": [] },
            "stat": "ok"
        });
        let container = photo_container(&body).unwrap();
        assert_eq!(page_count(container), Some(3));

        let body = json!({ "photos": { "pages": 2, "photo": [] } });
        assert_eq!(photo_container(&body).and_then(page_count), Some(2));

        assert!(photo_container(&json!({ "stat": "ok" })).is_none());
    }
}
