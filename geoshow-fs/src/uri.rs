//! Source URI grammar.
//!
//! ```text
//! <scheme>://<provider-specific-path-or-query>
//!
//! ~/Pictures/2024                          no scheme: local directory
//! local:///data/photos                     local directory
//! s3://bucket/prefix?region=eu-west-1      object storage bucket
//! flickr://?client-uri=...&root=...        remote photo API
//! ```
//!
//! Before parsing, a [`Substitutions`] pass may replace `{token}`
//! placeholders in the raw string with externally supplied values, so that
//! credentials do not have to be spelled out in every source URI:
//!
//! ```
//! use geoshow_fs::Substitutions;
//!
//! let subs = Substitutions::new().with("flickr-client-uri", "api://?key=abc");
//! let raw = subs.apply("flickr://?client-uri={flickr-client-uri}&root=photoset_id%3D1");
//! assert_eq!(raw, "flickr://?client-uri=api%3A%2F%2F%3Fkey%3Dabc&root=photoset_id%3D1");
//! ```

use std::collections::HashMap;
use std::fmt;
use url::form_urlencoded;
use url::Url;

use crate::error::{FsError, Result};

/// Scheme implied by a URI without one.
pub const DEFAULT_SCHEME: &str = "local";

/// Token replaced with the configured Flickr client URI.
pub const FLICKR_CLIENT_TOKEN: &str = "flickr-client-uri";

/// Token replaced with the configured Flickr root query.
pub const FLICKR_ROOT_TOKEN: &str = "flickr-root-uri";

/// A parsed source URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUri {
    raw: String,
    scheme: String,
    rest: String,
}

impl SourceUri {
    /// Split a raw source string into scheme and remainder.
    ///
    /// The scheme is kept verbatim; matching against registered schemes is
    /// case-sensitive.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FsError::InvalidUri("empty source URI".to_string()));
        }

        match raw.split_once("://") {
            Some((scheme, rest)) => {
                if !is_valid_scheme(scheme) {
                    return Err(FsError::InvalidUri(raw.to_string()));
                }
                Ok(Self {
                    raw: raw.to_string(),
                    scheme: scheme.to_string(),
                    rest: rest.to_string(),
                })
            }
            None => Ok(Self {
                raw: raw.to_string(),
                scheme: DEFAULT_SCHEME.to_string(),
                rest: raw.to_string(),
            }),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything after `://`, or the whole string for scheme-less URIs.
    pub fn rest(&self) -> &str {
        &self.rest
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the URI was written with an explicit scheme.
    pub fn has_explicit_scheme(&self) -> bool {
        self.raw.contains("://")
    }

    /// Parse as a full URL.
    pub fn to_url(&self) -> Result<Url> {
        Url::parse(&self.raw).map_err(|e| FsError::InvalidUri(format!("{}: {}", self.raw, e)))
    }

    /// Decoded query parameters (last value wins for repeated keys).
    pub fn query_params(&self) -> HashMap<String, String> {
        match self.rest.split_once('?') {
            Some((_, query)) => form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            None => HashMap::new(),
        }
    }

    /// Filesystem-style path for local sources: `local:///abs`, `local://rel`
    /// and bare paths are all accepted. Only an explicit `local://` URI
    /// carries a query; a bare path is taken whole, `?` included.
    pub fn local_path(&self) -> String {
        let path = if self.has_explicit_scheme() {
            self.rest.split('?').next().unwrap_or_default()
        } else {
            self.rest.as_str()
        };
        if path.is_empty() {
            ".".to_string()
        } else {
            path.to_string()
        }
    }
}

impl fmt::Display for SourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

/// Placeholder substitution applied to raw source URIs before parsing.
///
/// Tokens are written `{name}`. A token found in the query part (after the
/// first `?`) is replaced with the percent-encoded value, so the decoded
/// parameter equals the supplied value; elsewhere it is replaced verbatim.
/// Tokens without a configured value are left as-is.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    tokens: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token. Empty values are ignored.
    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.tokens.push((format!("{{{}}}", token.into()), value));
        }
        self
    }

    /// Add a token when a value is present.
    pub fn with_optional(self, token: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(token, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Apply every configured token to `raw`.
    pub fn apply(&self, raw: &str) -> String {
        let mut out = raw.to_string();
        for (token, value) in &self.tokens {
            out = replace_token(&out, token, value);
        }
        out
    }
}

fn replace_token(raw: &str, token: &str, value: &str) -> String {
    let query_start = raw.find('?');
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;

    for (idx, _) in raw.match_indices(token) {
        out.push_str(&raw[last..idx]);
        match query_start {
            Some(q) if idx > q => out.extend(form_urlencoded::byte_serialize(value.as_bytes())),
            _ => out.push_str(value),
        }
        last = idx + token.len();
    }
    out.push_str(&raw[last..]);
    out
}
