//! Photo references understood by the Flickr source.
//!
//! A name is openable when it is either a numeric photo id or ends in the
//! path of a static photo asset, optionally as the fragment of a listing
//! query:
//!
//! ```text
//! 53371553927
//! /65535/53371553927_0b1a2c3d4e_o.jpg
//! method=flickr.photosets.getPhotos&photoset_id=42/#/65535/53371553927_0b1a2c3d4e_o.jpg
//! ```

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{FsError, Result};

static PHOTO_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+|(?:.*?#)?/?\d+/\d+_\w+_[a-z]\.\w+)$").expect("valid photo reference regex")
});

static PHOTO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#?(/?\d+/\d+_\w+_[a-z]\.\w+)$").expect("valid photo URL regex")
});

static STATIC_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?\d+/\d+_\w+_[a-z]\.\w+$").expect("valid static path regex")
});

/// Whether `name` can be resolved to a photo (numeric id or static path).
pub fn is_photo_reference(name: &str) -> bool {
    PHOTO_REFERENCE.is_match(name)
}

/// Whether `name` ends in a static photo path.
pub fn matches_photo_url(name: &str) -> bool {
    PHOTO_URL.is_match(name)
}

/// Extract the static photo path from `name`, with a leading `/`.
pub fn derive_photo_path(name: &str) -> Result<String> {
    let captures = PHOTO_URL
        .captures(name)
        .ok_or_else(|| FsError::MalformedReference(name.to_string()))?;
    let path = &captures[1];
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{}", path))
    }
}

/// Rewrite a listing path to the static path it refers to.
///
/// Paths carrying a `#` fragment must decode to a static path; anything
/// else that ends in one is rewritten, and all other paths pass through.
pub fn normalize_reference(path: &str) -> Result<String> {
    if let Some((_, fragment)) = path.rsplit_once('#') {
        if !STATIC_PATH.is_match(fragment) {
            return Err(FsError::MalformedReference(path.to_string()));
        }
        return derive_photo_path(fragment);
    }

    if matches_photo_url(path) {
        derive_photo_path(path)
    } else {
        Ok(path.to_string())
    }
}
