//! Embedded map viewer for geoshow
//!
//! The viewer is a static page that loads `/map.json` and
//! `/features.geojson` and shows each feature as a marker whose popup links
//! to `/photos/<image:path>`. Its assets are compiled into the binary.
//!
//! ## Development Mode
//!
//! If `SHOW_UI_DIR` names a directory, files are served from there instead
//! of the embedded copies, so the viewer can be edited without rebuilding.

use axum::{
    body::Body,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use rust_embed::Embed;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable pointing at an on-disk copy of the assets.
pub const UI_DIR_ENV: &str = "SHOW_UI_DIR";

#[derive(Embed)]
#[folder = "assets"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
#[include = "*.svg"]
#[include = "*.ico"]
struct EmbeddedAssets;

/// Viewer router. Every path it receives is treated as an asset request,
/// so merge it after the API routes:
///
/// ```ignore
/// let app = api_router.merge(geoshow_ui::ui_router());
/// ```
pub fn ui_router() -> Router {
    Router::new().fallback(serve_uri)
}

fn dev_ui_dir() -> Option<PathBuf> {
    let dir = PathBuf::from(std::env::var_os(UI_DIR_ENV)?);
    dir.is_dir().then_some(dir)
}

async fn serve_uri(uri: Uri) -> Response {
    serve_file(uri.path()).await
}

async fn serve_file(path: &str) -> Response {
    let path = path.trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    if let Some(dir) = dev_ui_dir() {
        let file_path = dir.join(path);
        if !path.contains("..") && file_path.is_file() {
            debug!("Serving from dev directory: {:?}", file_path);
            return serve_from_disk(&file_path).await;
        }
    }

    if let Some(content) = EmbeddedAssets::get(path) {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        debug!("Serving embedded asset: {} ({})", path, mime);
        return (
            [
                (header::CONTENT_TYPE, mime.as_ref().to_string()),
                (header::CACHE_CONTROL, cache_control_for(path).to_string()),
            ],
            Body::from(content.data.into_owned()),
        )
            .into_response();
    }

    // Unknown pages get the viewer itself; unknown files are 404
    if !path.contains('.') {
        if let Some(index) = EmbeddedAssets::get("index.html") {
            debug!("Fallback to index.html for: {}", path);
            return (
                [
                    (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                    (header::CACHE_CONTROL, cache_control_for("index.html")),
                ],
                Body::from(index.data.into_owned()),
            )
                .into_response();
        }
    }

    debug!("Asset not found: {}", path);
    not_found()
}

async fn serve_from_disk(file_path: &std::path::Path) -> Response {
    match tokio::fs::read(file_path).await {
        Ok(content) => {
            let mime = mime_guess::from_path(file_path).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate".to_string()),
                ],
                content,
            )
                .into_response()
        }
        Err(_) => not_found(),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not found",
    )
        .into_response()
}

/// Cache-control header for an asset path.
fn cache_control_for(path: &str) -> &'static str {
    if path.ends_with(".html") {
        "no-cache, must-revalidate"
    } else if path.ends_with(".js") || path.ends_with(".css") {
        "public, max-age=3600"
    } else {
        "public, max-age=86400"
    }
}
