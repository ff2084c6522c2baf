use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};

use crate::api::map::MapConfig;
use crate::api::server::AppState;

const NOT_FOUND: &str = "Not found";
const INTERNAL_ERROR: &str = "Internal server error";

fn plain(status: StatusCode, message: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], message).into_response()
}

/// HTTP-date as used by `Last-Modified`.
fn http_date(time: &DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// GET /features.geojson
pub async fn features(State(state): State<AppState>) -> Response {
    match serde_json::to_vec(&*state.features) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize features: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

/// GET /photos/<scheme>/<path>
pub async fn photo(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let file = match state.serving.open(&path).await {
        Ok(file) => file,
        Err(e) if e.is_not_found() => {
            tracing::debug!(path = %path, "Photo not found");
            return plain(StatusCode::NOT_FOUND, NOT_FOUND);
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to open photo");
            return plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR);
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let size = file.size;
    let modified = http_date(&file.modified);

    let mut response = Response::new(Body::from_stream(file.into_stream()));
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(size) = size {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }
    if let Ok(value) = HeaderValue::from_str(&modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    response
}

/// GET /map.json
pub async fn map(State(state): State<AppState>) -> Json<MapConfig> {
    Json((*state.map).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_http_date() {
        let time = Utc.with_ymd_and_hms(2024, 8, 31, 20, 7, 47).unwrap();
        assert_eq!(http_date(&time), "Sat, 31 Aug 2024 20:07:47 GMT");
    }
}
