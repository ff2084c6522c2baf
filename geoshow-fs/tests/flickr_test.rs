//! Flickr source against a local mock of the REST API and static host.

#![cfg(feature = "flickr")]

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::TryStreamExt;
use geoshow_fs::{FsError, PhotoSource, SourceHandle, SourceRegistry, Substitutions};
use serde_json::{json, Value};
use std::collections::HashMap;

const API_KEY: &str = "test-key";
const ROOT: &str = "method=flickr.photosets.getPhotos&photoset_id=42";

async fn rest(
    State(base): State<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if params.get("api_key").map(String::as_str) != Some(API_KEY) {
        return Json(json!({ "stat": "fail", "code": 100, "message": "Invalid API Key" }));
    }
    assert_eq!(params.get("format").map(String::as_str), Some("json"));
    assert_eq!(params.get("nojsoncallback").map(String::as_str), Some("1"));

    let method = params.get("method").map(String::as_str).unwrap_or_default();
    let page = params.get("page").map(String::as_str).unwrap_or("1");

    let body = match (method, page) {
        ("flickr.photosets.getPhotos", "1") => {
            assert!(params["extras"].contains("lastupdate"));
            json!({
                "photoset": {
                    "id": "42", "page": 1, "pages": 2,
                    "photo": [
                        {
                            "id": "1",
                            "url_o": format!("{}/65535/1_aaa_o.jpg", base),
                            "url_b": format!("{}/65535/1_bbb_b.jpg", base),
                            "lastupdate": "1700000000"
                        },
                        { "id": "2", "title": "no urls" }
                    ]
                },
                "stat": "ok"
            })
        }
        ("flickr.photosets.getPhotos", "2") => json!({
            "photoset": {
                "id": "42", "page": 2, "pages": "2",
                "photo": [{ "id": "3", "url_b": format!("{}/65535/3_ccc_b.jpg", base) }]
            },
            "stat": "ok"
        }),
        ("flickr.photos.getInfo", _) if params.get("photo_id").map(String::as_str) == Some("1") => {
            json!({
                "photo": {
                    "id": "1", "server": "65535", "secret": "bbb",
                    "originalsecret": "aaa", "originalformat": "jpg"
                },
                "stat": "ok"
            })
        }
        ("flickr.photos.getInfo", _) if params.get("photo_id").map(String::as_str) == Some("3") => {
            json!({ "photo": { "id": "3", "server": "65535", "secret": "ccc" }, "stat": "ok" })
        }
        _ => json!({ "stat": "fail", "code": 1, "message": "Photo not found" }),
    };
    Json(body)
}

async fn static_photo(Path(file): Path<String>) -> impl IntoResponse {
    match file.as_str() {
        "1_aaa_o.jpg" => (
            StatusCode::OK,
            [(header::LAST_MODIFIED, "Sat, 31 Aug 2024 20:07:47 GMT")],
            b"original one".to_vec(),
        )
            .into_response(),
        "3_ccc_b.jpg" => (StatusCode::OK, b"large three".to_vec()).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the mock and return its base URL.
async fn start_mock() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let app = Router::new()
        .route("/services/rest/", get(rest))
        .route("/65535/:file", get(static_photo))
        .with_state(base.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    base
}

async fn flickr_source(base: &str, key: &str) -> SourceHandle {
    let client_uri = format!(
        "api://?key={}&endpoint={}/services/rest/&static-host={}",
        key, base, base
    );
    let substitutions = Substitutions::new()
        .with("flickr-client-uri", client_uri)
        .with("flickr-root-uri", ROOT);

    SourceRegistry::with_default_sources()
        .resolve_with(
            "flickr://?client-uri={flickr-client-uri}&root={flickr-root-uri}",
            &substitutions,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_listing_paginates_and_skips_photos_without_urls() {
    let base = start_mock().await;
    let source = flickr_source(&base, API_KEY).await;

    assert_eq!(source.scheme(), "flickr");
    assert_eq!(source.root(), ROOT);

    let entries: Vec<_> = source.list_stream(source.root()).try_collect().await.unwrap();
    let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            format!("{}/#/65535/1_aaa_o.jpg", ROOT),
            format!("{}/#/65535/3_ccc_b.jpg", ROOT),
        ]
    );
    assert_eq!(entries[0].modified.unwrap().timestamp(), 1_700_000_000);
    assert!(entries[1].modified.is_none());
}

#[tokio::test]
async fn test_open_listed_entry() {
    let base = start_mock().await;
    let source = flickr_source(&base, API_KEY).await;

    let listed = format!("{}/#/65535/1_aaa_o.jpg", ROOT);
    assert_eq!(source.normalize(&listed).unwrap(), "/65535/1_aaa_o.jpg");

    let file = source.open(&listed).await.unwrap();
    assert!(!file.is_placeholder());
    assert_eq!(file.size, Some(12));
    assert_eq!(file.modified.to_rfc3339(), "2024-08-31T20:07:47+00:00");
    assert_eq!(&file.bytes().await.unwrap()[..], b"original one");

    // The served form of the same photo
    let file = source.open("65535/1_aaa_o.jpg").await.unwrap();
    assert_eq!(&file.bytes().await.unwrap()[..], b"original one");
}

#[tokio::test]
async fn test_open_by_photo_id() {
    let base = start_mock().await;
    let source = flickr_source(&base, API_KEY).await;

    let original = source.open("1").await.unwrap();
    assert_eq!(&original.bytes().await.unwrap()[..], b"original one");

    // No original secret: falls back to the large size
    let large = source.open("3").await.unwrap();
    assert_eq!(&large.bytes().await.unwrap()[..], b"large three");

    let err = source.open("99").await.unwrap_err();
    assert!(matches!(err.root_cause(), FsError::Backend(_)));
}

#[tokio::test]
async fn test_open_aggregate_and_missing() {
    let base = start_mock().await;
    let source = flickr_source(&base, API_KEY).await;

    let placeholder = source.open(ROOT).await.unwrap();
    assert!(placeholder.is_placeholder());
    assert_eq!(placeholder.size, Some(0));

    let err = source.open("65535/9_zzz_o.jpg").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_bad_key_fails_listing() {
    let base = start_mock().await;
    let source = flickr_source(&base, "wrong").await;

    let err = source
        .list_stream(source.root())
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid API Key"));
}
