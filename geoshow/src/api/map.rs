//! Map configuration handed to the viewer via `/map.json`.
//!
//! Tile URIs are resolved once at startup:
//!
//! ```text
//! leaflet    <none>                    → https://tile.openstreetmap.org/{z}/{x}/{y}.png
//! leaflet    <any>                     → as given
//! protomaps  api://KEY                 → https://api.protomaps.com/tiles/v3/{z}/{x}/{y}.mvt?key=KEY
//! protomaps  file:///maps/world.pmtiles → /pmtiles/world.pmtiles (served from disk)
//! protomaps  http(s)://...             → as given
//! ```

use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use url::Url;

use crate::config::MapSettings;
use crate::error::{Error, Result};

pub const DEFAULT_LEAFLET_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const PROTOMAPS_API_TILES: &str = "https://api.protomaps.com/tiles/v3/{z}/{x}/{y}.mvt";

/// Route prefix under which a local `.pmtiles` archive is served.
pub const PMTILES_ROUTE: &str = "/pmtiles";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProtomapsOptions {
    pub theme: String,
}

/// A local tile archive exposed over HTTP.
#[derive(Debug, Clone, PartialEq)]
pub struct TileArchive {
    pub route: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MapConfig {
    pub provider: String,
    pub tile_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_style: Option<Value>,
    pub label_properties: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protomaps: Option<ProtomapsOptions>,
    #[serde(skip)]
    pub tile_archive: Option<TileArchive>,
}

impl MapConfig {
    pub fn from_settings(settings: &MapSettings) -> Result<Self> {
        let mut config = Self {
            provider: settings.provider.clone(),
            tile_url: String::new(),
            style: settings.style.clone(),
            point_style: settings.point_style.clone(),
            label_properties: settings.label_properties.clone(),
            protomaps: None,
            tile_archive: None,
        };

        match settings.provider.as_str() {
            "leaflet" => {
                config.tile_url = settings
                    .tile_uri
                    .clone()
                    .filter(|uri| !uri.is_empty())
                    .unwrap_or_else(|| DEFAULT_LEAFLET_TILES.to_string());
            }
            "protomaps" => {
                let raw = settings
                    .tile_uri
                    .as_deref()
                    .filter(|uri| !uri.is_empty())
                    .ok_or_else(|| Error::Config("protomaps provider requires a tile URI".into()))?;
                let (tile_url, archive) = resolve_protomaps(raw)?;
                config.tile_url = tile_url;
                config.tile_archive = archive;
                config.protomaps = Some(ProtomapsOptions {
                    theme: settings.protomaps_theme.clone(),
                });
            }
            other => {
                return Err(Error::Map(format!("unknown map provider '{}'", other)));
            }
        }

        Ok(config)
    }
}

fn resolve_protomaps(raw: &str) -> Result<(String, Option<TileArchive>)> {
    let url = Url::parse(raw).map_err(|e| Error::Map(format!("invalid tile URI: {}", e)))?;

    match url.scheme() {
        "api" => {
            let key = url
                .host_str()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| Error::Map("protomaps api URI is missing a key".into()))?;
            Ok((format!("{}?key={}", PROTOMAPS_API_TILES, key), None))
        }
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| Error::Map(format!("invalid tile archive path: {}", raw)))?;
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .filter(|name| name.ends_with(".pmtiles"))
                .ok_or_else(|| Error::Map(format!("not a .pmtiles archive: {}", raw)))?
                .to_string();
            let route = format!("{}/{}", PMTILES_ROUTE, name);
            Ok((route.clone(), Some(TileArchive { route, path })))
        }
        "http" | "https" => Ok((raw.to_string(), None)),
        other => Err(Error::Map(format!("unsupported protomaps tile scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(provider: &str, tile_uri: Option<&str>) -> MapSettings {
        MapSettings {
            provider: provider.to_string(),
            tile_uri: tile_uri.map(String::from),
            ..MapSettings::default()
        }
    }

    #[test]
    fn test_leaflet_default_tiles() {
        let config = MapConfig::from_settings(&MapSettings::default()).unwrap();
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "provider": "leaflet",
                "tile_url": DEFAULT_LEAFLET_TILES,
                "label_properties": []
            })
        );
    }

    #[test]
    fn test_leaflet_custom_tiles_and_styles() {
        let mut s = settings("leaflet", Some("https://tiles.example/{z}/{x}/{y}.png"));
        s.point_style = Some(json!({ "radius": 6 }));
        s.label_properties = vec!["image:path".into()];

        let value = serde_json::to_value(MapConfig::from_settings(&s).unwrap()).unwrap();
        assert_eq!(value["tile_url"], "https://tiles.example/{z}/{x}/{y}.png");
        assert_eq!(value["point_style"], json!({ "radius": 6 }));
        assert_eq!(value["label_properties"], json!(["image:path"]));
        assert!(value.get("style").is_none());
    }

    #[test]
    fn test_protomaps_api_key() {
        let config = MapConfig::from_settings(&settings("protomaps", Some("api://s3cr3t"))).unwrap();
        assert_eq!(
            config.tile_url,
            "https://api.protomaps.com/tiles/v3/{z}/{x}/{y}.mvt?key=s3cr3t"
        );
        assert_eq!(config.protomaps.unwrap().theme, "white");
        assert!(config.tile_archive.is_none());
    }

    #[test]
    fn test_protomaps_local_archive() {
        let config =
            MapConfig::from_settings(&settings("protomaps", Some("file:///maps/world.pmtiles")))
                .unwrap();
        assert_eq!(config.tile_url, "/pmtiles/world.pmtiles");
        let archive = config.tile_archive.unwrap();
        assert_eq!(archive.route, "/pmtiles/world.pmtiles");
        assert_eq!(archive.path, PathBuf::from("/maps/world.pmtiles"));
    }

    #[test]
    fn test_protomaps_errors() {
        assert!(matches!(
            MapConfig::from_settings(&settings("protomaps", None)),
            Err(Error::Config(_))
        ));
        assert!(MapConfig::from_settings(&settings("protomaps", Some("ftp://x/y"))).is_err());
        assert!(MapConfig::from_settings(&settings("protomaps", Some("file:///maps/world.mbtiles"))).is_err());
        assert!(MapConfig::from_settings(&settings("protomaps", Some("not a uri"))).is_err());
        assert!(matches!(
            MapConfig::from_settings(&settings("openlayers", None)),
            Err(Error::Map(_))
        ));
    }
}
