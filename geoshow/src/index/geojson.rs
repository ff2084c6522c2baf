//! GeoJSON point features.
//!
//! Only what the viewer consumes: a `FeatureCollection` of `Point` features
//! with free-form properties. Coordinates are `[longitude, latitude]`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property holding `<scheme>/<normalized path>` of the photo a feature came from.
pub const IMAGE_PATH: &str = "image:path";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionType {
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
}

/// A WGS84 point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type")]
    kind: GeometryType,
    coordinates: [f64; 2],
}

impl Point {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: GeometryType::Point,
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// One located photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedFeature {
    #[serde(rename = "type")]
    kind: FeatureType,
    pub geometry: Point,
    pub properties: Map<String, Value>,
}

impl LocatedFeature {
    pub fn new(geometry: Point, image_path: impl Into<String>) -> Self {
        let mut properties = Map::new();
        properties.insert(IMAGE_PATH.to_string(), Value::String(image_path.into()));
        Self {
            kind: FeatureType::Feature,
            geometry,
            properties,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn image_path(&self) -> Option<&str> {
        self.properties.get(IMAGE_PATH).and_then(Value::as_str)
    }
}

/// The indexed photos of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: CollectionType,
    pub features: Vec<LocatedFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<LocatedFeature>) -> Self {
        Self {
            kind: CollectionType::FeatureCollection,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
