//! GPS location extraction from EXIF metadata.
//!
//! Uses `kamadak-exif`, which understands JPEG, TIFF, HEIF, PNG and WebP
//! containers. Decoding is synchronous; callers run it on a blocking thread.

use exif::{In, Rational, Tag, Value};
use std::io::Cursor;
use thiserror::Error;

/// Coordinates are rounded to this many decimal places (~1mm).
pub const DECIMAL_PLACES: i32 = 8;

const LAT_MAX: f64 = 90.0;
const LON_MAX: f64 = 180.0;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Failed to decode EXIF data: {0}")]
    Exif(#[from] exif::Error),

    #[error("EXIF data has no GPS location")]
    Missing,

    #[error("Invalid {axis}: {reason}")]
    Invalid { axis: &'static str, reason: String },
}

/// A decoded WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Decode the GPS position embedded in an image.
pub fn decode_location(data: &[u8]) -> Result<Location, LocationError> {
    let exif = exif::Reader::new().read_from_container(&mut Cursor::new(data))?;

    let latitude = coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S', LAT_MAX, "latitude")?;
    let longitude = coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W', LON_MAX, "longitude")?;

    Ok(Location {
        latitude,
        longitude,
    })
}

fn coordinate(
    exif: &exif::Exif,
    tag: Tag,
    ref_tag: Tag,
    negative_ref: u8,
    max: f64,
    axis: &'static str,
) -> Result<f64, LocationError> {
    let field = exif.get_field(tag, In::PRIMARY).ok_or(LocationError::Missing)?;

    let parts = match &field.value {
        Value::Rational(parts) if !parts.is_empty() => parts,
        other => {
            return Err(LocationError::Invalid {
                axis,
                reason: format!("unexpected value {:?}", other),
            })
        }
    };

    let mut degrees = dms_to_degrees(parts);

    let negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Ascii(values) => values.first().and_then(|v| v.first()).copied(),
            _ => None,
        })
        .is_some_and(|r| r.eq_ignore_ascii_case(&negative_ref));
    if negative {
        degrees = -degrees;
    }

    if !degrees.is_finite() || degrees.abs() > max {
        return Err(LocationError::Invalid {
            axis,
            reason: format!("{} is out of range", degrees),
        });
    }

    Ok(round(degrees))
}

/// Degrees + minutes/60 + seconds/3600; missing trailing parts count as zero.
pub fn dms_to_degrees(parts: &[Rational]) -> f64 {
    [1.0, 60.0, 3600.0]
        .iter()
        .zip(parts)
        .map(|(div, part)| part.to_f64() / div)
        .sum()
}

fn round(value: f64) -> f64 {
    let factor = 10f64.powi(DECIMAL_PLACES);
    (value * factor).round() / factor
}
