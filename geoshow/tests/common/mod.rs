//! Shared fixtures: minimal JPEG files carrying EXIF GPS tags.

#![allow(dead_code)]

use std::path::Path;

/// Degrees, minutes, seconds.
pub type Dms = (u32, u32, u32);

/// 37°48'0" N, 122°24'0" W
pub const SAN_FRANCISCO: (Dms, u8, Dms, u8) = ((37, 48, 0), b'N', (122, 24, 0), b'W');
pub const SAN_FRANCISCO_LON_LAT: [f64; 2] = [-122.4, 37.8];

/// 33°51'36" S, 151°12'36" E
pub const SYDNEY: (Dms, u8, Dms, u8) = ((33, 51, 36), b'S', (151, 12, 36), b'E');
pub const SYDNEY_LON_LAT: [f64; 2] = [151.21, -33.86];

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
    push_u16(buf, tag);
    push_u16(buf, kind);
    push_u32(buf, count);
    buf.extend_from_slice(&value);
}

fn wrap_jpeg(tiff: &[u8]) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    push_u16(&mut jpeg, (2 + 6 + tiff.len()) as u16);
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// A JPEG whose only metadata is a GPS position.
pub fn geotagged_jpeg((lat, lat_ref, lon, lon_ref): (Dms, u8, Dms, u8)) -> Vec<u8> {
    const IFD0: u32 = 8;
    const GPS_IFD: u32 = IFD0 + 2 + 12 + 4;
    const LAT_DATA: u32 = GPS_IFD + 2 + 4 * 12 + 4;
    const LON_DATA: u32 = LAT_DATA + 24;

    let mut tiff = b"MM\0\x2A".to_vec();
    push_u32(&mut tiff, IFD0);

    // IFD0: pointer to the GPS IFD
    push_u16(&mut tiff, 1);
    push_entry(&mut tiff, 0x8825, 4, 1, GPS_IFD.to_be_bytes());
    push_u32(&mut tiff, 0);

    // GPS IFD
    push_u16(&mut tiff, 4);
    push_entry(&mut tiff, 0x0001, 2, 2, [lat_ref, 0, 0, 0]);
    push_entry(&mut tiff, 0x0002, 5, 3, LAT_DATA.to_be_bytes());
    push_entry(&mut tiff, 0x0003, 2, 2, [lon_ref, 0, 0, 0]);
    push_entry(&mut tiff, 0x0004, 5, 3, LON_DATA.to_be_bytes());
    push_u32(&mut tiff, 0);

    for (d, m, s) in [lat, lon] {
        for part in [d, m, s] {
            push_u32(&mut tiff, part);
            push_u32(&mut tiff, 1);
        }
    }

    wrap_jpeg(&tiff)
}

/// A JPEG with EXIF data but no GPS position.
pub fn untagged_jpeg() -> Vec<u8> {
    let mut tiff = b"MM\0\x2A".to_vec();
    push_u32(&mut tiff, 8);
    // Orientation = 1
    push_u16(&mut tiff, 1);
    push_entry(&mut tiff, 0x0112, 3, 1, [0, 1, 0, 0]);
    push_u32(&mut tiff, 0);
    wrap_jpeg(&tiff)
}

/// Write `data` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}
