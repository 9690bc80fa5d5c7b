//! Wire encodings for sparse point sets.
//!
//! # Binary layout
//!
//! All fields little-endian, no padding:
//!
//! | Offset | Size | Content |
//! |--------|------|---------|
//! | 0 | 4 | point count `n` (`u32`) |
//! | 4 | 4 | grid maximum (`f32`) |
//! | 8 | 4n | latitudes (`f32`) |
//! | 8 + 4n | 4n | longitudes (`f32`) |
//! | 8 + 8n | 4n | values (`f32`) |
//!
//! Total length is always `8 + 12n`.
//!
//! # JSON layout
//!
//! ```json
//! {"meta": {"count": 2, "max_val": 5.0, "bounds": {"top": 1.0, "bottom": -1.0, "left": 100.0, "right": 101.0}},
//!  "lats": [0.05, 0.15], "lons": [100.05, 100.05], "vals": [0.2, 5.0]}
//! ```
//!
//! Coordinates are rounded to 3 decimals and values to 2, which keeps the
//! payload small without visible loss at IMERG's 0.1° resolution.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::error::{ImergError, Result};
use crate::grid::CroppedGrid;
use crate::sparse::SparsePointSet;

/// Size of the binary header in bytes.
pub const HEADER_LEN: usize = 8;

/// Decimals kept for latitudes and longitudes in JSON.
pub const COORD_DECIMALS: i32 = 3;

/// Decimals kept for precipitation values in JSON.
pub const VALUE_DECIMALS: i32 = 2;

/// Sparse payload format requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Bin,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "bin" => Ok(Format::Bin),
            other => Err(format!("unknown format '{}', expected json or bin", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Bin => write!(f, "bin"),
        }
    }
}

/// `meta` object of the JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudMeta {
    pub count: usize,
    pub max_val: f64,
    pub bounds: BoundingBox,
}

/// JSON sparse payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudJson {
    pub meta: CloudMeta,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub vals: Vec<f64>,
}

/// A fully encoded pipeline result.
#[derive(Debug, Clone)]
pub enum EncodedResponse {
    /// Dense grid for rendering.
    DenseGrid(CroppedGrid),
    JsonSparse(CloudJson),
    BinarySparse(Bytes),
}

/// Round to `decimals` places, ties to even.
///
/// Idempotent: rounding an already rounded value again returns it unchanged.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

fn round_all(values: &[f32], decimals: i32) -> Vec<f64> {
    values
        .iter()
        .map(|&v| round_to(v as f64, decimals))
        .collect()
}

/// Build the JSON payload; `bounds` is echoed back unmodified.
pub fn to_json(points: &SparsePointSet, bounds: &BoundingBox) -> CloudJson {
    CloudJson {
        meta: CloudMeta {
            count: points.count(),
            max_val: round_to(points.max_val as f64, VALUE_DECIMALS),
            bounds: *bounds,
        },
        lats: round_all(&points.lats, COORD_DECIMALS),
        lons: round_all(&points.lons, COORD_DECIMALS),
        vals: round_all(&points.vals, VALUE_DECIMALS),
    }
}

/// Byte length of a binary payload holding `count` points.
pub fn binary_len(count: usize) -> usize {
    HEADER_LEN + 12 * count
}

/// Encode the binary payload.
pub fn to_binary(points: &SparsePointSet) -> Bytes {
    let count = points.count();
    let mut buf = BytesMut::with_capacity(binary_len(count));

    buf.put_u32_le(count as u32);
    buf.put_f32_le(points.max_val);
    for column in [&points.lats, &points.lons, &points.vals] {
        for &v in column.iter() {
            buf.put_f32_le(v);
        }
    }

    buf.freeze()
}

/// Decode a binary payload produced by [`to_binary`].
///
/// # Errors
///
/// Returns [`ImergError::MalformedPayload`] if the buffer is shorter than the
/// header or its length is not exactly `8 + 12·count`.
pub fn decode_binary(mut data: &[u8]) -> Result<SparsePointSet> {
    if data.len() < HEADER_LEN {
        return Err(ImergError::MalformedPayload {
            reason: format!("{} bytes is shorter than the header", data.len()),
        });
    }

    let count = data.get_u32_le() as usize;
    let max_val = data.get_f32_le();

    let expected = binary_len(count) - HEADER_LEN;
    if data.remaining() != expected {
        return Err(ImergError::MalformedPayload {
            reason: format!(
                "header declares {} points ({} bytes) but {} bytes follow",
                count,
                expected,
                data.remaining()
            ),
        });
    }

    let mut read_column = || (0..count).map(|_| data.get_f32_le()).collect::<Vec<_>>();
    let lats = read_column();
    let lons = read_column();
    let vals = read_column();

    Ok(SparsePointSet {
        lats,
        lons,
        vals,
        max_val,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> SparsePointSet {
        SparsePointSet {
            lats: vec![-6.2345, 1.5],
            lons: vec![106.8456, 107.25],
            vals: vec![0.2, 5.126],
            max_val: 12.345,
        }
    }

    #[test]
    fn test_binary_layout() {
        let bytes = to_binary(&points());
        assert_eq!(bytes.len(), 8 + 12 * 2);

        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &12.345f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(-6.2345f32).to_le_bytes());
        assert_eq!(&bytes[12..16], &1.5f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &106.8456f32.to_le_bytes());
        assert_eq!(&bytes[24..28], &0.2f32.to_le_bytes());
        assert_eq!(&bytes[28..32], &5.126f32.to_le_bytes());
    }

    #[test]
    fn test_binary_empty() {
        let empty = SparsePointSet {
            max_val: 3.0,
            ..Default::default()
        };
        let bytes = to_binary(&empty);
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[0..4], &0u32.to_le_bytes());

        let decoded = decode_binary(&bytes).unwrap();
        assert_eq!(decoded.count(), 0);
        assert_eq!(decoded.max_val, 3.0);
    }

    #[test]
    fn test_decode_consumes_exactly() {
        let original = points();
        let bytes = to_binary(&original);
        assert_eq!(decode_binary(&bytes).unwrap(), original);

        let mut extra = bytes.to_vec();
        extra.push(0);
        assert!(matches!(
            decode_binary(&extra),
            Err(ImergError::MalformedPayload { .. })
        ));

        assert!(decode_binary(&bytes[..bytes.len() - 1]).is_err());
        assert!(decode_binary(&bytes[..5]).is_err());
    }

    #[test]
    fn test_json_rounding_and_meta() {
        let bounds = BoundingBox::new(-5.0, -8.0, 105.0, 110.0);
        let json = to_json(&points(), &bounds);

        assert_eq!(json.meta.count, 2);
        assert_eq!(json.meta.max_val, 12.35);
        assert_eq!(json.meta.bounds, bounds);
        assert_eq!(json.lats, vec![-6.234, 1.5]);
        assert_eq!(json.lons, vec![106.846, 107.25]);
        assert_eq!(json.vals, vec![0.2, 5.13]);
    }

    #[test]
    fn test_json_shape() {
        let bounds = BoundingBox::new(10.0, 5.0, 100.0, 90.0);
        let value = serde_json::to_value(to_json(&points(), &bounds)).unwrap();

        assert_eq!(value["meta"]["count"], 2);
        assert_eq!(value["meta"]["bounds"]["top"], 10.0);
        assert_eq!(value["meta"]["bounds"]["right"], 90.0);
        assert_eq!(value["lats"].as_array().unwrap().len(), 2);
        assert_eq!(value["lons"].as_array().unwrap().len(), 2);
        assert_eq!(value["vals"][0], 0.2);
    }

    #[test]
    fn test_round_to_idempotent() {
        for v in [0.0, 0.2, 1.005, -6.2345, 106.8456, 12.345, 99.995, 1e-7] {
            for d in [2, 3] {
                let once = round_to(v, d);
                assert_eq!(round_to(once, d), once, "value {} decimals {}", v, d);
            }
        }
    }

    #[test]
    fn test_round_ties_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("BIN".parse::<Format>().unwrap(), Format::Bin);
        assert!("xml".parse::<Format>().is_err());
        assert_eq!(Format::default(), Format::Json);

        let f: Format = serde_json::from_str("\"bin\"").unwrap();
        assert_eq!(f, Format::Bin);
    }
}
