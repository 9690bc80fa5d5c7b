//! GeoJSON export of sparse point sets.
//!
//! This module converts a [`SparsePointSet`] into a GeoJSON
//! `FeatureCollection` for GIS tooling. Enable the `geojson` feature to use
//! this module.
//!
//! # Example
//!
//! ```ignore
//! use imerg::geojson::points_to_feature_collection;
//!
//! let points = service.sparse_points(filename, &bounds, None)?;
//! let collection = points_to_feature_collection(&points, &bounds);
//! println!("{}", collection);
//! // {"type":"FeatureCollection","bbox":[95.0,-11.0,141.0,6.0],"features":[...]}
//! ```

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};

use crate::bounds::BoundingBox;
use crate::encode::{round_to, COORD_DECIMALS, VALUE_DECIMALS};
use crate::error::{ImergError, Result};
use crate::sparse::SparsePointSet;

/// Property name carrying the precipitation rate (mm/hr).
pub const PRECIPITATION_PROPERTY: &str = "precipitation";

/// Build a `Point` feature for one cell.
///
/// Coordinates are in GeoJSON order `[lon, lat]` and rounded like the JSON
/// payload.
pub fn point_feature(lat: f32, lon: f32, value: f32) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert(
        PRECIPITATION_PROPERTY.to_string(),
        round_to(value as f64, VALUE_DECIMALS).into(),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::Point(vec![
            round_to(lon as f64, COORD_DECIMALS),
            round_to(lat as f64, COORD_DECIMALS),
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Convert every point to a feature, in point order.
///
/// The collection's `bbox` is the request box as
/// `[west, south, east, north]`; the grid maximum and point count are kept
/// as foreign members `max_val` and `count`.
pub fn points_to_feature_collection(
    points: &SparsePointSet,
    bounds: &BoundingBox,
) -> FeatureCollection {
    let (south, north) = bounds.lat_range();
    let (west, east) = bounds.lon_range();

    let mut foreign_members = JsonObject::new();
    foreign_members.insert("count".to_string(), points.count().into());
    foreign_members.insert(
        "max_val".to_string(),
        round_to(points.max_val as f64, VALUE_DECIMALS).into(),
    );

    FeatureCollection {
        bbox: Some(vec![west, south, east, north]),
        features: points
            .iter()
            .map(|(lat, lon, val)| point_feature(lat, lon, val))
            .collect(),
        foreign_members: Some(foreign_members),
    }
}

/// Read points back from a collection built by
/// [`points_to_feature_collection`].
///
/// # Errors
///
/// Returns an error if a feature is not a `Point` with at least two
/// coordinates, or lacks a numeric precipitation property.
pub fn feature_collection_to_points(collection: &FeatureCollection) -> Result<SparsePointSet> {
    let mut points = SparsePointSet::default();

    for (i, feature) in collection.features.iter().enumerate() {
        let coord = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(GeoJsonValue::Point(coord)) if coord.len() >= 2 => coord,
            _ => {
                return Err(ImergError::MalformedPayload {
                    reason: format!("feature {} is not a Point", i),
                })
            }
        };
        let value = feature
            .property(PRECIPITATION_PROPERTY)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ImergError::MalformedPayload {
                reason: format!("feature {} has no numeric '{}'", i, PRECIPITATION_PROPERTY),
            })?;

        points.lons.push(coord[0] as f32);
        points.lats.push(coord[1] as f32);
        points.vals.push(value as f32);
    }

    points.max_val = collection
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("max_val"))
        .and_then(|v| v.as_f64())
        .map(|v| v as f32)
        .unwrap_or_else(|| points.vals.iter().copied().fold(0.0, f32::max));

    Ok(points)
}
