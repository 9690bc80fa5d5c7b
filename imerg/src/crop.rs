//! Bounding-box cropping with fallback to the full extent.

use ndarray::{ArrayD, Axis};

use crate::bounds::BoundingBox;
use crate::dataset::Dataset;
use crate::error::{ImergError, Result};
use crate::schema::SchemaBinding;

/// How the cropper arrived at the field it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropDecision {
    /// The box selected at least one cell.
    CroppedOk,
    /// The selection was valid but empty; the full extent was used.
    FallbackToFull,
    /// The selection could not be made; the full extent was used.
    CropError(String),
}

impl CropDecision {
    /// Whether the full extent was returned instead of a crop.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, CropDecision::CroppedOk)
    }
}

/// A variable's values together with its dimension names.
#[derive(Debug, Clone)]
pub struct LabeledField {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f32>,
}

/// Output of [`crop`]: the selected field, its coordinates, and the decision.
#[derive(Debug, Clone)]
pub struct CropResult {
    pub decision: CropDecision,
    pub field: LabeledField,
    pub lats: Vec<f32>,
    pub lons: Vec<f32>,
}

struct Selection {
    lat_axis: usize,
    lon_axis: usize,
    lat_idx: Vec<usize>,
    lon_idx: Vec<usize>,
    lats: Vec<f32>,
    lons: Vec<f32>,
}

/// Crop the bound variable to `bounds`.
///
/// Both axes are selected together using inclusive `[min, max]` ranges built
/// from the box edges, so edge order never matters. A selection that fails,
/// or that contains no cells, is replaced by the full, uncropped variable.
/// Neither case is an error; the returned [`CropDecision`] records which one
/// happened.
///
/// # Errors
///
/// Only failures to read the variable itself, or (on the fallback path) its
/// coordinates, are returned.
pub fn crop(
    dataset: &dyn Dataset,
    binding: &SchemaBinding,
    bounds: &BoundingBox,
) -> Result<CropResult> {
    let name = binding.variable();
    let dims: Vec<String> = dataset
        .dimensions(name)?
        .into_iter()
        .map(|d| d.name)
        .collect();
    let data = dataset.read(name)?;

    let decision = match select(dataset, &dims, binding, bounds) {
        Ok(sel) => {
            let cropped = data
                .select(Axis(sel.lat_axis), &sel.lat_idx)
                .select(Axis(sel.lon_axis), &sel.lon_idx);

            if cropped.is_empty() {
                CropDecision::FallbackToFull
            } else {
                tracing::debug!(
                    variable = name,
                    lat_cells = sel.lat_idx.len(),
                    lon_cells = sel.lon_idx.len(),
                    "Cropped to bounding box"
                );
                return Ok(CropResult {
                    decision: CropDecision::CroppedOk,
                    field: LabeledField {
                        name: name.to_string(),
                        dims,
                        data: cropped,
                    },
                    lats: sel.lat_idx.iter().map(|&i| sel.lats[i]).collect(),
                    lons: sel.lon_idx.iter().map(|&i| sel.lons[i]).collect(),
                });
            }
        }
        Err(reason) => CropDecision::CropError(reason),
    };

    tracing::warn!(
        variable = name,
        bounds = ?bounds,
        decision = ?decision,
        "Crop selected nothing usable, serving full extent"
    );

    Ok(CropResult {
        decision,
        field: LabeledField {
            name: name.to_string(),
            dims,
            data,
        },
        lats: read_coordinate(dataset, binding.lat())?,
        lons: read_coordinate(dataset, binding.lon())?,
    })
}

fn select(
    dataset: &dyn Dataset,
    dims: &[String],
    binding: &SchemaBinding,
    bounds: &BoundingBox,
) -> std::result::Result<Selection, String> {
    let lat_axis = axis_of(dims, binding.lat())?;
    let lon_axis = axis_of(dims, binding.lon())?;
    if lat_axis == lon_axis {
        return Err(format!(
            "latitude and longitude both resolve to dimension '{}'",
            dims[lat_axis]
        ));
    }

    let lats = read_coordinate(dataset, binding.lat()).map_err(|e| e.to_string())?;
    let lons = read_coordinate(dataset, binding.lon()).map_err(|e| e.to_string())?;

    let (lat_min, lat_max) = bounds.lat_range();
    let (lon_min, lon_max) = bounds.lon_range();

    Ok(Selection {
        lat_axis,
        lon_axis,
        lat_idx: indices_within(&lats, lat_min, lat_max),
        lon_idx: indices_within(&lons, lon_min, lon_max),
        lats,
        lons,
    })
}

fn axis_of(dims: &[String], coordinate: &str) -> std::result::Result<usize, String> {
    dims.iter()
        .position(|d| d == coordinate)
        .ok_or_else(|| format!("'{}' is not a dimension of {:?}", coordinate, dims))
}

/// Indices of values inside the inclusive range; NaN never matches.
fn indices_within(values: &[f32], min: f64, max: f64) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| {
            let v = v as f64;
            v >= min && v <= max
        })
        .map(|(i, _)| i)
        .collect()
}

/// Read a one-dimensional coordinate variable.
pub(crate) fn read_coordinate(dataset: &dyn Dataset, name: &str) -> Result<Vec<f32>> {
    let values = dataset.read(name)?;
    if values.ndim() != 1 {
        return Err(ImergError::read(
            name,
            format!("coordinate has rank {}, expected 1", values.ndim()),
        ));
    }
    Ok(values.iter().copied().collect())
}
