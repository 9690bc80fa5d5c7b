//! Orientation normalization of cropped fields.

use ndarray::{Axis, Ix2};

use crate::crop::{CropResult, LabeledField};
use crate::error::{ImergError, Result};
use crate::grid::CroppedGrid;
use crate::schema::SchemaBinding;

/// Turn a cropped field into a `[lat][lon]` grid.
///
/// Length-1 axes are dropped first, except the latitude and longitude axes
/// themselves, so a crop that is one cell tall stays two-dimensional. The
/// remaining field must be 2-D.
///
/// Axis order is taken from the dimension names when they identify both
/// axes. Otherwise a field shaped `(lon count, lat count)` is transposed,
/// square grids included, and any other shape is kept as is.
///
/// # Errors
///
/// - [`ImergError::UnsupportedRank`] if the squeezed field is not 2-D
/// - [`ImergError::ShapeMismatch`] if its shape fits neither orientation
pub fn normalize(crop: CropResult, binding: &SchemaBinding) -> Result<CroppedGrid> {
    let CropResult {
        field, lats, lons, ..
    } = crop;
    let field = squeeze(field, &[binding.lat(), binding.lon()]);

    let shape = field.data.shape().to_vec();
    if shape.len() != 2 {
        return Err(ImergError::UnsupportedRank {
            name: field.name,
            shape,
        });
    }

    let (lat_len, lon_len) = (lats.len(), lons.len());
    let by_name = if field.dims[0] == binding.lat() && field.dims[1] == binding.lon() {
        Some(false)
    } else if field.dims[0] == binding.lon() && field.dims[1] == binding.lat() {
        Some(true)
    } else {
        None
    };
    let transpose = by_name.unwrap_or(shape == [lon_len, lat_len]);

    let values = field
        .data
        .into_dimensionality::<Ix2>()
        .map_err(|_| ImergError::ShapeMismatch {
            shape: shape.clone(),
            lat_len,
            lon_len,
        })?;
    let values = if transpose {
        tracing::debug!(variable = %field.name, ?shape, "Transposing (lon, lat) field");
        values.reversed_axes().as_standard_layout().into_owned()
    } else {
        values
    };

    CroppedGrid::new(lats, lons, values)
}

/// Drop length-1 axes whose dimension name is not in `keep`.
fn squeeze(field: LabeledField, keep: &[&str]) -> LabeledField {
    let LabeledField {
        name,
        mut dims,
        mut data,
    } = field;

    for axis in (0..data.ndim()).rev() {
        if data.shape()[axis] == 1 && !keep.contains(&dims[axis].as_str()) {
            data = data.index_axis_move(Axis(axis), 0);
            dims.remove(axis);
        }
    }

    LabeledField { name, dims, data }
}
