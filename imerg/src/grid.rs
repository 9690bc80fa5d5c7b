//! Cropped, (lat, lon)-oriented precipitation grids.

use ndarray::Array2;
use serde::Serialize;

use crate::error::{ImergError, Result};

/// A 2-D precipitation field indexed as `[lat][lon]`.
///
/// The shape of `values` always equals `(lats.len(), lons.len())`.
#[derive(Debug, Clone, PartialEq)]
pub struct CroppedGrid {
    lats: Vec<f32>,
    lons: Vec<f32>,
    values: Array2<f32>,
}

impl CroppedGrid {
    /// Build a grid, checking that `values` lines up with the coordinates.
    pub fn new(lats: Vec<f32>, lons: Vec<f32>, values: Array2<f32>) -> Result<Self> {
        if values.dim() != (lats.len(), lons.len()) {
            return Err(ImergError::ShapeMismatch {
                shape: values.shape().to_vec(),
                lat_len: lats.len(),
                lon_len: lons.len(),
            });
        }
        Ok(Self { lats, lons, values })
    }

    pub fn lats(&self) -> &[f32] {
        &self.lats
    }

    pub fn lons(&self) -> &[f32] {
        &self.lons
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// `(lat count, lon count)`.
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Maximum over all cells, ignoring NaN. `None` if no cell is a number.
    pub fn max_value(&self) -> Option<f32> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    /// Row-major copy of the values, one `Vec` per latitude.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.values.outer_iter().map(|row| row.to_vec()).collect()
    }

    /// Whether latitudes run south to north.
    pub fn lats_ascending(&self) -> bool {
        match (self.lats.first(), self.lats.last()) {
            (Some(first), Some(last)) => first <= last,
            _ => true,
        }
    }
}

/// JSON form of a dense grid: `{lats, lons, values}` with NaN as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenseGridJson {
    pub lats: Vec<f32>,
    pub lons: Vec<f32>,
    pub values: Vec<Vec<f32>>,
}

impl From<&CroppedGrid> for DenseGridJson {
    fn from(grid: &CroppedGrid) -> Self {
        Self {
            lats: grid.lats.clone(),
            lons: grid.lons.clone(),
            values: grid.to_rows(),
        }
    }
}
