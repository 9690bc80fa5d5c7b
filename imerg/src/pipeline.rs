//! Composition of the extraction stages over an open dataset.

use serde::Serialize;

use crate::bounds::BoundingBox;
use crate::crop::{crop, CropDecision};
use crate::dataset::DatasetHandle;
use crate::error::Result;
use crate::grid::CroppedGrid;
use crate::orient::normalize;
use crate::schema::{SchemaResolution, SchemaTable};
use crate::sparse::SparsePointSet;

/// A dense grid plus the crop decision that produced it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub grid: CroppedGrid,
    pub decision: CropDecision,
}

/// Resolve, crop and orient the precipitation field of `handle`.
///
/// # Errors
///
/// Any error from [`SchemaTable::bind`], [`crop`] or [`normalize`].
pub fn extract_grid(
    handle: &DatasetHandle,
    table: &SchemaTable,
    bounds: &BoundingBox,
) -> Result<Extraction> {
    let binding = table.bind(&**handle)?;
    let cropped = crop(&**handle, &binding, bounds)?;
    let decision = cropped.decision.clone();
    let grid = normalize(cropped, &binding)?;

    tracing::debug!(
        path = %handle.path().display(),
        variable = binding.variable(),
        rows = grid.dim().0,
        cols = grid.dim().1,
        ?decision,
        "Extracted grid"
    );

    Ok(Extraction { grid, decision })
}

/// Stages 1 to 5: extract the grid and filter it at `threshold`.
pub fn extract_sparse(
    handle: &DatasetHandle,
    table: &SchemaTable,
    bounds: &BoundingBox,
    threshold: f32,
) -> Result<SparsePointSet> {
    let extraction = extract_grid(handle, table, bounds)?;
    Ok(SparsePointSet::from_grid(&extraction.grid, threshold))
}

/// Name, dimensions and shape of one variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
}

/// Summary of an opened dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub filename: String,
    /// Layout the dataset was opened with.
    pub layout: String,
    pub variables: Vec<VariableInfo>,
    pub coordinates: Vec<String>,
    /// Precipitation variable, if one of the candidates is present.
    pub variable: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Describe `handle` without reading any data.
pub fn inspect(handle: &DatasetHandle, table: &SchemaTable) -> DatasetInfo {
    let variables = handle
        .variable_names()
        .into_iter()
        .map(|name| {
            let dims = handle.dimensions(&name).unwrap_or_default();
            VariableInfo {
                dims: dims.iter().map(|d| d.name.clone()).collect(),
                shape: dims.iter().map(|d| d.len).collect(),
                name,
            }
        })
        .collect();

    let (variable, lat, lon) = match table.resolve(&**handle) {
        SchemaResolution::Resolved(binding) => (
            Some(binding.variable().to_string()),
            Some(binding.lat().to_string()),
            Some(binding.lon().to_string()),
        ),
        SchemaResolution::VariableNotFound => (None, None, None),
    };

    DatasetInfo {
        filename: handle
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        layout: handle.layout().to_string(),
        variables,
        coordinates: handle.coordinate_names(),
        variable,
        lat,
        lon,
    }
}
