//! Read-only dataset abstraction.
//!
//! The pipeline never talks to a file format directly. It sees a [`Dataset`]
//! (named variables with named dimensions, readable as `f32` arrays) obtained
//! from a [`DatasetBackend`]. Two backends ship with the crate:
//!
//! - [`MemoryBackend`]: datasets assembled in memory, keyed by filename.
//! - `NetcdfBackend` (feature `netcdf`): HDF5 / NetCDF-4 granules on disk.
//!
//! An open dataset is always wrapped in a [`DatasetHandle`], which releases
//! the underlying resources when dropped.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use ndarray::ArrayD;

use crate::error::{ImergError, Result};

/// Name of the group that IMERG HDF5 granules keep their data variables in.
pub const GRID_GROUP: &str = "Grid";

/// A named dimension of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dim {
    pub name: String,
    pub len: usize,
}

impl Dim {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
        }
    }
}

/// An open, read-only dataset.
pub trait Dataset: Send {
    /// Names of all variables, in dataset order.
    fn variable_names(&self) -> Vec<String>;

    /// Dimensions of `variable`, outermost first.
    fn dimensions(&self, variable: &str) -> Result<Vec<Dim>>;

    /// Read the full contents of `variable` as `f32`.
    ///
    /// Fill values are reported as NaN.
    fn read(&self, variable: &str) -> Result<ArrayD<f32>>;

    /// Whether a variable with this exact name exists.
    fn contains(&self, variable: &str) -> bool {
        self.variable_names().iter().any(|name| name == variable)
    }

    /// Names of coordinate variables, in dataset order.
    ///
    /// A coordinate is a one-dimensional variable whose only dimension has the
    /// variable's own name (the NetCDF convention).
    fn coordinate_names(&self) -> Vec<String> {
        self.variable_names()
            .into_iter()
            .filter(|name| {
                matches!(self.dimensions(name).as_deref(), Ok([dim]) if dim.name == *name)
            })
            .collect()
    }
}

/// Which on-disk layout a dataset was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Variables live in the [`GRID_GROUP`] group.
    Grouped,
    /// Variables live in the root group.
    Flat,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Grouped => write!(f, "grouped ({})", GRID_GROUP),
            Layout::Flat => write!(f, "flat"),
        }
    }
}

/// Owning handle to one open dataset.
///
/// The dataset is released exactly once, when the handle goes out of scope,
/// whichever way the surrounding code exits.
pub struct DatasetHandle {
    dataset: Box<dyn Dataset>,
    path: PathBuf,
    layout: Layout,
}

impl DatasetHandle {
    pub fn new(dataset: Box<dyn Dataset>, path: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            dataset,
            path: path.into(),
            layout,
        }
    }

    /// Path the dataset was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Layout that the successful open attempt used.
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl Deref for DatasetHandle {
    type Target = dyn Dataset;

    fn deref(&self) -> &Self::Target {
        self.dataset.as_ref()
    }
}

impl Drop for DatasetHandle {
    fn drop(&mut self) {
        tracing::debug!(
            path = %self.path.display(),
            layout = %self.layout,
            "Released dataset handle"
        );
    }
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .finish()
    }
}

/// Opens datasets from paths.
///
/// Implementations only report whether a given layout can be opened; the
/// grouped-then-flat policy lives in [`crate::open::open_dataset`].
pub trait DatasetBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Open `path` with its data variables taken from `group`.
    fn open_group(&self, path: &Path, group: &str) -> Result<Box<dyn Dataset>>;

    /// Open `path` with its data variables taken from the root group.
    fn open_flat(&self, path: &Path) -> Result<Box<dyn Dataset>>;
}

/// Backend used when no file format support was compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl UnavailableBackend {
    fn unavailable() -> ImergError {
        ImergError::Backend(
            "no dataset backend compiled in (enable the `netcdf` feature)".to_string(),
        )
    }
}

impl DatasetBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn open_group(&self, _path: &Path, _group: &str) -> Result<Box<dyn Dataset>> {
        Err(Self::unavailable())
    }

    fn open_flat(&self, _path: &Path) -> Result<Box<dyn Dataset>> {
        Err(Self::unavailable())
    }
}

#[derive(Debug, Clone)]
struct MemoryVariable {
    name: String,
    dims: Vec<String>,
    data: ArrayD<f32>,
}

/// A dataset held entirely in memory.
///
/// # Example
///
/// ```
/// use imerg::dataset::{Dataset, MemoryDataset};
/// use ndarray::array;
///
/// let ds = MemoryDataset::new()
///     .with_coordinate("lat", vec![-0.05, 0.05])
///     .with_coordinate("lon", vec![100.05, 100.15, 100.25])
///     .with_variable("precipitation", &["lon", "lat"], array![[1.0, 5.0], [2.0, 6.0], [3.0, 7.0]]);
///
/// assert!(ds.contains("precipitation"));
/// assert_eq!(ds.coordinate_names(), vec!["lat", "lon"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    variables: Vec<MemoryVariable>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a coordinate variable named after its own dimension.
    pub fn with_coordinate(self, name: &str, values: Vec<f32>) -> Self {
        let data = ndarray::Array1::from(values);
        self.with_variable(name, &[name], data)
    }

    /// Add a variable with the given dimension names, outermost first.
    ///
    /// A variable whose dimension count differs from the array rank is kept,
    /// but reports an error from [`Dataset::dimensions`].
    pub fn with_variable<D: ndarray::Dimension>(
        mut self,
        name: &str,
        dims: &[&str],
        data: ndarray::Array<f32, D>,
    ) -> Self {
        self.variables.retain(|v| v.name != name);
        self.variables.push(MemoryVariable {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data: data.into_dyn(),
        });
        self
    }

    fn variable(&self, name: &str) -> Result<&MemoryVariable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| ImergError::read(name, "no such variable"))
    }
}

impl Dataset for MemoryDataset {
    fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    fn dimensions(&self, variable: &str) -> Result<Vec<Dim>> {
        let var = self.variable(variable)?;
        if var.dims.len() != var.data.ndim() {
            return Err(ImergError::read(
                variable,
                format!(
                    "{} dimension names for a rank {} array",
                    var.dims.len(),
                    var.data.ndim()
                ),
            ));
        }
        Ok(var
            .dims
            .iter()
            .zip(var.data.shape())
            .map(|(name, &len)| Dim::new(name.clone(), len))
            .collect())
    }

    fn read(&self, variable: &str) -> Result<ArrayD<f32>> {
        Ok(self.variable(variable)?.data.clone())
    }
}

/// In-memory backend keyed by filename.
///
/// Each file can be registered under a group, as a flat dataset, or both,
/// which makes it possible to exercise the grouped-then-flat open policy
/// without touching a real file format. The path's final component is used
/// as the key; the file itself must still exist on disk for the opener's
/// existence check.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    grouped: HashMap<(String, String), MemoryDataset>,
    flat: HashMap<String, MemoryDataset>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dataset` as group `group` of `filename`.
    pub fn with_group(mut self, filename: &str, group: &str, dataset: MemoryDataset) -> Self {
        self.grouped
            .insert((filename.to_string(), group.to_string()), dataset);
        self
    }

    /// Register `dataset` as the root group of `filename`.
    pub fn with_flat(mut self, filename: &str, dataset: MemoryDataset) -> Self {
        self.flat.insert(filename.to_string(), dataset);
        self
    }

    fn key(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl DatasetBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn open_group(&self, path: &Path, group: &str) -> Result<Box<dyn Dataset>> {
        let key = (Self::key(path), group.to_string());
        match self.grouped.get(&key) {
            Some(ds) => Ok(Box::new(ds.clone())),
            None => Err(ImergError::Backend(format!(
                "group '{}' not found in {}",
                group, key.0
            ))),
        }
    }

    fn open_flat(&self, path: &Path) -> Result<Box<dyn Dataset>> {
        let key = Self::key(path);
        match self.flat.get(&key) {
            Some(ds) => Ok(Box::new(ds.clone())),
            None => Err(ImergError::Backend(format!("{} is not a dataset", key))),
        }
    }
}
