//! High-level IMERG extraction service.
//!
//! This module provides [`ImergService`], which ties a data directory, a
//! dataset backend and the extraction pipeline together. Every call opens
//! its own dataset handle and releases it before returning; the service
//! itself holds no mutable state and can be shared freely across threads.
//!
//! # Example
//!
//! ```ignore
//! use imerg::{BoundingBox, Format, ImergServiceBuilder};
//!
//! let service = ImergServiceBuilder::new("/data/gpm").build();
//!
//! let bounds = BoundingBox::new(6.0, -11.0, 95.0, 141.0); // Indonesia
//! let payload = service.cloud_data(
//!     "3B-HHR.MS.MRG.3IMERG.20230815-S013000-E015959.0090.V07B.HDF5",
//!     &bounds,
//!     None,
//!     Format::Bin,
//! )?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bounds::BoundingBox;
use crate::dataset::{DatasetBackend, DatasetHandle};
use crate::encode::{to_binary, to_json, EncodedResponse, Format};
use crate::error::{ImergError, Result};
use crate::filename::has_supported_extension;
use crate::grid::CroppedGrid;
use crate::open::{open_dataset, resolve_path};
use crate::pipeline::{extract_grid, extract_sparse, inspect, DatasetInfo};
use crate::schema::SchemaTable;
use crate::sparse::{SparsePointSet, DEFAULT_THRESHOLD};

/// IMERG extraction over one data directory.
///
/// # Example
///
/// ```
/// use imerg::dataset::{MemoryBackend, MemoryDataset};
/// use imerg::{BoundingBox, ImergServiceBuilder};
/// use ndarray::array;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("a.nc4"), b"").unwrap();
///
/// let dataset = MemoryDataset::new()
///     .with_coordinate("lat", vec![0.05, 0.15])
///     .with_coordinate("lon", vec![10.05, 10.15])
///     .with_variable("precipitation", &["lat", "lon"], array![[0.0, 0.4], [2.0, 0.0]]);
///
/// let service = ImergServiceBuilder::new(dir.path())
///     .backend(MemoryBackend::new().with_flat("a.nc4", dataset))
///     .build();
///
/// let points = service
///     .sparse_points("a.nc4", &BoundingBox::new(1.0, 0.0, 10.0, 11.0), None)
///     .unwrap();
/// assert_eq!(points.count(), 2);
/// assert_eq!(points.max_val, 2.0);
/// ```
#[derive(Clone)]
pub struct ImergService {
    /// Directory containing granules.
    data_dir: PathBuf,
    backend: Arc<dyn DatasetBackend>,
    schema: SchemaTable,
    /// Threshold used when a call does not supply one.
    default_threshold: f32,
}

impl ImergService {
    /// Create a service for `data_dir` with the default backend and threshold.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        ImergServiceBuilder::new(data_dir).build()
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> ImergServiceBuilder {
        ImergServiceBuilder::new(data_dir)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn default_threshold(&self) -> f32 {
        self.default_threshold
    }

    /// Name of the dataset backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// List granule filenames in the data directory.
    ///
    /// Only regular files with a supported extension are returned, sorted.
    /// A missing or unreadable directory yields an empty list.
    pub fn list_files(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    data_dir = %self.data_dir.display(),
                    error = %e,
                    "Cannot read data directory"
                );
                return Vec::new();
            }
        };

        let mut files: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| has_supported_extension(name))
            .collect();
        files.sort();
        files
    }

    /// Open `filename` from the data directory.
    ///
    /// # Errors
    ///
    /// - [`ImergError::InvalidFilename`] for names that leave the directory
    /// - [`ImergError::FileNotFound`] if the file does not exist
    /// - [`ImergError::OpenFailure`] if no layout could be opened
    pub fn open(&self, filename: &str) -> Result<DatasetHandle> {
        let path = resolve_path(&self.data_dir, filename)?;
        open_dataset(self.backend.as_ref(), &path)
    }

    /// Dense grid of `filename` cropped to `bounds`.
    pub fn dense_grid(&self, filename: &str, bounds: &BoundingBox) -> Result<CroppedGrid> {
        let handle = self.open(filename)?;
        Ok(extract_grid(&handle, &self.schema, bounds)?.grid)
    }

    /// Sparse points of `filename` above `threshold` (or the default).
    pub fn sparse_points(
        &self,
        filename: &str,
        bounds: &BoundingBox,
        threshold: Option<f32>,
    ) -> Result<SparsePointSet> {
        let handle = self.open(filename)?;
        extract_sparse(
            &handle,
            &self.schema,
            bounds,
            threshold.unwrap_or(self.default_threshold),
        )
    }

    /// Sparse extraction encoded in `format`.
    pub fn cloud_data(
        &self,
        filename: &str,
        bounds: &BoundingBox,
        threshold: Option<f32>,
        format: Format,
    ) -> Result<EncodedResponse> {
        let points = self.sparse_points(filename, bounds, threshold)?;
        Ok(match format {
            Format::Json => EncodedResponse::JsonSparse(to_json(&points, bounds)),
            Format::Bin => EncodedResponse::BinarySparse(to_binary(&points)),
        })
    }

    /// Describe `filename` without extracting anything.
    pub fn inspect(&self, filename: &str) -> Result<DatasetInfo> {
        let handle = self.open(filename)?;
        Ok(inspect(&handle, &self.schema))
    }
}

impl fmt::Debug for ImergService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImergService")
            .field("data_dir", &self.data_dir)
            .field("backend", &self.backend.name())
            .field("default_threshold", &self.default_threshold)
            .finish()
    }
}

/// Builder for creating [`ImergService`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use imerg::ImergServiceBuilder;
///
/// let service = ImergServiceBuilder::new("/data/gpm")
///     .threshold(0.5)
///     .build();
/// ```
pub struct ImergServiceBuilder {
    data_dir: PathBuf,
    threshold: f32,
    backend: Option<Arc<dyn DatasetBackend>>,
    schema: SchemaTable,
}

impl ImergServiceBuilder {
    /// Create a new builder with the specified data directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            threshold: DEFAULT_THRESHOLD,
            backend: None,
            schema: SchemaTable::default(),
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `IMERG_DATA_DIR` | Directory containing granules | Required |
    /// | `IMERG_THRESHOLD` | Default sparse threshold in mm/hr | 0.1 |
    ///
    /// # Example
    ///
    /// ```bash
    /// export IMERG_DATA_DIR=/data/gpm
    /// export IMERG_THRESHOLD=0.5
    /// ```
    ///
    /// ```ignore
    /// use imerg::ImergServiceBuilder;
    ///
    /// let service = ImergServiceBuilder::from_env()?.build();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if `IMERG_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("IMERG_DATA_DIR").map_err(|_| {
            ImergError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "IMERG_DATA_DIR environment variable not set",
            ))
        })?;

        let threshold = std::env::var("IMERG_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|t| t.is_finite())
            .unwrap_or(DEFAULT_THRESHOLD);

        Ok(Self::new(data_dir).threshold(threshold))
    }

    /// Set the data directory.
    ///
    /// Overrides the directory set in the constructor or from environment.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the default sparse threshold.
    ///
    /// Default is 0.1 mm/hr.
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Use `backend` to open datasets.
    pub fn backend<B: DatasetBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Use a custom schema table.
    pub fn schema(mut self, schema: SchemaTable) -> Self {
        self.schema = schema;
        self
    }

    /// Build the [`ImergService`].
    pub fn build(self) -> ImergService {
        ImergService {
            data_dir: self.data_dir,
            backend: self.backend.unwrap_or_else(default_backend),
            schema: self.schema,
            default_threshold: self.threshold,
        }
    }
}

#[cfg(feature = "netcdf")]
fn default_backend() -> Arc<dyn DatasetBackend> {
    Arc::new(crate::netcdf_backend::NetcdfBackend::new())
}

#[cfg(not(feature = "netcdf"))]
fn default_backend() -> Arc<dyn DatasetBackend> {
    Arc::new(crate::dataset::UnavailableBackend)
}
