//! # IMERG - GPM Precipitation Extraction Library
//!
//! Crop GPM IMERG precipitation grids to a bounding box and encode them as
//! compact payloads for visualization clients.
//!
//! ## Features
//!
//! - **Tolerant**: Finds the precipitation variable and coordinates across
//!   IMERG versions and NetCDF exports
//! - **Safe Fallback**: Boxes outside the grid serve the full extent instead of failing
//! - **Compact**: Thresholded sparse points as JSON or a little-endian binary payload
//! - **Pluggable**: Datasets come from a [`DatasetBackend`]; HDF5 / NetCDF-4
//!   support via the `netcdf` feature, in-memory datasets for tests
//!
//! ## Quick Start
//!
//! ```ignore
//! use imerg::{BoundingBox, Format, ImergService};
//!
//! let service = ImergService::new("/data/gpm");
//! let bounds = BoundingBox::new(6.0, -11.0, 95.0, 141.0);
//!
//! // Dense (lat, lon) grid
//! let grid = service.dense_grid("3B-HHR.MS.MRG.3IMERG.20230815-S013000-E015959.0090.V07B.HDF5", &bounds)?;
//! println!("{} x {} cells", grid.dim().0, grid.dim().1);
//!
//! // Sparse points above 0.1 mm/hr
//! let points = service.sparse_points("3B-HHR.MS.MRG.3IMERG.20230815-S013000-E015959.0090.V07B.HDF5", &bounds, None)?;
//! println!("{} raining cells, max {} mm/hr", points.count(), points.max_val);
//! ```
//!
//! ## Pipeline
//!
//! 1. [`open`]: validate the filename, open the `Grid` group or the root group
//! 2. [`schema`]: pick the precipitation variable and coordinate names
//! 3. [`crop`]: select the bounding box, falling back to the full extent
//! 4. [`orient`]: squeeze and orient the field as `[lat][lon]`
//! 5. [`sparse`]: keep cells above a threshold
//! 6. [`encode`]: JSON or binary
//!
//! ## Binary Payload
//!
//! `u32` count, `f32` grid maximum, then `count` latitudes, `count`
//! longitudes and `count` values, all `f32`, little-endian. See [`encode`].

pub mod bounds;
pub mod crop;
pub mod dataset;
pub mod encode;
pub mod error;
pub mod filename;
pub mod grid;
pub mod open;
pub mod orient;
pub mod pipeline;
pub mod schema;
pub mod service;
pub mod sparse;

#[cfg(feature = "netcdf")]
pub mod netcdf_backend;

#[cfg(feature = "geojson")]
pub mod geojson;

// Re-export main types at crate root for convenience
pub use bounds::BoundingBox;
pub use crop::CropDecision;
pub use dataset::{Dataset, DatasetBackend, DatasetHandle, Layout, MemoryBackend, MemoryDataset};
pub use encode::{CloudJson, EncodedResponse, Format};
pub use error::{ErrorKind, ImergError, Result};
pub use filename::Granule;
pub use grid::{CroppedGrid, DenseGridJson};
pub use pipeline::DatasetInfo;
pub use schema::{SchemaBinding, SchemaTable};
pub use service::{ImergService, ImergServiceBuilder};
pub use sparse::{SparsePointSet, DEFAULT_THRESHOLD};

#[cfg(feature = "netcdf")]
pub use netcdf_backend::NetcdfBackend;
