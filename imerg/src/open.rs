//! Dataset opening with the grouped-then-flat fallback.

use std::path::{Path, PathBuf};

use crate::dataset::{DatasetBackend, DatasetHandle, Layout, GRID_GROUP};
use crate::error::{ImergError, Result};
use crate::filename::validate_filename;

/// Join a caller-supplied filename onto the data directory.
///
/// The filename must be a bare file name: empty names, path separators and
/// `..` components are rejected so a request can never leave `data_dir`.
pub fn resolve_path(data_dir: &Path, filename: &str) -> Result<PathBuf> {
    validate_filename(filename)?;
    Ok(data_dir.join(filename))
}

/// Open the dataset at `path`.
///
/// The `Grid` group layout used by IMERG HDF5 granules is tried first; if
/// that fails for any reason the file is reopened as a flat dataset. Time
/// variables are never decoded by either attempt.
///
/// # Errors
///
/// - [`ImergError::FileNotFound`] if `path` does not exist (checked before
///   any open attempt)
/// - [`ImergError::OpenFailure`] if both layouts fail, carrying both reasons
pub fn open_dataset(backend: &dyn DatasetBackend, path: &Path) -> Result<DatasetHandle> {
    if !path.exists() {
        return Err(ImergError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let grouped = match backend.open_group(path, GRID_GROUP) {
        Ok(dataset) => {
            tracing::debug!(
                path = %path.display(),
                backend = backend.name(),
                "Opened dataset with grouped layout"
            );
            return Ok(DatasetHandle::new(dataset, path, Layout::Grouped));
        }
        Err(e) => e,
    };

    tracing::debug!(
        path = %path.display(),
        error = %grouped,
        "Grouped layout unavailable, retrying as flat dataset"
    );

    match backend.open_flat(path) {
        Ok(dataset) => Ok(DatasetHandle::new(dataset, path, Layout::Flat)),
        Err(flat) => Err(ImergError::OpenFailure {
            path: path.to_path_buf(),
            grouped: grouped.to_string(),
            flat: flat.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MemoryBackend, MemoryDataset};
    use std::fs::File;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap();
        path
    }

    fn dataset() -> MemoryDataset {
        MemoryDataset::new().with_coordinate("lat", vec![0.0])
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        // Even a backend that knows the name must not be consulted.
        let backend = MemoryBackend::new().with_flat("gone.nc4", dataset());

        let result = open_dataset(&backend, &temp_dir.path().join("gone.nc4"));
        assert!(matches!(result, Err(ImergError::FileNotFound { .. })));
    }

    #[test]
    fn test_grouped_layout_preferred() {
        let temp_dir = TempDir::new().unwrap();
        let path = touch(temp_dir.path(), "both.HDF5");
        let backend = MemoryBackend::new()
            .with_group("both.HDF5", GRID_GROUP, dataset())
            .with_flat("both.HDF5", MemoryDataset::new());

        let handle = open_dataset(&backend, &path).unwrap();
        assert_eq!(handle.layout(), Layout::Grouped);
        assert!(handle.contains("lat"));
    }

    #[test]
    fn test_falls_back_to_flat() {
        let temp_dir = TempDir::new().unwrap();
        let path = touch(temp_dir.path(), "flat.nc4");
        let backend = MemoryBackend::new().with_flat("flat.nc4", dataset());

        let handle = open_dataset(&backend, &path).unwrap();
        assert_eq!(handle.layout(), Layout::Flat);
        assert_eq!(handle.path(), path.as_path());
    }

    #[test]
    fn test_both_layouts_fail() {
        let temp_dir = TempDir::new().unwrap();
        let path = touch(temp_dir.path(), "garbage.nc");
        let backend = MemoryBackend::new();

        match open_dataset(&backend, &path) {
            Err(ImergError::OpenFailure { grouped, flat, .. }) => {
                assert!(grouped.contains("Grid"));
                assert!(flat.contains("garbage.nc"));
            }
            other => panic!("Expected OpenFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_path() {
        let dir = Path::new("/data/gpm");
        assert_eq!(
            resolve_path(dir, "a.HDF5").unwrap(),
            PathBuf::from("/data/gpm/a.HDF5")
        );
        assert!(matches!(
            resolve_path(dir, "../a.HDF5"),
            Err(ImergError::InvalidFilename { .. })
        ));
        assert!(resolve_path(dir, "").is_err());
    }
}
