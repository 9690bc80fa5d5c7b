//! HDF5 / NetCDF-4 granules via the native netcdf library.
//!
//! Requires `libnetcdf` (built with HDF5 support) on the host. IMERG HDF5
//! granules are readable as NetCDF-4 files: their data variables live in the
//! `Grid` group, while NetCDF exports usually keep them in the root group.

use std::path::Path;

use ndarray::{ArrayD, IxDyn};

use crate::dataset::{Dataset, DatasetBackend, Dim};
use crate::error::{ImergError, Result};

/// Backend that opens files with [`netcdf::open`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfBackend;

impl NetcdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetBackend for NetcdfBackend {
    fn name(&self) -> &'static str {
        "netcdf"
    }

    fn open_group(&self, path: &Path, group: &str) -> Result<Box<dyn Dataset>> {
        let file = open(path)?;
        match file.group(group) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(ImergError::Backend(format!(
                    "group '{}' not found in {}",
                    group,
                    path.display()
                )))
            }
            Err(e) => {
                return Err(ImergError::Backend(format!(
                    "failed to open group '{}' in {}: {}",
                    group,
                    path.display(),
                    e
                )))
            }
        }

        Ok(Box::new(NetcdfDataset {
            file,
            group: Some(group.to_string()),
        }))
    }

    fn open_flat(&self, path: &Path) -> Result<Box<dyn Dataset>> {
        let file = open(path)?;
        Ok(Box::new(NetcdfDataset { file, group: None }))
    }
}

fn open(path: &Path) -> Result<netcdf::File> {
    netcdf::open(path).map_err(|e| {
        ImergError::Backend(format!("failed to open {}: {}", path.display(), e))
    })
}

/// An open NetCDF file, viewed through one of its groups.
///
/// The file is closed when this value is dropped.
pub struct NetcdfDataset {
    file: netcdf::File,
    /// `None` for the root group.
    group: Option<String>,
}

impl NetcdfDataset {
    fn with_variable<T>(
        &self,
        name: &str,
        f: impl FnOnce(&netcdf::Variable<'_>) -> Result<T>,
    ) -> Result<T> {
        match &self.group {
            Some(group_name) => {
                let group = self
                    .file
                    .group(group_name)
                    .map_err(|e| ImergError::read(name, e))?
                    .ok_or_else(|| ImergError::read(name, format!("group '{}' vanished", group_name)))?;
                let variable = group
                    .variable(name)
                    .ok_or_else(|| ImergError::read(name, "no such variable"))?;
                f(&variable)
            }
            None => {
                let variable = self
                    .file
                    .variable(name)
                    .ok_or_else(|| ImergError::read(name, "no such variable"))?;
                f(&variable)
            }
        }
    }
}

impl Dataset for NetcdfDataset {
    fn variable_names(&self) -> Vec<String> {
        match &self.group {
            Some(group_name) => match self.file.group(group_name) {
                Ok(Some(group)) => group.variables().map(|v| v.name()).collect(),
                _ => Vec::new(),
            },
            None => self.file.variables().map(|v| v.name()).collect(),
        }
    }

    fn dimensions(&self, variable: &str) -> Result<Vec<Dim>> {
        self.with_variable(variable, |var| {
            Ok(var
                .dimensions()
                .iter()
                .map(|d| Dim::new(d.name(), d.len()))
                .collect())
        })
    }

    fn read(&self, variable: &str) -> Result<ArrayD<f32>> {
        self.with_variable(variable, |var| {
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            let raw: Vec<f32> = var
                .get_values(..)
                .map_err(|e| ImergError::read(variable, e))?;

            let fill_value = get_f32_attr(var, "_FillValue")
                .or_else(|| get_f32_attr(var, "missing_value"));
            let scale_factor = get_f32_attr(var, "scale_factor").unwrap_or(1.0);
            let add_offset = get_f32_attr(var, "add_offset").unwrap_or(0.0);

            let values: Vec<f32> = raw
                .into_iter()
                .map(|v| match fill_value {
                    Some(fill) if v == fill => f32::NAN,
                    _ => v * scale_factor + add_offset,
                })
                .collect();

            tracing::debug!(variable, ?shape, fill_value, "Read NetCDF variable");

            ArrayD::from_shape_vec(IxDyn(&shape), values)
                .map_err(|e| ImergError::read(variable, e))
        })
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::GRID_GROUP;
    use tempfile::TempDir;

    fn write_granule(path: &Path, grouped: bool) {
        let mut file = netcdf::create(path).unwrap();
        let mut root = if grouped {
            file.add_group(GRID_GROUP).unwrap()
        } else {
            file.root_mut().unwrap()
        };

        root.add_dimension("lon", 3).unwrap();
        root.add_dimension("lat", 2).unwrap();

        root.add_variable::<f32>("lat", &["lat"])
            .unwrap()
            .put_values(&[-0.05f32, 0.05], ..)
            .unwrap();
        root.add_variable::<f32>("lon", &["lon"])
            .unwrap()
            .put_values(&[100.05f32, 100.15, 100.25], ..)
            .unwrap();

        {
            let mut precip = root
                .add_variable::<f32>("precipitation", &["lon", "lat"])
                .unwrap();
            precip.put_attribute("_FillValue", -9999.9f32).unwrap();
            precip
                .put_values(&[1.0f32, 5.0, 2.0, -9999.9, 3.0, 7.0], ..)
                .unwrap();
        }
    }

    #[test]
    fn test_open_grouped_granule() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("grouped.HDF5");
        write_granule(&path, true);

        let dataset = NetcdfBackend.open_group(&path, GRID_GROUP).unwrap();
        assert!(dataset.contains("precipitation"));
        assert_eq!(dataset.coordinate_names(), vec!["lat", "lon"]);

        let dims = dataset.dimensions("precipitation").unwrap();
        assert_eq!(dims, vec![Dim::new("lon", 3), Dim::new("lat", 2)]);

        let values = dataset.read("precipitation").unwrap();
        assert_eq!(values.shape(), &[3, 2]);
        assert_eq!(values[[0, 1]], 5.0);
        assert!(values[[1, 1]].is_nan());
    }

    #[test]
    fn test_flat_file_has_no_grid_group() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flat.nc4");
        write_granule(&path, false);

        assert!(NetcdfBackend.open_group(&path, GRID_GROUP).is_err());
        let dataset = NetcdfBackend.open_flat(&path).unwrap();
        assert!(dataset.contains("lat"));
    }

    #[test]
    fn test_not_a_dataset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("junk.nc");
        std::fs::write(&path, b"definitely not netcdf").unwrap();

        assert!(matches!(
            NetcdfBackend.open_flat(&path),
            Err(ImergError::Backend(_))
        ));
    }
}
