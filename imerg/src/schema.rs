//! Variable and coordinate name resolution.
//!
//! GPM producers do not agree on names: IMERG V06 half-hourly granules call
//! the calibrated field `precipitationCal`, V07 uses `precipitation`, and some
//! regridded NetCDF exports use `precip`. Coordinates vary between `lat`,
//! `latitude`, `Latitude` and so on. Resolution is driven by a
//! [`SchemaTable`], so supporting a new producer means extending the table.

use crate::dataset::Dataset;
use crate::error::{ImergError, Result};

/// Precipitation variable names, highest priority first.
pub const PRECIPITATION_CANDIDATES: &[&str] = &["precipitationCal", "precipitation", "precip"];

/// Matching rule for one coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateRule {
    /// Case-insensitive substring searched for in coordinate names.
    pub needle: &'static str,
    /// Name assumed when no coordinate matches.
    pub fallback: &'static str,
}

impl CoordinateRule {
    /// Pick the first coordinate whose lowercase name contains the needle.
    ///
    /// Returns the fallback name when nothing matches, even if the dataset
    /// has a coordinate under some other convention. The pipeline surfaces
    /// that case later as a read failure rather than guessing further.
    pub fn select(&self, coordinates: &[String]) -> (String, bool) {
        match coordinates
            .iter()
            .find(|name| name.to_lowercase().contains(self.needle))
        {
            Some(name) => (name.clone(), true),
            None => (self.fallback.to_string(), false),
        }
    }
}

pub const LATITUDE_RULE: CoordinateRule = CoordinateRule {
    needle: "lat",
    fallback: "lat",
};

pub const LONGITUDE_RULE: CoordinateRule = CoordinateRule {
    needle: "lon",
    fallback: "lon",
};

/// Names resolved for one open dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaBinding {
    variable: String,
    lat: String,
    lon: String,
}

impl SchemaBinding {
    pub fn new(
        variable: impl Into<String>,
        lat: impl Into<String>,
        lon: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            lat: lat.into(),
            lon: lon.into(),
        }
    }

    /// Precipitation variable name.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Latitude coordinate name.
    pub fn lat(&self) -> &str {
        &self.lat
    }

    /// Longitude coordinate name.
    pub fn lon(&self) -> &str {
        &self.lon
    }
}

/// Outcome of schema resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaResolution {
    Resolved(SchemaBinding),
    VariableNotFound,
}

/// Candidate names and matching rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaTable {
    pub variables: &'static [&'static str],
    pub lat: CoordinateRule,
    pub lon: CoordinateRule,
}

impl Default for SchemaTable {
    fn default() -> Self {
        Self {
            variables: PRECIPITATION_CANDIDATES,
            lat: LATITUDE_RULE,
            lon: LONGITUDE_RULE,
        }
    }
}

impl SchemaTable {
    /// Resolve names against `dataset`.
    ///
    /// The variable is the first candidate present, in table order.
    pub fn resolve(&self, dataset: &dyn Dataset) -> SchemaResolution {
        let variable = match self
            .variables
            .iter()
            .find(|candidate| dataset.contains(candidate))
        {
            Some(name) => *name,
            None => return SchemaResolution::VariableNotFound,
        };

        let coordinates = dataset.coordinate_names();
        let (lat, lat_matched) = self.lat.select(&coordinates);
        let (lon, lon_matched) = self.lon.select(&coordinates);

        if !lat_matched || !lon_matched {
            tracing::warn!(
                lat = %lat,
                lon = %lon,
                coordinates = ?coordinates,
                "No matching coordinate name, using literal default"
            );
        }

        SchemaResolution::Resolved(SchemaBinding::new(variable, lat, lon))
    }

    /// Resolve names, failing with [`ImergError::VariableNotFound`].
    pub fn bind(&self, dataset: &dyn Dataset) -> Result<SchemaBinding> {
        match self.resolve(dataset) {
            SchemaResolution::Resolved(binding) => {
                tracing::debug!(
                    variable = binding.variable(),
                    lat = binding.lat(),
                    lon = binding.lon(),
                    "Resolved schema"
                );
                Ok(binding)
            }
            SchemaResolution::VariableNotFound => Err(ImergError::VariableNotFound {
                candidates: self.variables.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}
