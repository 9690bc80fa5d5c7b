//! GPM granule filename utilities.
//!
//! This module validates caller-supplied filenames and extracts metadata
//! from IMERG granule names.
//!
//! # Filename Format
//!
//! IMERG granules follow the naming convention:
//! `{product}.MS.MRG.3IMERG.{YYYYMMDD}-S{HHMMSS}-E{HHMMSS}.{minutes}.{version}.{ext}`
//!
//! - Product: processing level and period (e.g., 3B-HHR, 3B-HHR-L, 3B-DAY)
//! - Start/end: UTC time of the half-hour window
//! - Minutes: minutes since 00:00 UTC of the start time
//! - Version: algorithm version (e.g., V07B)

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{ImergError, Result};

/// File extensions recognised as GPM datasets. Matching is case-sensitive.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = [".HDF5", ".nc", ".nc4"];

/// Whether `name` ends with one of [`SUPPORTED_EXTENSIONS`].
///
/// # Examples
///
/// ```
/// use imerg::filename::has_supported_extension;
///
/// assert!(has_supported_extension("3B-HHR.MS.MRG.3IMERG.20230815-S013000-E015959.0090.V07B.HDF5"));
/// assert!(has_supported_extension("merged.nc4"));
/// assert!(!has_supported_extension("notes.txt"));
/// assert!(!has_supported_extension("granule.hdf5"));
/// ```
pub fn has_supported_extension(name: &str) -> bool {
    SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Check that `name` is a bare file name inside the data directory.
///
/// Empty names, path separators and `..` are rejected.
///
/// # Errors
///
/// Returns [`ImergError::InvalidFilename`] if the name is not acceptable.
pub fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ImergError::InvalidFilename {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Metadata parsed from an IMERG granule filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Granule {
    /// Product code, e.g. `3B-HHR`.
    pub product: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Algorithm version, e.g. `V07B`.
    pub version: String,
}

impl Granule {
    /// Short human-readable label, e.g. `3B-HHR 2023-08-15 01:30-01:59 UTC (V07B)`.
    pub fn label(&self) -> String {
        format!(
            "{} {} {}-{} UTC ({})",
            self.product,
            self.start.format("%Y-%m-%d"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.version
        )
    }
}

/// Parse an IMERG granule filename.
///
/// # Arguments
///
/// * `filename` - The filename (with or without path)
///
/// # Returns
///
/// The parsed [`Granule`], or `None` if the name does not follow the IMERG
/// convention.
///
/// # Examples
///
/// ```
/// use imerg::filename::parse_granule;
///
/// let g = parse_granule("3B-HHR.MS.MRG.3IMERG.20230815-S013000-E015959.0090.V07B.HDF5").unwrap();
/// assert_eq!(g.product, "3B-HHR");
/// assert_eq!(g.version, "V07B");
/// assert_eq!(g.start.to_string(), "2023-08-15 01:30:00");
/// assert_eq!(g.end.to_string(), "2023-08-15 01:59:59");
///
/// assert!(parse_granule("merged.nc4").is_none());
/// ```
pub fn parse_granule(filename: &str) -> Option<Granule> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let parts: Vec<&str> = name.split('.').collect();
    // product, MS, MRG, 3IMERG, window, minutes, version, ext
    if parts.len() < 7 || !parts[3].ends_with("IMERG") {
        return None;
    }

    let product = parts[0];
    let version = parts[6];
    if product.is_empty() || !version.starts_with('V') {
        return None;
    }

    let (date, start, end) = parse_window(parts[4])?;
    let start = NaiveDateTime::new(date, start);
    let mut end = NaiveDateTime::new(date, end);
    if end < start {
        // window crosses midnight
        end += chrono::Duration::days(1);
    }

    Some(Granule {
        product: product.to_string(),
        start,
        end,
        version: version.to_string(),
    })
}

/// Parse `YYYYMMDD-SHHMMSS-EHHMMSS`.
fn parse_window(window: &str) -> Option<(NaiveDate, NaiveTime, NaiveTime)> {
    let mut fields = window.split('-');
    let date = NaiveDate::parse_from_str(fields.next()?, "%Y%m%d").ok()?;
    let start = NaiveTime::parse_from_str(fields.next()?.strip_prefix('S')?, "%H%M%S").ok()?;
    let end = NaiveTime::parse_from_str(fields.next()?.strip_prefix('E')?, "%H%M%S").ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((date, start, end))
}
