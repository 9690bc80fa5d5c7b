use anyhow::{Context, Result};
use clap::ValueEnum;
use imerg::encode::{to_binary, to_json};
use imerg::geojson::points_to_feature_collection;
use imerg::{BoundingBox, SparsePointSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use super::build_service;

/// Output encodings for the `cloud` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CloudFormat {
    /// Sparse JSON payload `{meta, lats, lons, vals}`
    Json,
    /// Little-endian binary payload
    Bin,
    /// GeoJSON FeatureCollection of points
    Geojson,
}

pub fn run(
    data_dir: Option<PathBuf>,
    threshold: f32,
    filename: String,
    bounds: BoundingBox,
    format: CloudFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let service = build_service(data_dir, threshold)?;
    let points = service
        .sparse_points(&filename, &bounds, None)
        .with_context(|| format!("Failed to extract {}", filename))?;

    let payload = encode(&points, &bounds, format)?;

    match &output {
        Some(path) => {
            let file = File::create(path).context("Failed to create output file")?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&payload)?;
            writer.flush()?;
            eprintln!(
                "{} points (max {:.2} mm/hr) written to: {}",
                points.count(),
                points.max_val,
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&payload)?;
            if format != CloudFormat::Bin {
                writeln!(stdout)?;
            }
            stdout.flush()?;
        }
    }

    Ok(())
}

fn encode(points: &SparsePointSet, bounds: &BoundingBox, format: CloudFormat) -> Result<Vec<u8>> {
    Ok(match format {
        CloudFormat::Json => serde_json::to_vec(&to_json(points, bounds))?,
        CloudFormat::Bin => to_binary(points).to_vec(),
        CloudFormat::Geojson => points_to_feature_collection(points, bounds)
            .to_string()
            .into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imerg::encode::decode_binary;

    fn points() -> SparsePointSet {
        SparsePointSet {
            lats: vec![0.05],
            lons: vec![100.15],
            vals: vec![5.0],
            max_val: 5.0,
        }
    }

    #[test]
    fn test_encode_formats() {
        let bounds = BoundingBox::new(1.0, -1.0, 100.0, 101.0);

        let json: serde_json::Value =
            serde_json::from_slice(&encode(&points(), &bounds, CloudFormat::Json).unwrap())
                .unwrap();
        assert_eq!(json["meta"]["count"], 1);

        let bin = encode(&points(), &bounds, CloudFormat::Bin).unwrap();
        assert_eq!(decode_binary(&bin).unwrap(), points());

        let geojson: serde_json::Value =
            serde_json::from_slice(&encode(&points(), &bounds, CloudFormat::Geojson).unwrap())
                .unwrap();
        assert_eq!(geojson["type"], "FeatureCollection");
        assert_eq!(geojson["features"][0]["properties"]["precipitation"], 5.0);
    }
}
