use anyhow::{Context, Result};
use imerg::{BoundingBox, CroppedGrid};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use super::build_service;

pub fn run(
    data_dir: Option<PathBuf>,
    filename: String,
    bounds: BoundingBox,
    output: Option<PathBuf>,
) -> Result<()> {
    let service = build_service(data_dir, imerg::DEFAULT_THRESHOLD)?;
    let grid = service
        .dense_grid(&filename, &bounds)
        .with_context(|| format!("Failed to extract {}", filename))?;

    match &output {
        Some(path) => {
            let file = File::create(path).context("Failed to create output file")?;
            write_csv(&grid, file)?;
            let (rows, cols) = grid.dim();
            eprintln!(
                "{} x {} grid written to: {}",
                rows,
                cols,
                path.display()
            );
        }
        None => write_csv(&grid, io::stdout().lock())?,
    }

    Ok(())
}

/// Write one `lat,lon,value` record per cell, row-major; missing cells are empty.
fn write_csv<W: Write>(grid: &CroppedGrid, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["lat", "lon", "value"])?;

    for ((i, j), &value) in grid.values().indexed_iter() {
        let value = if value.is_nan() {
            String::new()
        } else {
            value.to_string()
        };
        writer.write_record([
            grid.lats()[i].to_string(),
            grid.lons()[j].to_string(),
            value,
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_write_csv() {
        let grid = CroppedGrid::new(
            vec![0.5, 1.5],
            vec![10.5],
            array![[2.5], [f32::NAN]],
        )
        .unwrap();

        let mut buf = Vec::new();
        write_csv(&grid, &mut buf).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "lat,lon,value\n0.5,10.5,2.5\n1.5,10.5,\n"
        );
    }
}
