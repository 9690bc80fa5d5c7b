use anyhow::{Context, Result};
use imerg::filename::parse_granule;
use imerg::{BoundingBox, ImergService};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use super::build_service;

/// One CSV row per granule.
#[derive(Debug, Serialize)]
struct SummaryRecord {
    filename: String,
    start: String,
    end: String,
    count: usize,
    max_val: f32,
    mean_val: f32,
    error: String,
}

pub fn run(
    data_dir: Option<PathBuf>,
    threshold: f32,
    bounds: BoundingBox,
    output: PathBuf,
) -> Result<()> {
    let service = build_service(data_dir, threshold)?;
    let files = service.list_files();

    if files.is_empty() {
        println!(
            "No .HDF5, .nc or .nc4 files found in: {}",
            service.data_dir().display()
        );
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );

    let output_file = File::create(&output).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut failed = 0;
    for filename in &files {
        pb.set_message(filename.clone());
        let record = summarize(&service, filename, &bounds);
        if !record.error.is_empty() {
            failed += 1;
        }
        writer.serialize(record)?;
        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;

    println!(
        "{} files summarized ({} failed), output written to: {}",
        files.len(),
        failed,
        output.display()
    );
    Ok(())
}

/// Sparse summary of one granule; failures are recorded, not raised.
fn summarize(service: &ImergService, filename: &str, bounds: &BoundingBox) -> SummaryRecord {
    let (start, end) = match parse_granule(filename) {
        Some(g) => (g.start.to_string(), g.end.to_string()),
        None => (String::new(), String::new()),
    };

    let mut record = SummaryRecord {
        filename: filename.to_string(),
        start,
        end,
        count: 0,
        max_val: 0.0,
        mean_val: 0.0,
        error: String::new(),
    };

    match service.sparse_points(filename, bounds, None) {
        Ok(points) => {
            record.count = points.count();
            record.max_val = points.max_val;
            if !points.is_empty() {
                record.mean_val = points.vals.iter().sum::<f32>() / points.count() as f32;
            }
        }
        Err(e) => record.error = e.to_string(),
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use imerg::{ImergServiceBuilder, MemoryBackend, MemoryDataset};
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_summarize() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.nc4"), b"").unwrap();
        std::fs::write(temp_dir.path().join("b.nc4"), b"").unwrap();

        let ds = MemoryDataset::new()
            .with_coordinate("lat", vec![0.0, 1.0])
            .with_coordinate("lon", vec![10.0, 11.0])
            .with_variable("precipitation", &["lat", "lon"], array![[0.0, 1.0], [3.0, 0.05]]);
        let service = ImergServiceBuilder::new(temp_dir.path())
            .backend(MemoryBackend::new().with_flat("a.nc4", ds))
            .build();
        let bounds = BoundingBox::new(2.0, -1.0, 9.0, 12.0);

        let ok = summarize(&service, "a.nc4", &bounds);
        assert_eq!(ok.count, 2);
        assert_eq!(ok.max_val, 3.0);
        assert_eq!(ok.mean_val, 2.0);
        assert!(ok.error.is_empty());

        let failed = summarize(&service, "b.nc4", &bounds);
        assert_eq!(failed.count, 0);
        assert!(!failed.error.is_empty());
    }
}
