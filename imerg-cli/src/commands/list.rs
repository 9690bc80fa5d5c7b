use anyhow::Result;
use imerg::filename::parse_granule;
use std::fs;
use std::path::PathBuf;

use super::build_service;

pub fn run(data_dir: Option<PathBuf>) -> Result<()> {
    let service = build_service(data_dir, imerg::DEFAULT_THRESHOLD)?;
    let files = service.list_files();

    if files.is_empty() {
        println!(
            "No .HDF5, .nc or .nc4 files found in: {}",
            service.data_dir().display()
        );
        return Ok(());
    }

    let width = files.iter().map(|f| f.len()).max().unwrap_or(4).max(4);

    println!("{:<width$} {:>12}  {}", "FILE", "SIZE", "GRANULE", width = width);
    println!("{}", "-".repeat(width + 50));

    let mut total_size: u64 = 0;
    let mut labelled = 0;

    for filename in &files {
        let size = fs::metadata(service.data_dir().join(filename))
            .map(|m| m.len())
            .unwrap_or(0);
        total_size += size;

        let label = match parse_granule(filename) {
            Some(granule) => {
                labelled += 1;
                granule.label()
            }
            None => "-".to_string(),
        };

        println!(
            "{:<width$} {:>12}  {}",
            filename,
            format_size(size),
            label,
            width = width
        );
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Total files: {}", files.len());
    println!("  IMERG granules: {}", labelled);
    println!("  Total size: {}", format_size(total_size));
    println!("  Data directory: {}", service.data_dir().display());

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
