use anyhow::{Context, Result};
use imerg::filename::parse_granule;
use std::path::PathBuf;

use super::build_service;

pub fn run(data_dir: Option<PathBuf>, filename: String, json: bool) -> Result<()> {
    let service = build_service(data_dir, imerg::DEFAULT_THRESHOLD)?;
    let info = service
        .inspect(&filename)
        .with_context(|| format!("Failed to open {}", filename))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File:       {}", info.filename);
    if let Some(granule) = parse_granule(&filename) {
        println!("Granule:    {}", granule.label());
    }
    println!("Layout:     {}", info.layout);
    println!("Backend:    {}", service.backend_name());
    println!();

    println!("Variables:");
    for var in &info.variables {
        let dims: Vec<String> = var
            .dims
            .iter()
            .zip(&var.shape)
            .map(|(name, len)| format!("{}={}", name, len))
            .collect();
        println!("  {:<24} ({})", var.name, dims.join(", "));
    }
    println!();

    println!("Coordinates: {}", info.coordinates.join(", "));
    match (&info.variable, &info.lat, &info.lon) {
        (Some(variable), Some(lat), Some(lon)) => {
            println!("Binding:     {} on ({}, {})", variable, lat, lon);
        }
        _ => println!("Binding:     no precipitation variable"),
    }

    Ok(())
}
