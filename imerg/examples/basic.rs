//! Basic example demonstrating imerg library usage.
//!
//! Run with: cargo run --example basic --features netcdf -- /path/to/gpm/files

use imerg::filename::parse_granule;
use imerg::{BoundingBox, ImergError, ImergService};
use std::env;

fn main() -> Result<(), ImergError> {
    // Get data directory from command line
    let data_dir = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic --features netcdf -- /path/to/gpm/files");
        std::process::exit(1);
    });

    let service = ImergService::new(&data_dir);

    let files = service.list_files();
    println!("{} granules in {}", files.len(), data_dir);

    // Some rainy regions
    let regions = [
        ("Indonesia", BoundingBox::new(6.0, -11.0, 95.0, 141.0)),
        ("Amazon basin", BoundingBox::new(5.0, -15.0, -75.0, -50.0)),
        ("Bay of Bengal", BoundingBox::new(23.0, 5.0, 80.0, 95.0)),
    ];

    for filename in files.iter().take(3) {
        let label = parse_granule(filename)
            .map(|g| g.label())
            .unwrap_or_else(|| filename.clone());
        println!("\n{}", label);
        println!("{:-<50}", "");

        for (name, bounds) in &regions {
            match service.sparse_points(filename, bounds, None) {
                Ok(points) => {
                    println!(
                        "{}: {} raining cells, max {:.2} mm/hr",
                        name,
                        points.count(),
                        points.max_val
                    );
                }
                Err(ImergError::VariableNotFound { .. }) => {
                    println!("{}: no precipitation variable", name);
                }
                Err(e) => {
                    println!("{}: error - {}", name, e);
                }
            }
        }
    }

    Ok(())
}
