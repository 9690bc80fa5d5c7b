pub mod batch;
pub mod cloud;
pub mod grid;
pub mod info;
pub mod list;

use anyhow::{Context, Result};
use imerg::{ImergService, ImergServiceBuilder};
use std::path::PathBuf;

/// Build the service from `--data-dir`, falling back to the environment.
pub fn build_service(data_dir: Option<PathBuf>, threshold: f32) -> Result<ImergService> {
    let builder = match data_dir {
        Some(dir) => ImergServiceBuilder::new(dir),
        None => ImergServiceBuilder::from_env().context(
            "IMERG_DATA_DIR environment variable not set. Use --data-dir or set IMERG_DATA_DIR",
        )?,
    };

    let service = builder.threshold(threshold).build();
    if !service.data_dir().exists() {
        anyhow::bail!(
            "Data directory does not exist: {}",
            service.data_dir().display()
        );
    }
    Ok(service)
}
