use anyhow::Result;
use clap::{Parser, Subcommand};
use imerg::{BoundingBox, DEFAULT_THRESHOLD};
use std::path::PathBuf;

mod commands;

/// GPM IMERG precipitation extraction CLI tool
#[derive(Parser)]
#[command(name = "imerg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing IMERG granules
    #[arg(short, long, env = "IMERG_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Sparse threshold in mm/hr; cells must exceed it
    #[arg(
        short,
        long,
        env = "IMERG_THRESHOLD",
        default_value_t = DEFAULT_THRESHOLD,
        global = true
    )]
    threshold: f32,

    #[command(subcommand)]
    command: Commands,
}

/// Bounding box arguments shared by the extraction commands.
#[derive(clap::Args, Debug, Clone, Copy)]
struct BoxArgs {
    /// Northern edge latitude
    #[arg(long, allow_hyphen_values = true)]
    toplat: f64,

    /// Southern edge latitude
    #[arg(long, allow_hyphen_values = true)]
    bottomlat: f64,

    /// Western edge longitude
    #[arg(long, allow_hyphen_values = true)]
    leftlon: f64,

    /// Eastern edge longitude
    #[arg(long, allow_hyphen_values = true)]
    rightlon: f64,
}

impl BoxArgs {
    fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.toplat, self.bottomlat, self.leftlon, self.rightlon)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List granules in the data directory
    List,

    /// Display layout, variables and schema binding of a granule
    Info {
        /// Granule filename in the data directory
        filename: String,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Extract thresholded sparse points from a granule
    Cloud {
        /// Granule filename in the data directory
        filename: String,

        #[command(flatten)]
        bounds: BoxArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = commands::cloud::CloudFormat::Json)]
        format: commands::cloud::CloudFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the dense cropped grid as CSV (lat, lon, value)
    Grid {
        /// Granule filename in the data directory
        filename: String,

        #[command(flatten)]
        bounds: BoxArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize sparse extraction for every granule into a CSV file
    Batch {
        #[command(flatten)]
        bounds: BoxArgs,

        /// Output CSV file
        #[arg(short, long, default_value = "imerg_summary.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Library warnings (crop fallbacks, coordinate defaults) go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imerg=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => commands::list::run(cli.data_dir),
        Commands::Info { filename, json } => commands::info::run(cli.data_dir, filename, json),
        Commands::Cloud {
            filename,
            bounds,
            format,
            output,
        } => commands::cloud::run(
            cli.data_dir,
            cli.threshold,
            filename,
            bounds.bounds(),
            format,
            output,
        ),
        Commands::Grid {
            filename,
            bounds,
            output,
        } => commands::grid::run(cli.data_dir, filename, bounds.bounds(), output),
        Commands::Batch { bounds, output } => {
            commands::batch::run(cli.data_dir, cli.threshold, bounds.bounds(), output)
        }
    }
}
