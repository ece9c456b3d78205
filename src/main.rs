//! # geoharvest CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `geoharvest kyc` | Download a country's Know Your City settlements into a zipped shapefile |
//! | `geoharvest webmap` | Export the feature layers of an ArcGIS web-map JSON as GeoJSON |
//!
//! ## Examples
//!
//! ```bash
//! # All Nigerian settlements, half a second between page requests
//! geoharvest kyc --country Nigeria --sleep 0.5 --output out/kyc_nigeria
//!
//! # List what would be downloaded
//! geoharvest kyc --country Kenya --dry-run
//!
//! # Web map exported from ArcGIS Online
//! geoharvest webmap --input data/atlas_webmap.json --output-dir out/atlas
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use geoharvest::config::{self, Config};
use geoharvest::fetch::HttpFetcher;
use geoharvest::pipeline::{self, KycRunOptions};
use geoharvest::progress::ProgressMode;

/// geoharvest: extract settlement geometries from web payloads into GIS files.
///
/// Every option can also be set in a TOML file passed with `--config`;
/// command-line flags take precedence.
#[derive(Parser)]
#[command(
    name = "geoharvest",
    about = "Extract settlement geometries from web payloads into shapefile and GeoJSON",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML). Built-in defaults apply without one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a terminal, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download Know Your City settlements for one country.
    ///
    /// Reads the settlement list from the filter endpoint, fetches every
    /// settlement page, and writes `<output>.zip` with a polygon shapefile.
    Kyc {
        /// Country key as used by the filter endpoint (e.g. `Nigeria`).
        #[arg(long)]
        country: Option<String>,

        /// Output shapefile base name, without extension.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Seconds to sleep between settlement page requests.
        #[arg(long)]
        sleep: Option<f64>,

        /// Maximum number of settlements to download.
        #[arg(long)]
        limit: Option<usize>,

        /// List the discovered settlements without fetching their pages.
        #[arg(long)]
        dry_run: bool,
    },

    /// Export feature collection layers from an ArcGIS web-map JSON.
    Webmap {
        /// Path to the downloaded web-map definition.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Directory for the exported GeoJSON files.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Application id recorded in each file's metadata block.
        #[arg(long)]
        source_app_id: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    let reporter = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Kyc {
            country,
            output,
            sleep,
            limit,
            dry_run,
        } => {
            if let Some(country) = country {
                cfg.kyc.country = country;
            }
            if let Some(output) = output {
                cfg.kyc.output = output;
            }
            if let Some(sleep) = sleep {
                cfg.kyc.sleep_secs = sleep;
            }
            cfg.validate()?;

            let fetcher = HttpFetcher::new(&cfg.kyc)?;
            let options = KycRunOptions { limit, dry_run };
            pipeline::run_kyc(&cfg.kyc, &fetcher, &options, reporter.as_ref())?;
        }
        Commands::Webmap {
            input,
            output_dir,
            source_app_id,
        } => {
            if let Some(input) = input {
                cfg.webmap.input = input;
            }
            if let Some(output_dir) = output_dir {
                cfg.webmap.output_dir = output_dir;
            }
            if let Some(source_app_id) = source_app_id {
                cfg.webmap.source_app_id = source_app_id;
            }
            cfg.validate()?;

            pipeline::run_webmap(&cfg.webmap, reporter.as_ref())?;
        }
    }

    Ok(())
}
