//! Spell Siege - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use siege_core::grid::Cell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "siege-tools")]
#[command(about = "Development tools for Spell Siege")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Print the search overlay of a unit on a saved board
    Overlay {
        /// Catalog RON file
        catalog: PathBuf,
        /// Save JSON file
        save: PathBuf,
        /// Column of the unit
        #[arg(long)]
        x: i32,
        /// Row of the unit
        #[arg(long)]
        y: i32,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match siege_tools::validate::validate_data_directory(&path) {
                Ok(report) => tracing::info!(
                    terrains = report.terrains,
                    unit_types = report.unit_types,
                    warnings = report.warnings.len(),
                    "Validation passed"
                ),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Overlay {
            catalog,
            save,
            x,
            y,
        } => match siege_tools::overlay::dump_files(&catalog, &save, Cell::new(x, y)) {
            Ok(dump) => {
                println!("mode: {}", dump.mode.label());
                print!("{}", dump.rows);
            }
            Err(e) => {
                tracing::error!("Overlay failed: {e}");
                std::process::exit(1);
            }
        },
    }
}
