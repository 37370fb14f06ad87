//! Point d'entrée CLI pour ctrn-export

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Convert the Friuli-Venezia Giulia CTRN to GeoJSON layers
#[derive(Parser)]
#[command(name = "ctrn-export")]
#[command(author, version)]
#[command(about = "Convert CTRN exchange files to GeoJSON layers")]
#[command(long_about = "Reads a CTRN .dat file, merges the fragments split at tile borders and writes one GeoJSON layer per category.\n\nCoordinates are Gauss-Boaga (EPSG:3004) by default, WGS84 with --wgs84.")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Convert(args) => {
            info!(input = %args.input.display(), wgs84 = args.wgs84, merge = !args.no_merge, "Conversion CTRN");
            cli::cmd_convert(args, cli.quiet)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
