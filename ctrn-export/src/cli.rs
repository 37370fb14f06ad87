//! Définition et implémentation des commandes CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use ctrn_export::{convert_file, Config};

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a CTRN exchange file (.dat) to GeoJSON layers
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the CTRN .dat file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for the layers (default: env CTRN_OUTPUT_DIR)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write WGS84 coordinates (EPSG:4326) instead of Gauss-Boaga (EPSG:3004)
    #[arg(long)]
    pub wgs84: bool,

    /// Disable merging of tile-border fragments
    #[arg(long)]
    pub no_merge: bool,

    /// Border point matching tolerance in meters (default: 1)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Buffered features per layer before a partial flush (default: 2000)
    #[arg(long)]
    pub threshold: Option<usize>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Replace existing layers instead of appending
    #[arg(long)]
    pub overwrite: bool,

    /// Reprojection backend: lite or proj
    #[arg(long)]
    pub backend: Option<String>,

    /// Write the conversion report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl ConvertArgs {
    /// Configuration finale: fichier, environnement puis options
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        config.apply_env()?;

        if let Some(output) = &self.output {
            config.output_dir = Some(output.clone());
        }
        if self.wgs84 {
            config.wgs84 = true;
        }
        if self.no_merge {
            config.merge = false;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(threshold) = self.threshold {
            config.serialization_threshold = threshold;
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if let Some(backend) = &self.backend {
            config.backend = backend.clone();
        }
        Ok(config)
    }
}

/// Exécute la commande convert
pub fn cmd_convert(args: &ConvertArgs, quiet: bool) -> Result<()> {
    let config = args.resolve_config()?;
    let report = convert_file(&args.input, &config)?;

    if let Some(path) = &args.report {
        report.save_to_file(path)?;
        info!("Report written to {}", path.display());
    }
    if !quiet {
        report.display();
    }

    Ok(())
}
