//! # ctrn-export
//!
//! Conversion des fichiers d'échange CTRN (Frioul-Vénétie Julienne) en couches
//! GeoJSON, avec fusion des fragments découpés par les tuiles.
//!
//! ## Usage CLI
//!
//! ```bash
//! # Gauss-Boaga (EPSG:3004), fusion activée
//! ctrn-export convert --input foglio.dat --output ./layers/
//!
//! # WGS84, sans fusion, rapport JSON
//! ctrn-export convert --input foglio.dat --output ./layers/ --wgs84 --no-merge --report report.json
//! ```

pub mod config;
pub mod export;
pub mod report;

pub use config::Config;
pub use export::GeoJsonSink;
pub use report::ConversionReport;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use ctrn::reproject::{GEOGRAPHIC_EPSG, PROJECTED_EPSG};
use tracing::info;

/// Convertit un fichier `.dat` en couches GeoJSON
pub fn convert_file(input: &Path, config: &Config) -> Result<ConversionReport> {
    let processing = config.processing()?;
    let output_dir = config.output_dir()?;
    let epsg = if processing.geographic {
        GEOGRAPHIC_EPSG
    } else {
        PROJECTED_EPSG
    };

    info!(
        "Converting {} to {} (EPSG:{}, merge={}, tolerance={}m)",
        input.display(),
        output_dir.display(),
        epsg,
        processing.merge_enabled,
        processing.tolerance
    );

    let start = Instant::now();
    let mut sink = GeoJsonSink::new(output_dir, config.overwrite)
        .context(format!("Failed to prepare output directory: {}", output_dir.display()))?;
    let summary = ctrn::convert_file(input, &processing, &mut sink)
        .context(format!("Failed to convert {}", input.display()))?;

    let mut report = ConversionReport::new(input, output_dir, epsg, processing.merge_enabled);
    report.record_summary(&summary);
    report.set_duration(start.elapsed());

    info!("{}", report.summary());
    Ok(report)
}
