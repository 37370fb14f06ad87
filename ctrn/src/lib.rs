//! # ctrn
//!
//! Parser pour le format d'échange à largeur fixe de la CTRN (Carta Tecnica
//! Regionale Numerica) du Frioul-Vénétie Julienne.
//!
//! ## Features
//!
//! - Reconstruction des features (points, lignes, surfaces, étiquettes)
//!   à partir des enregistrements
//! - Fusion des fragments découpés par les tuiles, via les points de bord
//! - Mémoire bornée: écriture incrémentale dès qu'un buffer dépasse le seuil
//! - Reprojection Gauss-Boaga Est vers WGS84 en Rust pur (PROJ en option)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ctrn::{convert_file, MemorySink, ProcessingConfig};
//! use std::path::Path;
//!
//! let mut sink = MemorySink::new();
//! let summary = convert_file(Path::new("foglio.dat"), &ProcessingConfig::default(), &mut sink)?;
//! for layer in &summary.layers {
//!     println!("{}: {} features", layer.name, layer.stats.written);
//! }
//! ```

pub mod config;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod layer;
pub mod output;
pub mod parser;
pub mod point;
pub mod reproject;
pub mod simplify;
pub mod types;

pub use config::ProcessingConfig;
pub use error::CtrnError;
pub use feature::{Feature, FeatureId};
pub use geometry::{Coord3, FeatureGeometry, GeometryEngine, PlanarEngine};
pub use layer::{LayerStore, LayerSummary};
pub use output::{LayerInfo, MemorySink, OutputSink};
pub use parser::RecordParser;
pub use point::Point;
pub use reproject::{ReprojectionBackend, Reprojector};
pub use types::{AttributeValue, Attributes, FeatureKind, GeometryType, SimplifiedState};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

/// Résultat d'une conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionSummary {
    /// Lignes lues (terminateur compris)
    pub records: usize,
    /// Features fermées par le parser
    pub features: usize,
    /// Feature restée ouverte en fin d'entrée, ignorée
    pub unclosed_dropped: usize,
    /// Bilan par catégorie, dans l'ordre de création
    pub layers: Vec<LayerSummary>,
}

impl ConversionSummary {
    pub fn written(&self) -> usize {
        self.layers.iter().map(|l| l.stats.written).sum()
    }

    pub fn cancelled(&self) -> usize {
        self.layers.iter().map(|l| l.stats.cancelled).sum()
    }

    pub fn merges(&self) -> usize {
        self.layers.iter().map(|l| l.stats.merges).sum()
    }

    pub fn merge_failures(&self) -> usize {
        self.layers.iter().map(|l| l.stats.merge_failures).sum()
    }

    pub fn unresolved_border_points(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.stats.unresolved_border_points)
            .sum()
    }
}

/// Convertit un flux CTRN avec le moteur géométrique par défaut
pub fn convert<R: BufRead, S: OutputSink>(
    reader: R,
    config: &ProcessingConfig,
    sink: S,
) -> Result<ConversionSummary, CtrnError> {
    let engine = PlanarEngine::new(config.tolerance);
    convert_with_engine(reader, config, sink, engine)
}

/// Convertit un flux CTRN avec un moteur géométrique donné
pub fn convert_with_engine<R: BufRead, S: OutputSink, E: GeometryEngine>(
    mut reader: R,
    config: &ProcessingConfig,
    sink: S,
    engine: E,
) -> Result<ConversionSummary, CtrnError> {
    let mut store = LayerStore::with_engine(config.clone(), sink, engine)?;
    let mut record_parser = RecordParser::new(config.source_tag.clone());
    let mut summary = ConversionSummary::default();
    let mut buf = Vec::with_capacity(128);

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let line = parser::decode_line(&buf);
        summary.records += 1;
        if parser::is_terminator(&line) {
            debug!("Terminator reached at line {}", summary.records);
            break;
        }

        if let Some(feature) = record_parser.parse_record(&line)? {
            summary.features += 1;
            store.add_feature(feature)?;
        }
    }

    if let Some(feature) = record_parser.finish() {
        warn!(
            "Dropping unclosed feature {} at end of input ({} point(s))",
            feature.code(),
            feature.points().len()
        );
        summary.unclosed_dropped += 1;
    }

    let (_, layers) = store.finish()?;
    summary.layers = layers;

    info!(
        "{} records, {} features, {} written in {} layers ({} merges, {} merge failures, {} cancelled)",
        summary.records,
        summary.features,
        summary.written(),
        summary.layers.len(),
        summary.merges(),
        summary.merge_failures(),
        summary.cancelled()
    );

    Ok(summary)
}

/// Convertit un fichier `.dat`
pub fn convert_file<S: OutputSink>(
    path: &Path,
    config: &ProcessingConfig,
    sink: S,
) -> Result<ConversionSummary, CtrnError> {
    let file = File::open(path)?;
    debug!("Reading {}", path.display());
    convert(BufReader::new(file), config, sink)
}
