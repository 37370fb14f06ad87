//! Rapport de conversion

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use ctrn::{ConversionSummary, LayerSummary};

/// Statistiques d'une couche
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerReport {
    pub name: String,
    pub geometry_type: String,
    /// Features écrites
    pub written: usize,
    /// Features annulées à la source
    pub cancelled: usize,
    /// Fusions réussies
    pub merges: usize,
    /// Fusions refusées (fragments conservés)
    pub merge_failures: usize,
    /// Flushs partiels
    pub partial_flushes: usize,
    /// Points de bord restés sans correspondance
    pub unresolved_border_points: usize,
}

impl From<&LayerSummary> for LayerReport {
    fn from(layer: &LayerSummary) -> Self {
        Self {
            name: layer.name.clone(),
            geometry_type: layer.geometry_type.name().to_string(),
            written: layer.stats.written,
            cancelled: layer.stats.cancelled,
            merges: layer.stats.merges,
            merge_failures: layer.stats.merge_failures,
            partial_flushes: layer.stats.partial_flushes,
            unresolved_border_points: layer.stats.unresolved_border_points,
        }
    }
}

/// Rapport complet d'une conversion
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    /// Fichier source
    pub input: String,
    /// Répertoire des couches
    pub output_dir: String,
    /// EPSG des coordonnées écrites
    pub epsg: u32,
    /// Fusion activée
    pub merge_enabled: bool,
    /// Durée de la conversion
    pub duration_secs: f64,

    /// Lignes lues
    pub records: usize,
    /// Features fermées par le parser
    pub features: usize,
    /// Features écrites
    pub written: usize,
    /// Features annulées
    pub cancelled: usize,
    /// Fusions réussies
    pub merges: usize,
    /// Fusions refusées
    pub merge_failures: usize,
    /// Feature ouverte en fin de fichier, ignorée
    pub unclosed_dropped: usize,
    /// Points de bord sans correspondance
    pub unresolved_border_points: usize,

    /// Détail par couche, dans l'ordre de création
    pub layers: Vec<LayerReport>,
}

impl ConversionReport {
    pub fn new(input: &Path, output_dir: &Path, epsg: u32, merge_enabled: bool) -> Self {
        Self {
            input: input.display().to_string(),
            output_dir: output_dir.display().to_string(),
            epsg,
            merge_enabled,
            ..Default::default()
        }
    }

    /// Reprend les compteurs du bilan de conversion
    pub fn record_summary(&mut self, summary: &ConversionSummary) {
        self.records = summary.records;
        self.features = summary.features;
        self.written = summary.written();
        self.cancelled = summary.cancelled();
        self.merges = summary.merges();
        self.merge_failures = summary.merge_failures();
        self.unclosed_dropped = summary.unclosed_dropped;
        self.unresolved_border_points = summary.unresolved_border_points();
        self.layers = summary.layers.iter().map(LayerReport::from).collect();
    }

    /// Définit la durée de la conversion
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("CONVERSION REPORT - {}", self.input);
        println!("{}", "=".repeat(60));

        println!("\nOutput: {} (EPSG:{})", self.output_dir, self.epsg);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Records: {}, features: {}, written: {}, cancelled: {}",
            self.records, self.features, self.written, self.cancelled
        );
        if self.merge_enabled {
            println!(
                "Merges: {} ({} failed), border points not simplified: {}",
                self.merges, self.merge_failures, self.unresolved_border_points
            );
        }
        if self.unclosed_dropped > 0 {
            println!("Unclosed feature dropped at end of input");
        }

        if !self.layers.is_empty() {
            println!("\n--- BY LAYER ({}) ---", self.layers.len());
            for layer in &self.layers {
                if self.merge_enabled {
                    println!(
                        "  {} [{}]: {} written, {} merges, {} points not simplified",
                        layer.name,
                        layer.geometry_type,
                        layer.written,
                        layer.merges,
                        layer.unresolved_border_points
                    );
                } else {
                    println!(
                        "  {} [{}]: {} written",
                        layer.name, layer.geometry_type, layer.written
                    );
                }
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} features written in {} layers, {} merges, {} failed merges",
            self.input,
            self.written,
            self.layers.len(),
            self.merges,
            self.merge_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrn::simplify::LayerStats;
    use ctrn::GeometryType;

    fn summary() -> ConversionSummary {
        ConversionSummary {
            records: 10,
            features: 4,
            unclosed_dropped: 0,
            layers: vec![
                LayerSummary {
                    name: "4LFV".to_string(),
                    geometry_type: GeometryType::LineString25D,
                    stats: LayerStats {
                        received: 3,
                        written: 2,
                        merges: 1,
                        ..Default::default()
                    },
                },
                LayerSummary {
                    name: "2PQA".to_string(),
                    geometry_type: GeometryType::Point25D,
                    stats: LayerStats {
                        received: 1,
                        cancelled: 1,
                        ..Default::default()
                    },
                },
            ],
        }
    }

    #[test]
    fn test_record_summary() {
        let mut report = ConversionReport::new(Path::new("a.dat"), Path::new("out"), 3004, true);
        report.record_summary(&summary());

        assert_eq!(report.written, 2);
        assert_eq!(report.merges, 1);
        assert_eq!(report.cancelled, 1);
        assert_eq!(report.layers.len(), 2);
        assert_eq!(report.layers[0].geometry_type, "LineString25D");
        assert!(report.summary().contains("2 features written in 2 layers"));
    }

    #[test]
    fn test_save_to_file() {
        let mut report = ConversionReport::new(Path::new("a.dat"), Path::new("out"), 4326, false);
        report.record_summary(&summary());
        report.set_duration(Duration::from_millis(1500));

        let path = std::env::temp_dir().join("ctrn_report_test.json");
        report.save_to_file(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["epsg"], 4326);
        assert_eq!(value["duration_secs"], 1.5);
        assert_eq!(value["layers"][1]["name"], "2PQA");

        std::fs::remove_file(path).ok();
    }
}
