//! Configuration de l'export
//!
//! Ordre de priorité: valeurs par défaut, fichier JSON, variables
//! d'environnement (`.env` compris), puis options de la ligne de commande.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use ctrn::config::{DEFAULT_SERIALIZATION_THRESHOLD, DEFAULT_TOLERANCE};
use ctrn::feature::DEFAULT_SOURCE_TAG;
use ctrn::{ProcessingConfig, ReprojectionBackend};

pub const ENV_OUTPUT_DIR: &str = "CTRN_OUTPUT_DIR";
pub const ENV_WGS84: &str = "CTRN_WGS84";
pub const ENV_TOLERANCE: &str = "CTRN_TOLERANCE";
pub const ENV_THRESHOLD: &str = "CTRN_THRESHOLD";
pub const ENV_MERGE: &str = "CTRN_MERGE";

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Répertoire des couches GeoJSON
    pub output_dir: Option<PathBuf>,

    /// Supprimer les couches existantes au lieu de les compléter
    pub overwrite: bool,

    /// Sortie en WGS84 (EPSG:4326) au lieu de Gauss-Boaga (EPSG:3004)
    pub wgs84: bool,

    /// Tolérance de rapprochement des points de bord (mètres)
    pub tolerance: f64,

    /// Taille de buffer déclenchant un flush partiel
    pub serialization_threshold: usize,

    /// Fusion des fragments aux bords de tuiles
    pub merge: bool,

    /// Valeur de l'attribut `source`
    pub source_tag: String,

    /// Implémentation de reprojection (lite, proj)
    pub backend: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            overwrite: false,
            wgs84: false,
            tolerance: DEFAULT_TOLERANCE,
            serialization_threshold: DEFAULT_SERIALIZATION_THRESHOLD,
            merge: true,
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            backend: "lite".to_string(),
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Applique les variables d'environnement `CTRN_*`
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Applique des variables fournies par `lookup`
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup(ENV_WGS84) {
            self.wgs84 = parse_bool(ENV_WGS84, &value)?;
        }
        if let Some(value) = lookup(ENV_TOLERANCE) {
            self.tolerance = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", ENV_TOLERANCE, value))?;
        }
        if let Some(value) = lookup(ENV_THRESHOLD) {
            self.serialization_threshold = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", ENV_THRESHOLD, value))?;
        }
        if let Some(value) = lookup(ENV_MERGE) {
            self.merge = parse_bool(ENV_MERGE, &value)?;
        }
        Ok(())
    }

    /// Répertoire de sortie, obligatoire
    pub fn output_dir(&self) -> Result<&Path> {
        match &self.output_dir {
            Some(dir) => Ok(dir.as_path()),
            None => bail!(
                "No output directory: use --output or set {}",
                ENV_OUTPUT_DIR
            ),
        }
    }

    /// Paramètres de traitement validés pour le crate `ctrn`
    pub fn processing(&self) -> Result<ProcessingConfig> {
        let backend: ReprojectionBackend = self
            .backend
            .parse()
            .context("Invalid reprojection backend")?;

        let processing = ProcessingConfig {
            geographic: self.wgs84,
            tolerance: self.tolerance,
            serialization_threshold: self.serialization_threshold,
            merge_enabled: self.merge,
            source_tag: self.source_tag.clone(),
            backend,
        };
        processing.validate()?;
        Ok(processing)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("Invalid {}: '{}' (expected true/false)", name, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let processing = config.processing().unwrap();
        assert_eq!(processing, ProcessingConfig::default());
        assert!(config.output_dir().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: Config = serde_json::from_str(r#"{"wgs84": true, "tolerance": 0.5}"#).unwrap();
        assert!(config.wgs84);
        assert_eq!(config.tolerance, 0.5);
        assert!(config.merge);
        assert_eq!(config.serialization_threshold, 2000);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_OUTPUT_DIR, "/tmp/ctrn"),
            (ENV_WGS84, "yes"),
            (ENV_TOLERANCE, "2.5"),
            (ENV_THRESHOLD, "10"),
            (ENV_MERGE, "false"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.output_dir().unwrap(), Path::new("/tmp/ctrn"));
        assert!(config.wgs84);
        assert_eq!(config.tolerance, 2.5);
        assert_eq!(config.serialization_threshold, 10);
        assert!(!config.merge);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let result = config.apply_vars(|name| (name == ENV_MERGE).then(|| "maybe".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_processing_values() {
        let config = Config {
            serialization_threshold: 0,
            ..Default::default()
        };
        assert!(config.processing().is_err());

        let config = Config {
            backend: "gdal".to_string(),
            ..Default::default()
        };
        assert!(config.processing().is_err());
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join("ctrn_export_config_test.json");
        std::fs::write(&path, r#"{"output_dir": "out", "overwrite": true}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert!(config.overwrite);

        std::fs::remove_file(path).ok();
    }
}
