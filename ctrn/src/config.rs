//! Paramètres de traitement, fixés au démarrage

use crate::feature::DEFAULT_SOURCE_TAG;
use crate::reproject::ReprojectionBackend;
use crate::CtrnError;

/// Tolérance de rapprochement des points de bord (mètres)
pub const DEFAULT_TOLERANCE: f64 = 1.0;
/// Taille de buffer déclenchant un flush partiel
pub const DEFAULT_SERIALIZATION_THRESHOLD: usize = 2000;

/// Configuration immuable d'une conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingConfig {
    /// Sortie en WGS84 (lon/lat) plutôt qu'en Gauss-Boaga
    pub geographic: bool,
    /// Tolérance de rapprochement des points de bord, en mètres
    pub tolerance: f64,
    /// Nombre de features en buffer au-delà duquel on écrit
    pub serialization_threshold: usize,
    /// Fusion des fragments aux bords de tuiles
    pub merge_enabled: bool,
    /// Valeur de l'attribut `source`
    pub source_tag: String,
    /// Implémentation de reprojection
    pub backend: ReprojectionBackend,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            geographic: false,
            tolerance: DEFAULT_TOLERANCE,
            serialization_threshold: DEFAULT_SERIALIZATION_THRESHOLD,
            merge_enabled: true,
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            backend: ReprojectionBackend::default(),
        }
    }
}

impl ProcessingConfig {
    pub fn validate(&self) -> Result<(), CtrnError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CtrnError::Config(format!(
                "tolerance must be a finite, non-negative number (got {})",
                self.tolerance
            )));
        }
        if self.serialization_threshold == 0 {
            return Err(CtrnError::Config(
                "serialization threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessingConfig::default();
        assert!(!config.geographic);
        assert_eq!(config.tolerance, 1.0);
        assert_eq!(config.serialization_threshold, 2000);
        assert!(config.merge_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ProcessingConfig {
            tolerance: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProcessingConfig {
            tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProcessingConfig {
            serialization_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CtrnError::Config(_))));
    }
}
