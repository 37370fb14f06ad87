//! Types d'erreurs pour le crate ctrn

use thiserror::Error;

/// Erreurs pouvant survenir lors de la conversion CTRN
#[derive(Debug, Error)]
pub enum CtrnError {
    /// Erreur d'I/O lors de la lecture ou de l'écriture
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Enregistrement non conforme au format d'échange (fatal)
    #[error("Format violation at line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// Géométrie refusée par le moteur géométrique
    #[error("Geometry error: {reason}")]
    Geometry { reason: String },

    /// Échec de la reprojection
    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    /// Paramètres de traitement invalides
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Erreur du writer de sortie
    #[error("Output error for layer {layer}: {reason}")]
    Output { layer: String, reason: String },
}

impl CtrnError {
    /// Crée une erreur de format avec contexte
    pub fn format(line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            line,
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie
    pub fn geometry(reason: impl Into<String>) -> Self {
        Self::Geometry {
            reason: reason.into(),
        }
    }

    /// Crée une erreur de sortie
    pub fn output(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Output {
            layer: layer.into(),
            reason: reason.into(),
        }
    }
}
