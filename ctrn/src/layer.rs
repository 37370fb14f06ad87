//! Routage des features vers les buffers de catégorie

use std::collections::HashMap;

use tracing::debug;

use crate::config::ProcessingConfig;
use crate::feature::{Feature, FeatureId};
use crate::geometry::{GeometryEngine, PlanarEngine};
use crate::output::{LayerInfo, OutputSink};
use crate::reproject::Reprojector;
use crate::simplify::{LayerBuffer, LayerStats, SimplificationEngine};
use crate::types::GeometryType;
use crate::CtrnError;

/// Bilan d'une catégorie après le flush final
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    pub name: String,
    pub geometry_type: GeometryType,
    pub stats: LayerStats,
}

/// Ensemble des catégories d'une conversion
///
/// Les catégories sont créées à la première feature reçue et gardées dans
/// l'ordre de création.
#[derive(Debug)]
pub struct LayerStore<S: OutputSink, E: GeometryEngine = PlanarEngine> {
    config: ProcessingConfig,
    simplifier: SimplificationEngine<E>,
    layers: Vec<LayerBuffer>,
    positions: HashMap<String, usize>,
    sink: S,
    next_id: FeatureId,
}

impl<S: OutputSink> LayerStore<S, PlanarEngine> {
    /// Store avec le moteur planaire par défaut
    pub fn new(config: ProcessingConfig, sink: S) -> Result<Self, CtrnError> {
        let engine = PlanarEngine::new(config.tolerance);
        Self::with_engine(config, sink, engine)
    }
}

impl<S: OutputSink, E: GeometryEngine> LayerStore<S, E> {
    pub fn with_engine(config: ProcessingConfig, sink: S, engine: E) -> Result<Self, CtrnError> {
        config.validate()?;

        let reprojector = if config.geographic {
            Some(Reprojector::for_backend(config.backend)?)
        } else {
            None
        };
        let simplifier = SimplificationEngine::new(
            engine,
            reprojector,
            config.merge_enabled,
            config.serialization_threshold,
        );

        Ok(Self {
            config,
            simplifier,
            layers: Vec::new(),
            positions: HashMap::new(),
            sink,
            next_id: 0,
        })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn layer(&self, name: &str) -> Option<&LayerBuffer> {
        self.positions.get(name).map(|&i| &self.layers[i])
    }

    /// Catégories dans l'ordre de création
    pub fn layers(&self) -> impl Iterator<Item = &LayerBuffer> {
        self.layers.iter()
    }

    fn layer_index(&mut self, feature: &Feature) -> usize {
        let name = feature.name();
        if let Some(&i) = self.positions.get(&name) {
            return i;
        }

        let info = LayerInfo::new(&name, feature.geometry_type(), self.config.geographic);
        debug!("Creating layer {} ({})", name, info.geometry_type);
        self.layers
            .push(LayerBuffer::new(info, self.config.tolerance));
        self.positions.insert(name, self.layers.len() - 1);
        self.layers.len() - 1
    }

    /// Route une feature fermée vers sa catégorie
    pub fn add_feature(&mut self, feature: Feature) -> Result<FeatureId, CtrnError> {
        let index = self.layer_index(&feature);
        let id = self.next_id;
        self.next_id += 1;

        self.simplifier
            .add_feature(&mut self.layers[index], id, feature, &mut self.sink)?;
        Ok(id)
    }

    /// Écrit toutes les catégories (les features en attente restent hors flush final)
    pub fn flush(&mut self, final_only: bool) -> Result<usize, CtrnError> {
        let mut written = 0;
        for layer in &mut self.layers {
            written += self.simplifier.to_output(layer, final_only, &mut self.sink)?;
        }
        Ok(written)
    }

    /// Flush final de toutes les catégories puis fermeture du sink
    pub fn finish(mut self) -> Result<(S, Vec<LayerSummary>), CtrnError> {
        self.flush(true)?;
        self.sink.finish()?;

        let summaries = self
            .layers
            .iter()
            .map(|layer| LayerSummary {
                name: layer.name().to_string(),
                geometry_type: layer.geometry_type(),
                stats: layer.stats().clone(),
            })
            .collect();

        Ok((self.sink, summaries))
    }
}
