//! Fusion des fragments aux bords de tuiles
//!
//! Chaque catégorie a son buffer de features actives et son propre index de
//! points de bord. Une feature dont un point de bord reste dans l'index est
//! "en attente": elle n'est écrite qu'au flush final, sauf fusion entre temps.

mod index;

pub use index::{BorderPointIndex, IndexMatch};

use tracing::{debug, trace, warn};

use crate::feature::{Feature, FeatureId};
use crate::geometry::{GeometryEngine, PlanarEngine};
use crate::output::{LayerInfo, OutputSink};
use crate::point::Point;
use crate::reproject::Reprojector;
use crate::types::{GeometryType, SimplifiedState};
use crate::CtrnError;

/// Compteurs d'une catégorie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerStats {
    /// Features reçues (annulées comprises)
    pub received: usize,
    /// Features écrites dans le sink
    pub written: usize,
    /// Features annulées à la source, ignorées
    pub cancelled: usize,
    /// Fusions réussies
    pub merges: usize,
    /// Fusions refusées par le moteur géométrique
    pub merge_failures: usize,
    /// Flushs partiels déclenchés par le seuil
    pub partial_flushes: usize,
    /// Points de bord sans correspondance au flush final
    pub unresolved_border_points: usize,
}

/// Buffer d'une catégorie
#[derive(Debug)]
pub struct LayerBuffer {
    info: LayerInfo,
    features: Vec<(FeatureId, Feature)>,
    index: BorderPointIndex,
    stats: LayerStats,
}

impl LayerBuffer {
    pub fn new(info: LayerInfo, tolerance: f64) -> Self {
        Self {
            info,
            features: Vec::new(),
            index: BorderPointIndex::new(tolerance),
            stats: LayerStats::default(),
        }
    }

    pub fn info(&self) -> &LayerInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.info.geometry_type
    }

    /// Features actives, dans l'ordre du buffer
    pub fn features(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.features.iter().map(|(id, f)| (*id, f))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn index(&self) -> &BorderPointIndex {
        &self.index
    }

    pub fn stats(&self) -> &LayerStats {
        &self.stats
    }

    /// La feature attend encore une correspondance
    pub fn is_pending(&self, id: FeatureId) -> bool {
        self.index.contains_feature(id)
    }

    fn position(&self, id: FeatureId) -> Option<usize> {
        self.features.iter().position(|(fid, _)| *fid == id)
    }
}

/// Moteur de fusion et d'écriture, partagé par toutes les catégories
#[derive(Debug)]
pub struct SimplificationEngine<E: GeometryEngine = PlanarEngine> {
    engine: E,
    reprojector: Option<Reprojector>,
    merge_enabled: bool,
    threshold: usize,
}

impl<E: GeometryEngine> SimplificationEngine<E> {
    /// `reprojector` est fourni seulement pour une sortie géographique
    pub fn new(
        engine: E,
        reprojector: Option<Reprojector>,
        merge_enabled: bool,
        threshold: usize,
    ) -> Self {
        Self {
            engine,
            reprojector,
            merge_enabled,
            threshold,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn merge_enabled(&self) -> bool {
        self.merge_enabled
    }

    /// Ajoute une feature fermée au buffer de sa catégorie
    ///
    /// Peut déclencher un flush partiel si le buffer dépasse le seuil.
    pub fn add_feature<S: OutputSink>(
        &self,
        buffer: &mut LayerBuffer,
        id: FeatureId,
        mut feature: Feature,
        sink: &mut S,
    ) -> Result<(), CtrnError> {
        buffer.stats.received += 1;

        if feature.is_cancelled() {
            trace!("Dropping cancelled feature {}", feature.code());
            buffer.stats.cancelled += 1;
            return Ok(());
        }

        if self.merge_enabled {
            let involved = self.match_border_points(buffer, id, &feature);
            for prior_id in involved {
                self.merge_prior(buffer, id, &mut feature, prior_id);
            }
        }

        buffer.features.push((id, feature));

        if buffer.features.len() > self.threshold {
            buffer.stats.partial_flushes += 1;
            let written = self.to_output(buffer, false, sink)?;
            debug!(
                "Partial flush of layer {}: {} written, {} pending",
                buffer.info.name,
                written,
                buffer.features.len()
            );
        }

        Ok(())
    }

    /// Rapproche les points de bord de `feature` de l'index
    ///
    /// Retourne les features antérieures concernées, dans l'ordre de découverte.
    fn match_border_points(
        &self,
        buffer: &mut LayerBuffer,
        id: FeatureId,
        feature: &Feature,
    ) -> Vec<FeatureId> {
        let mut involved: Vec<FeatureId> = Vec::new();
        let mut matched: Vec<IndexMatch> = Vec::new();
        let mut unmatched: Vec<&Point> = Vec::new();

        for point in feature.border_points() {
            let found = buffer.index.find(point);
            if found.is_empty() {
                unmatched.push(point);
                continue;
            }
            for m in found {
                if !involved.contains(&m.feature) {
                    involved.push(m.feature);
                }
                if !matched.contains(&m) {
                    matched.push(m);
                }
            }
        }

        for m in &matched {
            buffer.index.remove(m);
        }
        for point in unmatched {
            buffer.index.insert(point, id);
        }

        if !involved.is_empty() {
            trace!(
                "Feature {} matches {} border point(s) of {} feature(s)",
                feature.code(),
                matched.len(),
                involved.len()
            );
        }
        involved
    }

    /// Fusionne une feature antérieure dans `feature`
    ///
    /// Un échec laisse les deux features intactes et marque `feature` comme fragment.
    fn merge_prior(
        &self,
        buffer: &mut LayerBuffer,
        id: FeatureId,
        feature: &mut Feature,
        prior_id: FeatureId,
    ) {
        let Some(pos) = buffer.position(prior_id) else {
            debug!(
                "Feature #{} referenced by the border index is no longer buffered",
                prior_id
            );
            return;
        };

        match feature.merge(&mut buffer.features[pos].1, &self.engine) {
            Ok(()) => {
                buffer.features.remove(pos);
                buffer.index.reassign(prior_id, id);
                buffer.stats.merges += 1;
            }
            Err(e) => {
                warn!(
                    "Merge of {} into {} failed, keeping fragment: {}",
                    buffer.features[pos].1.code(),
                    feature.code(),
                    e
                );
                feature.resolve_simplified(SimplifiedState::Fragment);
                buffer.stats.merge_failures += 1;
            }
        }
    }

    /// Écrit les features du buffer
    ///
    /// Hors flush final, les features en attente restent dans le buffer.
    /// Retourne le nombre de features écrites.
    pub fn to_output<S: OutputSink>(
        &self,
        buffer: &mut LayerBuffer,
        final_only: bool,
        sink: &mut S,
    ) -> Result<usize, CtrnError> {
        let features = std::mem::take(&mut buffer.features);
        let mut written = 0;

        for (id, mut feature) in features {
            let pending = self.merge_enabled && buffer.index.contains_feature(id);
            if pending && !final_only {
                buffer.features.push((id, feature));
                continue;
            }

            if self.merge_enabled {
                feature.resolve_simplified(if pending {
                    SimplifiedState::Fragment
                } else {
                    SimplifiedState::Complete
                });
            }

            let geometry = feature.output_geometry(&self.engine, self.reprojector.as_ref())?;
            sink.write(&buffer.info, &geometry, feature.attributes())?;
            written += 1;
        }

        buffer.stats.written += written;

        if final_only {
            buffer.stats.unresolved_border_points = buffer.index.len();
            if !buffer.index.is_empty() {
                debug!(
                    "Layer {}: {} border point(s) left unmatched",
                    buffer.info.name,
                    buffer.index.len()
                );
            }
            buffer.index.clear();
        }

        Ok(written)
    }
}
