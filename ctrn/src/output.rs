//! Destination des features finalisées

use crate::geometry::FeatureGeometry;
use crate::reproject::{GEOGRAPHIC_EPSG, PROJECTED_EPSG};
use crate::types::{Attributes, GeometryType};
use crate::CtrnError;

/// Description d'une couche de sortie (une par catégorie)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub geometry_type: GeometryType,
    /// Coordonnées WGS84 plutôt que Gauss-Boaga
    pub geographic: bool,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>, geometry_type: GeometryType, geographic: bool) -> Self {
        Self {
            name: name.into(),
            geometry_type,
            geographic,
        }
    }

    /// Code EPSG des coordonnées écrites
    pub fn epsg(&self) -> u32 {
        if self.geographic {
            GEOGRAPHIC_EPSG
        } else {
            PROJECTED_EPSG
        }
    }

    /// Refuse une géométrie que le type de la couche ne peut pas porter
    pub fn check_geometry(&self, geometry: &FeatureGeometry) -> Result<(), CtrnError> {
        if self.geometry_type.admits(geometry) {
            Ok(())
        } else {
            Err(CtrnError::output(
                &self.name,
                format!("{} geometry in a {} layer", geometry.type_name(), self.geometry_type),
            ))
        }
    }
}

/// Writer de couches vectorielles
///
/// La couche est créée au premier `write` puis complétée. Un attribut inconnu
/// de la couche y ajoute un champ.
pub trait OutputSink {
    /// Écrit une feature dans la couche
    fn write(
        &mut self,
        layer: &LayerInfo,
        geometry: &FeatureGeometry,
        attributes: &Attributes,
    ) -> Result<(), CtrnError>;

    /// Appelé une fois, après le flush final de toutes les couches
    fn finish(&mut self) -> Result<(), CtrnError> {
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn write(
        &mut self,
        layer: &LayerInfo,
        geometry: &FeatureGeometry,
        attributes: &Attributes,
    ) -> Result<(), CtrnError> {
        (**self).write(layer, geometry, attributes)
    }

    fn finish(&mut self) -> Result<(), CtrnError> {
        (**self).finish()
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn write(
        &mut self,
        layer: &LayerInfo,
        geometry: &FeatureGeometry,
        attributes: &Attributes,
    ) -> Result<(), CtrnError> {
        (**self).write(layer, geometry, attributes)
    }

    fn finish(&mut self) -> Result<(), CtrnError> {
        (**self).finish()
    }
}

/// Feature reçue par un `MemorySink`
#[derive(Debug, Clone)]
pub struct WrittenFeature {
    pub layer: LayerInfo,
    pub geometry: FeatureGeometry,
    pub attributes: Attributes,
}

/// Sink en mémoire, utile pour les tests et l'intégration dans d'autres outils
#[derive(Debug, Default)]
pub struct MemorySink {
    features: Vec<WrittenFeature>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Features écrites, dans l'ordre d'écriture
    pub fn features(&self) -> &[WrittenFeature] {
        &self.features
    }

    /// Features écrites dans une couche
    pub fn layer<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a WrittenFeature> + 'a {
        self.features.iter().filter(move |f| f.layer.name == name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_features(self) -> Vec<WrittenFeature> {
        self.features
    }
}

impl OutputSink for MemorySink {
    fn write(
        &mut self,
        layer: &LayerInfo,
        geometry: &FeatureGeometry,
        attributes: &Attributes,
    ) -> Result<(), CtrnError> {
        if self.finished {
            return Err(CtrnError::output(&layer.name, "sink already finished"));
        }
        layer.check_geometry(geometry)?;
        self.features.push(WrittenFeature {
            layer: layer.clone(),
            geometry: geometry.clone(),
            attributes: attributes.clone(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CtrnError> {
        self.finished = true;
        Ok(())
    }
}
