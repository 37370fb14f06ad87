//! Feature CTRN: en-tête, sommets, attributs et géométrie en cache

use tracing::trace;

use crate::geometry::{FeatureGeometry, GeometryEngine};
use crate::point::Point;
use crate::reproject::Reprojector;
use crate::types::{AttributeValue, Attributes, FeatureKind, GeometryType, SimplifiedState};
use crate::CtrnError;

/// Provenance par défaut des données
pub const DEFAULT_SOURCE_TAG: &str = "Regione_Friuli-Venezia-Giulia_17620_2.100_17576";

/// Identifiant d'une feature au sein d'un `LayerStore`
pub type FeatureId = u64;

/// Feature cartographique reconstruite à partir d'une suite d'enregistrements
#[derive(Debug, Clone)]
pub struct Feature {
    section: String,
    kind: FeatureKind,
    revision: String,
    layer: String,
    points: Vec<Point>,
    attributes: Attributes,
    closed: bool,
    merged: bool,
    geometry: Option<FeatureGeometry>,
}

impl Feature {
    /// Ouvre une feature à partir des champs d'en-tête
    pub fn new(
        section: impl Into<String>,
        kind: FeatureKind,
        revision: impl Into<String>,
        layer: impl Into<String>,
        source_tag: &str,
    ) -> Self {
        let mut attributes = Attributes::new();
        attributes.set("source", source_tag);
        attributes.set("simplified", SimplifiedState::NotEvaluated as i64);

        Self {
            section: section.into(),
            kind,
            revision: revision.into(),
            layer: layer.into(),
            points: Vec::new(),
            attributes,
            closed: false,
            merged: false,
            geometry: None,
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Nom de la catégorie: section + type + couche
    pub fn name(&self) -> String {
        format!("{}{}{}", self.section, self.kind.code(), self.layer)
    }

    /// Code complet: section + type + révision + couche
    pub fn code(&self) -> String {
        format!(
            "{}{}{}{}",
            self.section,
            self.kind.code(),
            self.revision,
            self.layer
        )
    }

    /// Annulée à la source (troisième caractère de révision `C`)
    pub fn is_cancelled(&self) -> bool {
        self.revision.chars().nth(2) == Some('C')
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.kind.geometry_type()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
        self.geometry = None;
    }

    /// Sommets sur un bord de tuile
    pub fn border_points(&self) -> impl Iterator<Item = &Point> {
        self.points.iter().filter(|p| p.is_border())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Ferme la feature et enregistre les attributs `code` et `revision`
    pub fn close(&mut self) {
        let name = self.name();
        self.attributes.set("code", name);
        self.attributes.set("revision", self.revision.clone());
        self.closed = true;
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.attributes.set(name, value);
    }

    pub fn simplified(&self) -> SimplifiedState {
        self.attributes
            .get("simplified")
            .and_then(AttributeValue::as_integer)
            .and_then(SimplifiedState::from_value)
            .unwrap_or(SimplifiedState::NotEvaluated)
    }

    /// Fixe l'état de simplification s'il n'a pas encore été évalué
    ///
    /// Retourne `false` si l'état était déjà décidé (aucun changement).
    pub fn resolve_simplified(&mut self, state: SimplifiedState) -> bool {
        if self.simplified() != SimplifiedState::NotEvaluated {
            return false;
        }
        self.attributes.set("simplified", state as i64);
        true
    }

    /// Géométrie métrique de la feature, construite au premier appel
    pub fn geometry(
        &mut self,
        engine: &impl GeometryEngine,
    ) -> Result<&FeatureGeometry, CtrnError> {
        if self.geometry.is_none() {
            let coords: Vec<_> = self.points.iter().map(Point::coord).collect();
            self.geometry = Some(engine.build(self.kind, &coords)?);
        }

        self.geometry
            .as_ref()
            .ok_or_else(|| CtrnError::geometry("geometry cache not populated"))
    }

    /// Géométrie à écrire, en coordonnées géographiques si un reprojector est fourni
    ///
    /// Les unions travaillent toujours en mètres: seule la sortie est reprojetée.
    pub fn output_geometry(
        &mut self,
        engine: &impl GeometryEngine,
        reprojector: Option<&Reprojector>,
    ) -> Result<FeatureGeometry, CtrnError> {
        let Some(reprojector) = reprojector else {
            return self.geometry(engine).cloned();
        };

        if self.merged {
            // Sommets issus d'une union, sans Point d'origine
            self.geometry(engine)?
                .try_map_coords(|c| reprojector.transform(c.x, c.y, c.z))
        } else {
            let coords = self
                .points
                .iter()
                .map(|p| p.geographic(reprojector))
                .collect::<Result<Vec<_>, _>>()?;
            engine.build(self.kind, &coords)
        }
    }

    /// Fusionnée avec au moins une autre feature
    pub fn is_merged(&self) -> bool {
        self.merged
    }

    /// Géométrie déjà calculée, sans construction
    pub fn cached_geometry(&self) -> Option<&FeatureGeometry> {
        self.geometry.as_ref()
    }

    /// Absorbe la géométrie d'une autre feature par union
    ///
    /// En cas d'échec, la géométrie de `self` reste inchangée.
    pub fn merge(
        &mut self,
        other: &mut Feature,
        engine: &impl GeometryEngine,
    ) -> Result<(), CtrnError> {
        let theirs = other.geometry(engine)?.clone();
        let ours = self.geometry(engine)?;
        let merged = engine.union(ours, &theirs)?;
        trace!(
            "Merged {} into {} ({})",
            other.code(),
            self.code(),
            merged.type_name()
        );
        self.geometry = Some(merged);
        self.merged = true;
        Ok(())
    }

    /// Consomme la feature pour l'écriture
    pub fn into_parts(self) -> (Option<FeatureGeometry>, Attributes) {
        (self.geometry, self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coord3, PlanarEngine};
    use crate::types::{VertexPosition, Visibility};

    fn line_feature(points: &[(f64, f64, bool)]) -> Feature {
        let mut feature = Feature::new("4", FeatureKind::Line, "000", "FV", DEFAULT_SOURCE_TAG);
        for &(x, y, border) in points {
            feature.add_point(Point::new(x, y, 0.0).with_flags(
                border,
                Visibility::Visible,
                None,
                VertexPosition::Middle,
            ));
        }
        feature
    }

    #[test]
    fn test_names_and_codes() {
        let feature = Feature::new("4", FeatureKind::Area, "00C", "FV", DEFAULT_SOURCE_TAG);
        assert_eq!(feature.name(), "4AFV");
        assert_eq!(feature.code(), "4A00CFV");
        assert!(feature.is_cancelled());

        let feature = Feature::new("4", FeatureKind::Area, "0C0", "FV", DEFAULT_SOURCE_TAG);
        assert!(!feature.is_cancelled());
    }

    #[test]
    fn test_seed_attributes_and_close() {
        let mut feature = Feature::new("4", FeatureKind::Point, "000", "FV", "test");
        assert_eq!(feature.simplified(), SimplifiedState::NotEvaluated);
        assert_eq!(feature.attribute("source"), Some(&AttributeValue::from("test")));

        feature.close();
        assert!(feature.is_closed());
        assert_eq!(feature.attribute("code"), Some(&AttributeValue::from("4PFV")));
        assert_eq!(feature.attribute("revision"), Some(&AttributeValue::from("000")));

        let keys: Vec<&str> = feature.attributes().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["source", "simplified", "code", "revision"]);
    }

    #[test]
    fn test_simplified_is_set_once() {
        let mut feature = line_feature(&[]);
        assert!(feature.resolve_simplified(SimplifiedState::Fragment));
        assert!(!feature.resolve_simplified(SimplifiedState::Complete));
        assert_eq!(feature.simplified(), SimplifiedState::Fragment);
    }

    #[test]
    fn test_border_points() {
        let feature = line_feature(&[(0.0, 0.0, false), (1.0, 0.0, true)]);
        let borders: Vec<&Point> = feature.border_points().collect();
        assert_eq!(borders.len(), 1);
        assert_eq!(borders[0].x(), 1.0);
    }

    #[test]
    fn test_merge_replaces_cached_geometry() {
        let engine = PlanarEngine::new(1.0);
        let mut f1 = line_feature(&[(0.0, 0.0, false), (1.0, 0.0, true)]);
        let mut f2 = line_feature(&[(1.0, 0.0, true), (2.0, 0.0, false)]);

        f2.geometry(&engine).unwrap();
        f2.merge(&mut f1, &engine).unwrap();
        assert!(f2.is_merged());

        let FeatureGeometry::LineString(coords) = f2.cached_geometry().unwrap() else {
            panic!("Expected LineString geometry");
        };
        assert_eq!(coords.len(), 3);
        assert!(coords.contains(&Coord3::new(0.0, 0.0, 0.0)));
        assert!(coords.contains(&Coord3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_output_geometry_reprojects_merged_coords() {
        let engine = PlanarEngine::new(1.0);
        let reprojector = Reprojector::new().unwrap();
        let mut f1 = line_feature(&[
            (2_425_000.0, 5_055_000.0, false),
            (2_425_001.0, 5_055_000.0, true),
        ]);
        let mut f2 = line_feature(&[
            (2_425_001.9, 5_055_000.0, true),
            (2_425_003.0, 5_055_000.0, false),
        ]);

        f2.merge(&mut f1, &engine).unwrap();
        let projected = f2.output_geometry(&engine, None).unwrap();
        let geographic = f2.output_geometry(&engine, Some(&reprojector)).unwrap();

        assert_eq!(projected.type_name(), "LineString");
        assert_eq!(geographic.type_name(), "LineString");
        assert_eq!(geographic.coords().len(), projected.coords().len());
        let first = geographic.coords()[0];
        assert!((first.x - 13.780883).abs() < 1e-4, "lon={}", first.x);
        assert!((first.y - 45.641839).abs() < 1e-4, "lat={}", first.y);
        // Le cache reste métrique
        assert_eq!(f2.cached_geometry(), Some(&projected));
    }

    #[test]
    fn test_output_geometry_of_unmerged_feature_uses_point_cache() {
        let engine = PlanarEngine::new(1.0);
        let reprojector = Reprojector::new().unwrap();
        let mut feature = line_feature(&[
            (2_425_000.0, 5_055_000.0, false),
            (2_425_010.0, 5_055_000.0, false),
        ]);

        let geographic = feature.output_geometry(&engine, Some(&reprojector)).unwrap();
        let expected = feature.points()[0].geographic(&reprojector).unwrap();
        assert_eq!(geographic.coords()[0], expected);
    }
}
