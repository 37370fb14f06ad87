//! Moteur géométrique: construction et union des géométries

use std::collections::HashMap;

use geo::{BooleanOps, Polygon};

use super::merge::merge_lines;
use super::{validate, Coord3, FeatureGeometry};
use crate::types::FeatureKind;
use crate::CtrnError;

/// Opérations géométriques requises par la conversion
pub trait GeometryEngine {
    /// Construit la géométrie d'une feature à partir de ses sommets ordonnés
    fn build(&self, kind: FeatureKind, coords: &[Coord3]) -> Result<FeatureGeometry, CtrnError>;

    /// Union de deux géométries de même dimension
    ///
    /// Une erreur signale une union refusée (géométrie invalide ou dimensions
    /// incompatibles), jamais une condition fatale.
    fn union(&self, a: &FeatureGeometry, b: &FeatureGeometry)
        -> Result<FeatureGeometry, CtrnError>;
}

/// Moteur planaire basé sur `geo`
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarEngine {
    snap_tolerance: f64,
}

impl PlanarEngine {
    /// `snap_tolerance` en mètres: les géométries restent en Gauss-Boaga
    pub fn new(snap_tolerance: f64) -> Self {
        Self { snap_tolerance }
    }

    pub fn snap_tolerance(&self) -> f64 {
        self.snap_tolerance
    }

    /// Une couche ponctuelle n'admet qu'un seul point: l'union doit coïncider
    fn union_points(
        &self,
        a: &FeatureGeometry,
        b: &FeatureGeometry,
    ) -> Result<FeatureGeometry, CtrnError> {
        let mut points: Vec<Coord3> = Vec::new();
        for coord in a.coords().into_iter().chain(b.coords()) {
            if !points.iter().any(|p| p.x == coord.x && p.y == coord.y) {
                points.push(coord);
            }
        }
        match points.as_slice() {
            [single] => Ok(FeatureGeometry::Point(*single)),
            _ => Err(CtrnError::geometry(format!(
                "union of {} distinct points is not a point",
                points.len()
            ))),
        }
    }

    fn union_lines(&self, a: &FeatureGeometry, b: &FeatureGeometry) -> FeatureGeometry {
        let mut lines = lines_of(a);
        lines.extend(lines_of(b));
        let mut merged = merge_lines(lines, self.snap_tolerance);
        if merged.len() == 1 {
            FeatureGeometry::LineString(merged.remove(0))
        } else {
            FeatureGeometry::MultiLineString(merged)
        }
    }

    fn union_polygons(
        &self,
        a: &FeatureGeometry,
        b: &FeatureGeometry,
    ) -> Result<FeatureGeometry, CtrnError> {
        let (Some(left), Some(right)) = (a.to_geo_polygons(), b.to_geo_polygons()) else {
            return Err(CtrnError::geometry("polygon expected"));
        };

        let union = left.union(&right);
        if union.0.is_empty() {
            return Err(CtrnError::geometry("empty union result"));
        }

        // L'union est 2D: on restitue le Z des sommets d'entrée
        let heights: HashMap<(u64, u64), f64> = a
            .coords()
            .into_iter()
            .chain(b.coords())
            .map(|c| ((c.x.to_bits(), c.y.to_bits()), c.z))
            .collect();

        let mut polygons: Vec<Vec<Vec<Coord3>>> = union
            .0
            .iter()
            .map(|polygon| polygon_with_heights(polygon, &heights))
            .collect();

        if polygons.len() == 1 {
            Ok(FeatureGeometry::Polygon(polygons.remove(0)))
        } else {
            Ok(FeatureGeometry::MultiPolygon(polygons))
        }
    }
}

impl GeometryEngine for PlanarEngine {
    fn build(&self, kind: FeatureKind, coords: &[Coord3]) -> Result<FeatureGeometry, CtrnError> {
        let Some(&first) = coords.first() else {
            return Err(CtrnError::geometry("feature without vertex"));
        };

        Ok(match kind {
            FeatureKind::Point | FeatureKind::Text => FeatureGeometry::Point(first),
            FeatureKind::Line => FeatureGeometry::LineString(coords.to_vec()),
            FeatureKind::Area => {
                let mut ring = coords.to_vec();
                let last = ring[ring.len() - 1];
                if last.x != first.x || last.y != first.y {
                    ring.push(first);
                }
                FeatureGeometry::Polygon(vec![ring])
            }
        })
    }

    fn union(
        &self,
        a: &FeatureGeometry,
        b: &FeatureGeometry,
    ) -> Result<FeatureGeometry, CtrnError> {
        validate::check(a)?;
        validate::check(b)?;

        match (a.dimension(), b.dimension()) {
            (0, 0) => self.union_points(a, b),
            (1, 1) => Ok(self.union_lines(a, b)),
            (2, 2) => self.union_polygons(a, b),
            (left, right) => Err(CtrnError::geometry(format!(
                "cannot union {} with {} (dimensions {left} and {right})",
                a.type_name(),
                b.type_name()
            ))),
        }
    }
}

fn lines_of(geometry: &FeatureGeometry) -> Vec<Vec<Coord3>> {
    match geometry {
        FeatureGeometry::LineString(line) => vec![line.clone()],
        FeatureGeometry::MultiLineString(lines) => lines.clone(),
        _ => Vec::new(),
    }
}

fn polygon_with_heights(polygon: &Polygon, heights: &HashMap<(u64, u64), f64>) -> Vec<Vec<Coord3>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| {
            ring.coords()
                .map(|c| {
                    let z = heights
                        .get(&(c.x.to_bits(), c.y.to_bits()))
                        .copied()
                        .unwrap_or(0.0);
                    Coord3::new(c.x, c.y, z)
                })
                .collect()
        })
        .collect()
}
