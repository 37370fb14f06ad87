//! Contrôles de validité avant union
//!
//! Aucune réparation n'est tentée: une géométrie refusée fait échouer la fusion
//! et le fragment est conservé tel quel.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::Line;

use super::{Coord3, FeatureGeometry};
use crate::CtrnError;

/// Vérifie qu'une géométrie peut être passée à une union
pub fn check(geometry: &FeatureGeometry) -> Result<(), CtrnError> {
    if geometry.coords().iter().any(|c| !c.is_finite()) {
        return Err(CtrnError::geometry("non-finite coordinate"));
    }

    match geometry {
        FeatureGeometry::Point(_) => Ok(()),
        FeatureGeometry::MultiPoint(points) => non_empty(points.len()),
        FeatureGeometry::LineString(line) => check_line(line),
        FeatureGeometry::MultiLineString(lines) => {
            non_empty(lines.len())?;
            lines.iter().try_for_each(|line| check_line(line))
        }
        FeatureGeometry::Polygon(rings) => check_polygon(rings),
        FeatureGeometry::MultiPolygon(polygons) => {
            non_empty(polygons.len())?;
            polygons.iter().try_for_each(|rings| check_polygon(rings))
        }
    }
}

fn non_empty(len: usize) -> Result<(), CtrnError> {
    if len == 0 {
        Err(CtrnError::geometry("empty geometry"))
    } else {
        Ok(())
    }
}

fn check_line(line: &[Coord3]) -> Result<(), CtrnError> {
    if line.len() < 2 {
        return Err(CtrnError::geometry(format!(
            "linestring with {} vertex",
            line.len()
        )));
    }
    Ok(())
}

fn check_polygon(rings: &[Vec<Coord3>]) -> Result<(), CtrnError> {
    non_empty(rings.len())?;
    for ring in rings {
        check_ring(ring)?;
    }
    Ok(())
}

/// Anneau fermé, au moins 4 sommets, sans auto-intersection
pub fn check_ring(ring: &[Coord3]) -> Result<(), CtrnError> {
    if ring.len() < 4 {
        return Err(CtrnError::geometry(format!(
            "ring with {} vertices",
            ring.len()
        )));
    }

    let first = ring[0];
    let last = ring[ring.len() - 1];
    if first.x != last.x || first.y != last.y {
        return Err(CtrnError::geometry("unclosed ring"));
    }

    if let Some(index) = self_intersection(ring) {
        return Err(CtrnError::geometry(format!(
            "self-intersecting ring at segment {index}"
        )));
    }
    Ok(())
}

/// Un segment qui croise un segment non adjacent
///
/// Balayage en X: les segments sont triés par abscisse minimale et chaque
/// segment n'est comparé qu'à ceux dont l'emprise recouvre la sienne.
fn self_intersection(ring: &[Coord3]) -> Option<usize> {
    let segments: Vec<Line> = ring
        .windows(2)
        .map(|w| Line::new(w[0].xy(), w[1].xy()))
        .collect();
    let n = segments.len();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| min_x(&segments[a]).total_cmp(&min_x(&segments[b])));

    for (k, &i) in order.iter().enumerate() {
        let seg = segments[i];
        let max_x = seg.start.x.max(seg.end.x);
        let (min_y, max_y) = (seg.start.y.min(seg.end.y), seg.start.y.max(seg.end.y));

        for &j in &order[k + 1..] {
            let other = segments[j];
            if min_x(&other) > max_x {
                break;
            }
            if other.start.y.max(other.end.y) < min_y || other.start.y.min(other.end.y) > max_y {
                continue;
            }

            let (lo, hi) = (i.min(j), i.max(j));
            let adjacent = hi == lo + 1 || (lo == 0 && hi == n - 1);
            match line_intersection(seg, other) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(_) => return Some(lo),
            }
        }
    }
    None
}

fn min_x(line: &Line) -> f64 {
    line.start.x.min(line.end.x)
}
