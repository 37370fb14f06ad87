//! Géométries 2.5D des features et moteur géométrique
//!
//! Les géométries `geo` n'ont pas de Z: les features portent donc leur propre
//! représentation (`FeatureGeometry`), convertie vers `geo` uniquement le temps
//! d'une union de polygones, et exposée à geozero pour l'écriture (GeoJSON, WKT).

pub mod engine;
pub mod merge;
pub mod validate;

pub use engine::{GeometryEngine, PlanarEngine};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geozero::wkt::WktWriter;
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry};

/// Coordonnée avec altitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(self) -> Coord {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Géométrie d'une feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Point(Coord3),
    MultiPoint(Vec<Coord3>),
    LineString(Vec<Coord3>),
    MultiLineString(Vec<Vec<Coord3>>),
    /// Anneau extérieur puis trous
    Polygon(Vec<Vec<Coord3>>),
    MultiPolygon(Vec<Vec<Vec<Coord3>>>),
}

impl FeatureGeometry {
    /// Dimension topologique (0 ponctuel, 1 linéaire, 2 surfacique)
    pub fn dimension(&self) -> u8 {
        match self {
            Self::Point(_) | Self::MultiPoint(_) => 0,
            Self::LineString(_) | Self::MultiLineString(_) => 1,
            Self::Polygon(_) | Self::MultiPolygon(_) => 2,
        }
    }

    /// Nom du type, sans suffixe de dimension
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::MultiPoint(_) => "MultiPoint",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Toutes les coordonnées, dans l'ordre d'écriture
    pub fn coords(&self) -> Vec<Coord3> {
        match self {
            Self::Point(c) => vec![*c],
            Self::MultiPoint(points) | Self::LineString(points) => points.clone(),
            Self::MultiLineString(lines) | Self::Polygon(lines) => {
                lines.iter().flatten().copied().collect()
            }
            Self::MultiPolygon(polygons) => polygons.iter().flatten().flatten().copied().collect(),
        }
    }

    /// Applique `f` à chaque coordonnée, structure conservée
    pub fn try_map_coords<E>(
        &self,
        mut f: impl FnMut(Coord3) -> Result<Coord3, E>,
    ) -> Result<FeatureGeometry, E> {
        let f = &mut f;
        Ok(match self {
            Self::Point(c) => Self::Point(f(*c)?),
            Self::MultiPoint(points) => Self::MultiPoint(map_coords(points, f)?),
            Self::LineString(line) => Self::LineString(map_coords(line, f)?),
            Self::MultiLineString(lines) => Self::MultiLineString(map_rings(lines, f)?),
            Self::Polygon(rings) => Self::Polygon(map_rings(rings, f)?),
            Self::MultiPolygon(polygons) => Self::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| map_rings(rings, f))
                    .collect::<Result<_, E>>()?,
            ),
        })
    }

    /// Polygones `geo` (2D) pour les opérations booléennes
    pub fn to_geo_polygons(&self) -> Option<MultiPolygon> {
        match self {
            Self::Polygon(rings) => Some(MultiPolygon::new(vec![rings_to_geo(rings)])),
            Self::MultiPolygon(polygons) => Some(MultiPolygon::new(
                polygons.iter().map(|rings| rings_to_geo(rings)).collect(),
            )),
            _ => None,
        }
    }

    /// Rendu WKT avec Z
    pub fn to_wkt(&self) -> String {
        let mut buf = Vec::new();
        let mut writer = WktWriter::with_dims(&mut buf, CoordDimensions::xyz());
        // L'écriture dans un Vec ne peut pas échouer
        if self.process_geom(&mut writer).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn map_coords<E>(
    coords: &[Coord3],
    f: &mut impl FnMut(Coord3) -> Result<Coord3, E>,
) -> Result<Vec<Coord3>, E> {
    coords.iter().map(|&c| f(c)).collect()
}

fn map_rings<E>(
    rings: &[Vec<Coord3>],
    f: &mut impl FnMut(Coord3) -> Result<Coord3, E>,
) -> Result<Vec<Vec<Coord3>>, E> {
    rings.iter().map(|ring| map_coords(ring, f)).collect()
}

fn rings_to_geo(rings: &[Vec<Coord3>]) -> Polygon {
    let mut rings = rings
        .iter()
        .map(|ring| LineString::new(ring.iter().map(|c| c.xy()).collect()));
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

impl GeozeroGeometry for FeatureGeometry {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> geozero::error::Result<()> {
        match self {
            Self::Point(coord) => {
                processor.point_begin(0)?;
                process_coord(coord, 0, processor)?;
                processor.point_end(0)
            }
            Self::MultiPoint(points) => {
                processor.multipoint_begin(points.len(), 0)?;
                for (i, coord) in points.iter().enumerate() {
                    process_coord(coord, i, processor)?;
                }
                processor.multipoint_end(0)
            }
            Self::LineString(coords) => process_linestring(coords, true, 0, processor),
            Self::MultiLineString(lines) => {
                processor.multilinestring_begin(lines.len(), 0)?;
                for (i, line) in lines.iter().enumerate() {
                    process_linestring(line, false, i, processor)?;
                }
                processor.multilinestring_end(0)
            }
            Self::Polygon(rings) => process_polygon(rings, true, 0, processor),
            Self::MultiPolygon(polygons) => {
                processor.multipolygon_begin(polygons.len(), 0)?;
                for (i, rings) in polygons.iter().enumerate() {
                    process_polygon(rings, false, i, processor)?;
                }
                processor.multipolygon_end(0)
            }
        }
    }

    fn dims(&self) -> CoordDimensions {
        CoordDimensions::xyz()
    }
}

fn process_coord<P: GeomProcessor>(
    coord: &Coord3,
    idx: usize,
    processor: &mut P,
) -> geozero::error::Result<()> {
    if processor.multi_dim() {
        processor.coordinate(coord.x, coord.y, Some(coord.z), None, None, None, idx)
    } else {
        processor.xy(coord.x, coord.y, idx)
    }
}

fn process_linestring<P: GeomProcessor>(
    coords: &[Coord3],
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> geozero::error::Result<()> {
    processor.linestring_begin(tagged, coords.len(), idx)?;
    for (i, coord) in coords.iter().enumerate() {
        process_coord(coord, i, processor)?;
    }
    processor.linestring_end(tagged, idx)
}

fn process_polygon<P: GeomProcessor>(
    rings: &[Vec<Coord3>],
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> geozero::error::Result<()> {
    processor.polygon_begin(tagged, rings.len(), idx)?;
    for (i, ring) in rings.iter().enumerate() {
        process_linestring(ring, false, i, processor)?;
    }
    processor.polygon_end(tagged, idx)
}
