//! Sommet mesuré d'une feature

use std::cell::OnceCell;

use crate::geometry::Coord3;
use crate::reproject::Reprojector;
use crate::types::{VertexPosition, Visibility};
use crate::CtrnError;

/// Décalage ajouté à l'abscisse brute (centièmes de mètre)
pub const X_OFFSET: i64 = 200_000_000;
/// Décalage ajouté à l'ordonnée brute (centièmes de mètre)
pub const Y_OFFSET: i64 = 500_000_000;
/// Valeur brute signifiant "altitude inconnue"
pub const NO_HEIGHT: &str = "999999";

/// Sommet en coordonnées métriques (Gauss-Boaga Est)
///
/// Les coordonnées sont figées à la construction. Les coordonnées géographiques
/// sont calculées au premier accès puis conservées.
#[derive(Debug, Clone)]
pub struct Point {
    x: f64,
    y: f64,
    z: f64,
    border: bool,
    visibility: Visibility,
    edit_type: Option<char>,
    position: VertexPosition,
    geographic: OnceCell<Coord3>,
}

impl Point {
    /// Construit un sommet depuis des coordonnées métriques
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            border: false,
            visibility: Visibility::Visible,
            edit_type: None,
            position: VertexPosition::Middle,
            geographic: OnceCell::new(),
        }
    }

    /// Normalise les champs entiers bruts d'un enregistrement
    pub fn from_raw(raw_x: i64, raw_y: i64, raw_z: i64) -> Self {
        Self::new(
            (raw_x + X_OFFSET) as f64 / 100.0,
            (raw_y + Y_OFFSET) as f64 / 100.0,
            raw_z as f64 / 100.0,
        )
    }

    /// Positionne les drapeaux lus par le parser
    pub fn with_flags(
        mut self,
        border: bool,
        visibility: Visibility,
        edit_type: Option<char>,
        position: VertexPosition,
    ) -> Self {
        self.border = border;
        self.visibility = visibility;
        self.edit_type = edit_type;
        self.position = position;
        self
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn coord(&self) -> Coord3 {
        Coord3::new(self.x, self.y, self.z)
    }

    /// Sommet sur un bord de tuile, candidat à la fusion
    pub fn is_border(&self) -> bool {
        self.border
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn edit_type(&self) -> Option<char> {
        self.edit_type
    }

    pub fn position(&self) -> VertexPosition {
        self.position
    }

    pub fn is_first(&self) -> bool {
        self.position == VertexPosition::First
    }

    pub fn is_last(&self) -> bool {
        self.position == VertexPosition::Last
    }

    /// Proximité planimétrique: |dx| et |dy| strictement sous la tolérance
    pub fn near(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance && (self.y - other.y).abs() < tolerance
    }

    /// Coordonnées géographiques (lon, lat, h), calculées une seule fois
    pub fn geographic(&self, reprojector: &Reprojector) -> Result<Coord3, CtrnError> {
        if let Some(coord) = self.geographic.get() {
            return Ok(*coord);
        }
        let coord = reprojector.transform(self.x, self.y, self.z)?;
        let _ = self.geographic.set(coord);
        Ok(coord)
    }
}

/// Égalité planimétrique exacte, Z ignoré
impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}
