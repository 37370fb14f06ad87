//! Types de données pour le crate ctrn

use std::fmt;

use crate::geometry::FeatureGeometry;

/// Classe d'une feature (colonne 1 de l'enregistrement d'ouverture)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Point,
    Line,
    Area,
    Text,
}

impl FeatureKind {
    /// Décode le code de type CTRN (`P`, `L`, `A`, `T`)
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'P' => Some(Self::Point),
            'L' => Some(Self::Line),
            'A' => Some(Self::Area),
            'T' => Some(Self::Text),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Point => 'P',
            Self::Line => 'L',
            Self::Area => 'A',
            Self::Text => 'T',
        }
    }

    /// Rôle géométrique associé (les textes sont des points d'ancrage)
    pub fn geometry_type(self) -> GeometryType {
        match self {
            Self::Point | Self::Text => GeometryType::Point25D,
            Self::Line => GeometryType::LineString25D,
            Self::Area => GeometryType::Polygon25D,
        }
    }
}

/// Type géométrique d'une couche, toujours avec Z
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point25D,
    LineString25D,
    Polygon25D,
}

impl GeometryType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Point25D => "Point25D",
            Self::LineString25D => "LineString25D",
            Self::Polygon25D => "Polygon25D",
        }
    }

    /// La géométrie peut être écrite dans une couche de ce type
    ///
    /// Lignes et surfaces acceptent plusieurs parties, pas les points.
    pub fn admits(self, geometry: &FeatureGeometry) -> bool {
        matches!(
            (self, geometry),
            (Self::Point25D, FeatureGeometry::Point(_))
                | (
                    Self::LineString25D,
                    FeatureGeometry::LineString(_) | FeatureGeometry::MultiLineString(_)
                )
                | (
                    Self::Polygon25D,
                    FeatureGeometry::Polygon(_) | FeatureGeometry::MultiPolygon(_)
                )
        )
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Visibilité d'un sommet (colonne 7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
    Cut,
}

impl Visibility {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'V' => Some(Self::Visible),
            'I' => Some(Self::Hidden),
            'T' => Some(Self::Cut),
            _ => None,
        }
    }
}

/// Position ordinale d'un sommet dans sa feature (second chiffre du code rôle)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexPosition {
    First,
    Middle,
    Last,
}

impl VertexPosition {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '1' => Some(Self::First),
            '2' => Some(Self::Middle),
            '3' => Some(Self::Last),
            _ => None,
        }
    }
}

/// État de simplification, exporté dans l'attribut `simplified`
///
/// Les transitions sont à sens unique: `NotEvaluated` vers l'un des deux autres.
/// Une feature sans point de bord et une feature fusionnée avec succès
/// aboutissent toutes deux à `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifiedState {
    /// Fragment laissé tel quel (fusion échouée ou point de bord non résolu)
    Fragment = 0,
    /// Aucun point de bord en attente
    Complete = 1,
    /// Pas encore évalué
    NotEvaluated = 2,
}

impl SimplifiedState {
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Fragment),
            1 => Some(Self::Complete),
            2 => Some(Self::NotEvaluated),
            _ => None,
        }
    }
}

/// Valeur d'attribut: entier ou texte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Integer(i64),
    Text(String),
}

impl AttributeValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Integer(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Attributs d'une feature, dans l'ordre d'insertion
///
/// L'ordre est conservé pour que le schéma des couches de sortie suive l'ordre
/// de découverte des champs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insère ou remplace une valeur
    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
