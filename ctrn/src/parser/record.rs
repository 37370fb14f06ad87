//! Extraction des champs d'un enregistrement à largeur fixe
//!
//! ```text
//! 4A000AFV 34624047 16490192 168652 21 IR
//! 1234567fbEEEEEEEEbNNNNNNNNbQQQQQQbccbkw
//! 012345678901234567890123456789012345678
//!           1         2         3
//! ```

use std::ops::Range;

use crate::feature::Feature;
use crate::point::{Point, NO_HEIGHT};
use crate::types::{FeatureKind, VertexPosition, Visibility};
use crate::CtrnError;

pub const SECTION: Range<usize> = 0..1;
pub const KIND: Range<usize> = 1..2;
pub const REVISION: Range<usize> = 2..5;
pub const LAYER: Range<usize> = 5..7;
pub const VISIBILITY: Range<usize> = 7..8;
pub const RAW_X: Range<usize> = 9..17;
pub const RAW_Y: Range<usize> = 18..26;
pub const RAW_Z: Range<usize> = 27..33;
pub const ROLE: Range<usize> = 34..36;
pub const POSITION: Range<usize> = 35..36;
pub const BORDER: Range<usize> = 37..38;
pub const EDIT_TYPE: Range<usize> = 38..39;

// Métadonnées d'étiquette (second enregistrement d'un texte)
pub const TEXT_POSITION: Range<usize> = 0..1;
pub const TEXT_NUM_CHAR: Range<usize> = 2..6;
pub const TEXT_BOX_X: Range<usize> = 7..12;
pub const TEXT_BOX_Y: Range<usize> = 13..18;
pub const TEXT_ANGLE: Range<usize> = 19..25;

/// Vue sur une ligne d'entrée
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    line: &'a str,
    line_no: usize,
}

impl<'a> Record<'a> {
    pub fn new(line: &'a str, line_no: usize) -> Self {
        Self { line, line_no }
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Champ optionnel (absent si la ligne est trop courte)
    pub fn get(&self, range: Range<usize>) -> Option<&'a str> {
        self.line.get(range)
    }

    /// Champ obligatoire
    pub fn field(&self, range: Range<usize>, name: &str) -> Result<&'a str, CtrnError> {
        self.get(range.clone()).ok_or_else(|| {
            CtrnError::format(
                self.line_no,
                format!(
                    "missing {name} (columns {}..{}, record has {} bytes)",
                    range.start,
                    range.end,
                    self.line.len()
                ),
            )
        })
    }

    fn char_field(&self, range: Range<usize>, name: &str) -> Result<char, CtrnError> {
        self.field(range, name)?
            .chars()
            .next()
            .ok_or_else(|| CtrnError::format(self.line_no, format!("empty {name}")))
    }

    /// Entier lu de façon permissive, 0 si absent
    pub fn int_or_zero(&self, range: Range<usize>) -> i64 {
        self.get(range).map(lenient_int).unwrap_or(0)
    }

    /// Code rôle du sommet
    pub fn role(&self) -> Result<&'a str, CtrnError> {
        self.field(ROLE, "role code")
    }

    /// Clé de catégorie (section + type + couche)
    pub fn category_key(&self) -> Result<String, CtrnError> {
        let head = self.field(0..2, "section/type")?;
        let layer = self.field(LAYER, "layer")?;
        Ok(format!("{head}{layer}"))
    }

    /// Ouvre une feature à partir de l'en-tête
    pub fn open_feature(&self, source_tag: &str) -> Result<Feature, CtrnError> {
        let section = self.field(SECTION, "section")?;
        let code = self.char_field(KIND, "type code")?;
        let kind = FeatureKind::from_code(code).ok_or_else(|| {
            CtrnError::format(self.line_no, format!("unknown type code '{code}'"))
        })?;
        let revision = self.field(REVISION, "revision")?;
        let layer = self.field(LAYER, "layer")?;

        Ok(Feature::new(section, kind, revision, layer, source_tag))
    }

    /// Construit le sommet porté par l'enregistrement
    pub fn point(&self) -> Result<Point, CtrnError> {
        let visibility_code = self.char_field(VISIBILITY, "visibility")?;
        let visibility = Visibility::from_code(visibility_code).ok_or_else(|| {
            CtrnError::format(
                self.line_no,
                format!("unknown visibility '{visibility_code}'"),
            )
        })?;

        let raw_x = lenient_int(self.field(RAW_X, "x")?);
        let raw_y = lenient_int(self.field(RAW_Y, "y")?);
        let raw_z = match self.field(RAW_Z, "z")? {
            NO_HEIGHT => 0,
            z => lenient_int(z),
        };

        let position_code = self.char_field(POSITION, "position")?;
        let position = VertexPosition::from_code(position_code).ok_or_else(|| {
            CtrnError::format(self.line_no, format!("unknown position '{position_code}'"))
        })?;

        let border = self.get(BORDER) == Some("B");
        let edit_type = self
            .get(EDIT_TYPE)
            .and_then(|s| s.chars().next())
            .filter(|c| !c.is_whitespace());

        Ok(Point::from_raw(raw_x, raw_y, raw_z).with_flags(border, visibility, edit_type, position))
    }
}

/// Lecture entière permissive
///
/// Espaces initiaux ignorés, signe optionnel, puis chiffres tant qu'il y en a.
/// Toute autre entrée vaut 0.
pub fn lenient_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}
