//! Parser d'enregistrements CTRN
//!
//! Machine à états qui reconstruit les features à partir de la suite des
//! enregistrements. Une feature est rendue à l'appelant dès sa fermeture.

pub mod record;

use std::borrow::Cow;

use tracing::trace;

use crate::feature::{Feature, DEFAULT_SOURCE_TAG};
use crate::types::FeatureKind;
use crate::CtrnError;
pub use record::{lenient_int, Record};

/// Préfixe de la ligne de fin de fichier
pub const TERMINATOR: &str = "99999";

/// Ligne de fin de fichier
pub fn is_terminator(line: &str) -> bool {
    line.starts_with(TERMINATOR)
}

/// Décode une ligne brute (UTF-8, sinon Windows-1252) sans fin de ligne
pub fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = trim_line_ending(bytes);
    match simdutf8::basic::from_utf8(bytes) {
        Ok(line) => Cow::Borrowed(line),
        Err(_) => {
            let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            decoded
        }
    }
}

fn trim_line_ending(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = bytes {
        bytes = rest;
    }
    bytes
}

/// État du parser entre deux enregistrements
#[derive(Debug)]
pub struct RecordParser {
    current: Option<Feature>,
    text_stage: u8,
    line_no: usize,
    source_tag: String,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_TAG)
    }
}

impl RecordParser {
    pub fn new(source_tag: impl Into<String>) -> Self {
        Self {
            current: None,
            text_stage: 0,
            line_no: 0,
            source_tag: source_tag.into(),
        }
    }

    /// Numéro de la dernière ligne lue
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Feature en cours de construction
    pub fn current(&self) -> Option<&Feature> {
        self.current.as_ref()
    }

    /// Traite un enregistrement
    ///
    /// Retourne la feature si cet enregistrement l'a fermée. Toute violation du
    /// format est fatale.
    pub fn parse_record(&mut self, line: &str) -> Result<Option<Feature>, CtrnError> {
        self.line_no += 1;
        if is_terminator(line) {
            return Ok(None);
        }

        let record = Record::new(line, self.line_no);
        let mut feature = match self.current.take() {
            None => {
                let feature = record.open_feature(&self.source_tag)?;
                trace!("Line {}: opening {}", self.line_no, feature.code());
                feature
            }
            Some(feature) => {
                if feature.kind() != FeatureKind::Text {
                    let key = record.category_key()?;
                    if key != feature.name() {
                        return Err(CtrnError::format(
                            self.line_no,
                            format!(
                                "record category {key} inside open feature {}",
                                feature.name()
                            ),
                        ));
                    }
                }
                feature
            }
        };

        if feature.kind() == FeatureKind::Text && self.text_stage > 0 {
            return Ok(self.parse_text_record(&record, feature));
        }

        let closes = self.check_role(&record, &feature)?;
        feature.add_point(record.point()?);

        if closes {
            feature.close();
            Ok(Some(feature))
        } else {
            self.current = Some(feature);
            Ok(None)
        }
    }

    /// Vérifie le code rôle; retourne `true` s'il ferme la feature
    fn check_role(&mut self, record: &Record<'_>, feature: &Feature) -> Result<bool, CtrnError> {
        let role = record.role()?;
        let kind = feature.kind();
        let is_point = kind == FeatureKind::Point;

        let valid = match role {
            "11" => is_point,
            "21" | "31" | "41" => !is_point && feature.is_empty(),
            "22" | "32" | "42" | "23" | "33" | "43" => !is_point && !feature.is_empty(),
            "81" => {
                self.text_stage = 1;
                kind == FeatureKind::Text
            }
            other => {
                return Err(CtrnError::format(
                    record.line_no(),
                    format!("unknown role code '{other}'"),
                ))
            }
        };

        if !valid {
            return Err(CtrnError::format(
                record.line_no(),
                format!(
                    "role {role} not allowed for {} with {} point(s)",
                    feature.code(),
                    feature.points().len()
                ),
            ));
        }

        Ok(matches!(role, "11" | "23" | "33" | "43"))
    }

    /// Enregistrements 2 et 3 d'une étiquette: métadonnées puis contenu
    fn parse_text_record(&mut self, record: &Record<'_>, mut feature: Feature) -> Option<Feature> {
        if self.text_stage == 1 {
            feature.set_attribute("position", record.get(record::TEXT_POSITION).unwrap_or(""));
            feature.set_attribute("num_char", record.int_or_zero(record::TEXT_NUM_CHAR));
            feature.set_attribute("box_x", record.int_or_zero(record::TEXT_BOX_X));
            feature.set_attribute("box_y", record.int_or_zero(record::TEXT_BOX_Y));
            feature.set_attribute("angle", record.int_or_zero(record::TEXT_ANGLE));
            self.text_stage = 2;
            self.current = Some(feature);
            None
        } else {
            feature.set_attribute("content", record.line().trim());
            self.text_stage = 0;
            feature.close();
            Some(feature)
        }
    }

    /// Fin d'entrée: rend une feature restée ouverte
    pub fn finish(&mut self) -> Option<Feature> {
        self.text_stage = 0;
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;

    fn parse_all(parser: &mut RecordParser, lines: &[&str]) -> Result<Vec<Feature>, CtrnError> {
        let mut closed = Vec::new();
        for line in lines {
            if let Some(feature) = parser.parse_record(line)? {
                closed.push(feature);
            }
        }
        Ok(closed)
    }

    #[test]
    fn test_point_feature() {
        let mut parser = RecordParser::default();
        let closed = parse_all(&mut parser, &["2P000QAV 00000100 00000200 000300 11"]).unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].points().len(), 1);
        assert!(closed[0].is_closed());
        assert!(parser.current().is_none());
    }

    #[test]
    fn test_line_accumulates_in_order() {
        let mut parser = RecordParser::default();
        let closed = parse_all(
            &mut parser,
            &[
                "4L000AFV 00000100 00000200 000000 21",
                "4L000AFV 00000200 00000200 000000 22",
                "4L000AFV 00000300 00000200 000000 22",
                "4L000AFV 00000400 00000200 000000 23",
            ],
        )
        .unwrap();
        assert_eq!(closed.len(), 1);
        let xs: Vec<f64> = closed[0].points().iter().map(|p| p.x()).collect();
        assert_eq!(xs, vec![2000001.0, 2000002.0, 2000003.0, 2000004.0]);
    }

    #[test]
    fn test_text_triplet() {
        let mut parser = RecordParser::default();
        let closed = parse_all(
            &mut parser,
            &[
                "7T000TXV 00000100 00000200 000000 81",
                "C 0012 00340 00056 -00450",
                "  Monte Coglians  ",
            ],
        )
        .unwrap();
        assert_eq!(closed.len(), 1);
        let text = &closed[0];
        assert_eq!(text.points().len(), 1);
        assert_eq!(text.attribute("position"), Some(&AttributeValue::from("C")));
        assert_eq!(text.attribute("num_char"), Some(&AttributeValue::from(12_i64)));
        assert_eq!(text.attribute("box_x"), Some(&AttributeValue::from(340_i64)));
        assert_eq!(text.attribute("box_y"), Some(&AttributeValue::from(56_i64)));
        assert_eq!(text.attribute("angle"), Some(&AttributeValue::from(-450_i64)));
        assert_eq!(
            text.attribute("content"),
            Some(&AttributeValue::from("Monte Coglians"))
        );
        assert!(text.attribute("simplified").is_some());
    }

    #[test]
    fn test_interior_role_without_first_vertex() {
        let mut parser = RecordParser::default();
        let err = parser
            .parse_record("4L000AFV 00000100 00000200 000000 22")
            .unwrap_err();
        assert!(matches!(err, CtrnError::Format { line: 1, .. }));

        let mut parser = RecordParser::default();
        assert!(parser
            .parse_record("4L000AFV 00000100 00000200 000000 23")
            .is_err());
    }

    #[test]
    fn test_point_role_on_line_rejected() {
        let mut parser = RecordParser::default();
        assert!(parser
            .parse_record("4L000AFV 00000100 00000200 000000 11")
            .is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let mut parser = RecordParser::default();
        assert!(parser
            .parse_record("4L000AFV 00000100 00000200 000000 99")
            .is_err());
    }

    #[test]
    fn test_category_mismatch_rejected() {
        let mut parser = RecordParser::default();
        parser
            .parse_record("4L000AFV 00000100 00000200 000000 21")
            .unwrap();
        let err = parser
            .parse_record("4L000BGV 00000200 00000200 000000 22")
            .unwrap_err();
        assert!(matches!(err, CtrnError::Format { line: 2, .. }));
    }

    #[test]
    fn test_terminator_keeps_state() {
        let mut parser = RecordParser::default();
        parser
            .parse_record("4L000AFV 00000100 00000200 000000 21")
            .unwrap();
        assert!(parser.parse_record("99999").unwrap().is_none());
        assert!(parser.current().is_some());
        let unclosed = parser.finish().unwrap();
        assert_eq!(unclosed.points().len(), 1);
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"4L000AFV\r\n"), "4L000AFV");
        // 0xE8 = 'è' en Windows-1252
        assert_eq!(decode_line(b"Citt\xe8\n"), "Cittè");
    }
}
