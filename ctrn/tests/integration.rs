//! Tests d'intégration du pipeline complet (parser, fusion, écriture)

use std::io::Cursor;

use ctrn::{
    convert, convert_with_engine, Coord3, CtrnError, FeatureGeometry, FeatureKind,
    GeometryEngine, MemorySink, PlanarEngine, ProcessingConfig,
};

/// Enregistrement de sommet, coordonnées brutes en centièmes de mètre
fn rec(head: &str, layer: &str, x: i64, y: i64, role: &str, border: bool) -> String {
    format!(
        "{head}000{layer}V {x:08} {y:08} {z:06} {role} {b}R",
        z = 0,
        b = if border { 'B' } else { ' ' }
    )
}

fn run(lines: &[String], config: &ProcessingConfig) -> Result<MemorySink, CtrnError> {
    let mut sink = MemorySink::new();
    let input = lines.join("\n") + "\n99999\n";
    convert(Cursor::new(input), config, &mut sink)?;
    Ok(sink)
}

fn simplified(feature: &ctrn::output::WrittenFeature) -> Option<i64> {
    feature.attributes.get("simplified").and_then(|v| v.as_integer())
}

#[test]
fn test_border_fragments_merge_into_single_line() {
    // F1 [(0,0),(1,0)] dont le second est de bord, F2 [(1,0),(2,0)] dont le premier est de bord
    let lines = vec![
        rec("4L", "FV", 0, 0, "21", false),
        rec("4L", "FV", 100, 0, "23", true),
        rec("4L", "FV", 100, 0, "21", true),
        rec("4L", "FV", 200, 0, "23", false),
    ];
    let sink = run(&lines, &ProcessingConfig::default()).unwrap();

    assert_eq!(sink.len(), 1);
    let written = &sink.features()[0];
    assert_eq!(written.layer.name, "4LFV");
    assert_eq!(
        written.geometry,
        FeatureGeometry::LineString(vec![
            Coord3::new(2_000_000.0, 5_000_000.0, 0.0),
            Coord3::new(2_000_001.0, 5_000_000.0, 0.0),
            Coord3::new(2_000_002.0, 5_000_000.0, 0.0),
        ])
    );
    assert_eq!(simplified(written), Some(1));
}

#[test]
fn test_near_border_points_merge_areas() {
    let lines = vec![
        rec("5A", "ED", 0, 0, "41", false),
        rec("5A", "ED", 1000, 0, "42", true),
        rec("5A", "ED", 1000, 1000, "42", true),
        rec("5A", "ED", 0, 1000, "43", false),
        // Tuile voisine, bord décalé de 30 cm
        rec("5A", "ED", 1030, 0, "41", true),
        rec("5A", "ED", 2000, 0, "42", false),
        rec("5A", "ED", 2000, 1000, "42", false),
        rec("5A", "ED", 1030, 1000, "43", true),
    ];
    let sink = run(&lines, &ProcessingConfig::default()).unwrap();

    // Les deux carrés ne se touchent pas: l'union rend un MultiPolygon, mais
    // il n'en reste qu'une seule feature
    assert_eq!(sink.len(), 1);
    let written = &sink.features()[0];
    assert_eq!(written.geometry.dimension(), 2);
    let xs: Vec<f64> = written.geometry.coords().iter().map(|c| c.x).collect();
    assert!(xs.contains(&2_000_000.0));
    assert!(xs.contains(&2_000_020.0));
}

#[test]
fn test_adjacent_areas_union() {
    let lines = vec![
        rec("5A", "ED", 0, 0, "41", false),
        rec("5A", "ED", 1000, 0, "42", true),
        rec("5A", "ED", 1000, 1000, "42", true),
        rec("5A", "ED", 0, 1000, "43", false),
        rec("5A", "ED", 1000, 0, "41", true),
        rec("5A", "ED", 2000, 0, "42", false),
        rec("5A", "ED", 2000, 1000, "42", false),
        rec("5A", "ED", 1000, 1000, "43", true),
    ];
    let sink = run(&lines, &ProcessingConfig::default()).unwrap();

    assert_eq!(sink.len(), 1);
    let FeatureGeometry::Polygon(rings) = &sink.features()[0].geometry else {
        panic!("Expected a single Polygon");
    };
    assert_eq!(rings.len(), 1);
    let min_x = rings[0].iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
    let max_x = rings[0].iter().map(|c| c.x).fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(min_x, 2_000_000.0);
    assert_eq!(max_x, 2_000_020.0);
}

#[test]
fn test_text_label() {
    let lines = vec![
        "7T000TXV 00000100 00000200 000000 81".to_string(),
        "C 0012 00340 00056 000450".to_string(),
        "Tolmezzo".to_string(),
    ];
    let sink = run(&lines, &ProcessingConfig::default()).unwrap();

    assert_eq!(sink.len(), 1);
    let written = &sink.features()[0];
    assert_eq!(written.layer.name, "7TTX");
    assert!(matches!(written.geometry, FeatureGeometry::Point(_)));
    assert_eq!(
        written.attributes.get("content").and_then(|v| v.as_text()),
        Some("Tolmezzo")
    );
    assert_eq!(
        written.attributes.get("angle").and_then(|v| v.as_integer()),
        Some(450)
    );
    assert_eq!(simplified(written), Some(1));
}

#[test]
fn test_feature_without_border_points_is_complete() {
    let lines = vec![rec("2P", "QA", 500, 500, "11", false)];
    let sink = run(&lines, &ProcessingConfig::default()).unwrap();
    assert_eq!(simplified(&sink.features()[0]), Some(1));
}

#[test]
fn test_unmatched_border_point_emitted_as_fragment() {
    let lines = vec![
        rec("4L", "FV", 0, 0, "21", false),
        rec("4L", "FV", 100, 0, "23", true),
    ];
    let mut sink = MemorySink::new();
    let input = lines.join("\n") + "\n99999\n";
    let summary = convert(Cursor::new(input), &ProcessingConfig::default(), &mut sink).unwrap();

    assert_eq!(sink.len(), 1);
    assert_eq!(simplified(&sink.features()[0]), Some(0));
    assert_eq!(summary.unresolved_border_points(), 1);
}

#[test]
fn test_threshold_flush_keeps_pending_features() {
    let config = ProcessingConfig {
        serialization_threshold: 1,
        ..Default::default()
    };
    let lines = vec![
        // En attente: point de bord sans correspondance
        rec("4L", "FV", 0, 0, "21", false),
        rec("4L", "FV", 100, 0, "23", true),
        // Complètes
        rec("4L", "FV", 5000, 0, "21", false),
        rec("4L", "FV", 5100, 0, "23", false),
        rec("4L", "FV", 9000, 0, "21", false),
        rec("4L", "FV", 9100, 0, "23", false),
        // Correspondance tardive de la première feature
        rec("4L", "FV", 100, 0, "21", true),
        rec("4L", "FV", 200, 0, "23", false),
    ];
    let mut sink = MemorySink::new();
    let input = lines.join("\n") + "\n99999\n";
    let summary = convert(Cursor::new(input), &config, &mut sink).unwrap();

    // Les deux features complètes sont écrites avant la fusion tardive
    assert_eq!(sink.len(), 3);
    let first_x = |i: usize| sink.features()[i].geometry.coords()[0].x;
    assert_eq!(first_x(0), 2_000_050.0);
    assert_eq!(first_x(1), 2_000_090.0);

    let merged = &sink.features()[2];
    assert_eq!(merged.geometry.coords().len(), 3);
    assert_eq!(simplified(merged), Some(1));
    assert_eq!(summary.merges(), 1);
    assert!(summary.layers[0].stats.partial_flushes >= 1);
}

#[test]
fn test_cancelled_feature_dropped() {
    let lines = vec![
        "2P00CQAV 00000100 00000200 000000 11 R".to_string(),
        rec("2P", "QA", 500, 500, "11", false),
    ];
    let mut sink = MemorySink::new();
    let input = lines.join("\n") + "\n";
    let summary = convert(Cursor::new(input), &ProcessingConfig::default(), &mut sink).unwrap();

    assert_eq!(sink.len(), 1);
    assert_eq!(summary.cancelled(), 1);
    assert_eq!(summary.features, 2);
}

#[test]
fn test_terminator_stops_reading() {
    let input = format!(
        "{}\n99999\nthis line is not a record\n",
        rec("2P", "QA", 500, 500, "11", false)
    );
    let mut sink = MemorySink::new();
    let summary = convert(Cursor::new(input), &ProcessingConfig::default(), &mut sink).unwrap();
    assert_eq!(sink.len(), 1);
    assert_eq!(summary.records, 2);
    assert!(sink.is_finished());
}

#[test]
fn test_format_violation_is_fatal() {
    let lines = vec![
        rec("4L", "FV", 0, 0, "21", false),
        rec("4L", "FV", 100, 0, "22", false),
        rec("4L", "FV", 200, 0, "11", false),
    ];
    let err = run(&lines, &ProcessingConfig::default()).unwrap_err();
    assert!(matches!(err, CtrnError::Format { line: 3, .. }), "{err}");
}

#[test]
fn test_line_cannot_start_with_interior_vertex() {
    let lines = vec![rec("4L", "FV", 0, 0, "32", false)];
    assert!(matches!(
        run(&lines, &ProcessingConfig::default()),
        Err(CtrnError::Format { line: 1, .. })
    ));
}

#[test]
fn test_unclosed_feature_dropped() {
    let lines = vec![
        rec("2P", "QA", 500, 500, "11", false),
        rec("4L", "FV", 0, 0, "21", false),
    ];
    let mut sink = MemorySink::new();
    let input = lines.join("\n") + "\n";
    let summary = convert(Cursor::new(input), &ProcessingConfig::default(), &mut sink).unwrap();
    assert_eq!(sink.len(), 1);
    assert_eq!(summary.unclosed_dropped, 1);
}

#[test]
fn test_merge_disabled() {
    let config = ProcessingConfig {
        merge_enabled: false,
        ..Default::default()
    };
    let lines = vec![
        rec("4L", "FV", 0, 0, "21", false),
        rec("4L", "FV", 100, 0, "23", true),
        rec("4L", "FV", 100, 0, "21", true),
        rec("4L", "FV", 200, 0, "23", false),
    ];
    let sink = run(&lines, &config).unwrap();
    assert_eq!(sink.len(), 2);
    assert!(sink.features().iter().all(|f| simplified(f) == Some(2)));
}

#[test]
fn test_geographic_output() {
    let config = ProcessingConfig {
        geographic: true,
        ..Default::default()
    };
    let lines = vec!["2P000QAV 34624047 16490192 168652 11 R".to_string()];
    let sink = run(&lines, &config).unwrap();

    let written = &sink.features()[0];
    assert_eq!(written.layer.epsg(), 4326);
    let FeatureGeometry::Point(coord) = written.geometry else {
        panic!("Expected Point geometry");
    };
    assert!((coord.x - 12.7306).abs() < 1e-3, "lon={}", coord.x);
    assert!((coord.y - 46.6150).abs() < 1e-3, "lat={}", coord.y);
}

#[test]
fn test_near_gap_line_merges_in_both_modes() {
    // Bords décalés de 90 cm le long de X, vers Trieste
    let lines = vec![
        rec("4L", "FV", 42_500_000, 5_500_000, "21", false),
        rec("4L", "FV", 42_500_100, 5_500_000, "23", true),
        rec("4L", "FV", 42_500_190, 5_500_000, "21", true),
        rec("4L", "FV", 42_500_300, 5_500_000, "23", false),
    ];

    let projected = run(&lines, &ProcessingConfig::default()).unwrap();
    let geographic = run(
        &lines,
        &ProcessingConfig {
            geographic: true,
            ..Default::default()
        },
    )
    .unwrap();

    for sink in [&projected, &geographic] {
        assert_eq!(sink.len(), 1);
        let written = &sink.features()[0];
        let FeatureGeometry::LineString(coords) = &written.geometry else {
            panic!("Expected LineString, got {}", written.geometry.type_name());
        };
        assert_eq!(coords.len(), 3);
        assert_eq!(simplified(written), Some(1));
    }

    let FeatureGeometry::LineString(coords) = &geographic.features()[0].geometry else {
        unreachable!();
    };
    assert!((coords[0].x - 13.780883).abs() < 1e-4, "lon={}", coords[0].x);
    assert!((coords[0].y - 45.641839).abs() < 1e-4, "lat={}", coords[0].y);
}

#[test]
fn test_near_border_points_stay_separate_points() {
    let input = [
        rec("2P", "QA", 0, 0, "11", true),
        rec("2P", "QA", 50, 0, "11", true),
    ]
    .join("\n")
        + "\n99999\n";
    let mut sink = MemorySink::new();
    let summary = convert(Cursor::new(input), &ProcessingConfig::default(), &mut sink).unwrap();

    assert_eq!(sink.len(), 2);
    assert_eq!(summary.merge_failures(), 1);
    for written in sink.features() {
        assert!(
            written.layer.geometry_type.admits(&written.geometry),
            "{} written in a {} layer",
            written.geometry.type_name(),
            written.layer.geometry_type
        );
    }
    let mut states: Vec<i64> = sink.features().iter().filter_map(simplified).collect();
    states.sort();
    assert_eq!(states, vec![0, 1]);
}

/// Moteur qui refuse toute union
struct RefusingEngine(PlanarEngine);

impl GeometryEngine for RefusingEngine {
    fn build(&self, kind: FeatureKind, coords: &[Coord3]) -> Result<FeatureGeometry, CtrnError> {
        self.0.build(kind, coords)
    }

    fn union(
        &self,
        _a: &FeatureGeometry,
        _b: &FeatureGeometry,
    ) -> Result<FeatureGeometry, CtrnError> {
        Err(CtrnError::geometry("union refused"))
    }
}

#[test]
fn test_merge_failure_keeps_fragments() {
    let lines = vec![
        rec("4L", "FV", 0, 0, "21", false),
        rec("4L", "FV", 100, 0, "23", true),
        rec("4L", "FV", 100, 0, "21", true),
        rec("4L", "FV", 200, 0, "23", false),
    ];
    let input = lines.join("\n") + "\n";
    let mut sink = MemorySink::new();
    let summary = convert_with_engine(
        Cursor::new(input),
        &ProcessingConfig::default(),
        &mut sink,
        RefusingEngine(PlanarEngine::new(1.0)),
    )
    .unwrap();

    assert_eq!(sink.len(), 2);
    assert_eq!(summary.merge_failures(), 1);
    // F1 a perdu son point de bord (consommé), F2 est marquée fragment
    assert_eq!(simplified(&sink.features()[0]), Some(1));
    assert_eq!(simplified(&sink.features()[1]), Some(0));
}
