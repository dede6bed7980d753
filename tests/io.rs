use std::fs;
use std::path::{Path, PathBuf};

use geojson_purge::model::{Coord, Geometry, PropertyValue};
use geojson_purge::{load_collection, run, save_collection, Operation, PurgeError};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempdir::TempDir;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/drawing.geojson")
}

#[test]
fn untouched_collection_survives_a_round_trip() {
    let dir = TempDir::new("geojson_purge_io").unwrap();
    let out = dir.path().join("copy.geojson");

    let original = load_collection(&fixture()).unwrap();
    assert_eq!(original.len(), 5);
    save_collection(&out, &original, false).unwrap();
    let reloaded = load_collection(&out).unwrap();
    assert_eq!(reloaded, original);

    let written: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["name"], Value::from("site_plan"));
    assert_eq!(written["features"][2]["id"], Value::from(3));
    let keys: Vec<&str> = written["features"][0]["properties"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["Layer", "Color", "Height", "EntityHandle"]);
}

#[test]
fn processed_file_is_smaller_and_clean() {
    let dir = TempDir::new("geojson_purge_io").unwrap();
    let out = dir.path().join("drawing-processed.geojson");

    let collection = load_collection(&fixture()).unwrap();
    let plan = [
        Operation::MergeLayers {
            key: "Layer".to_string(),
            values: vec!["fence".into()],
        },
        Operation::DeleteProperties {
            keys: vec!["Color".to_string(), "EntityHandle".to_string()],
        },
        Operation::RemoveZ,
        Operation::Truncate { decimal_places: 3 },
    ];
    let (collection, _) = run(collection, &plan).unwrap();
    save_collection(&out, &collection, false).unwrap();

    let before = fs::metadata(fixture()).unwrap().len();
    let after = fs::metadata(&out).unwrap().len();
    assert!(after < before, "{after} >= {before}");

    let reloaded = load_collection(&out).unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(
        reloaded.features[0].property("Layer"),
        Some(&PropertyValue::from("fence"))
    );

    let wall = &reloaded.features[1];
    let keys: Vec<&str> = wall.properties.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Layer", "Height"]);
    assert_eq!(
        wall.geometry,
        Geometry::LineString(vec![Coord::xy(0.123, 5.988), Coord::xy(4.0, 5.988)])
    );

    for feature in &reloaded.features {
        feature
            .geometry
            .for_each_coord(|c| assert_eq!(c.dimensions(), 2));
    }
}

#[test]
fn single_feature_is_wrapped() {
    let dir = TempDir::new("geojson_purge_io").unwrap();
    let path = dir.path().join("one.geojson");
    fs::write(
        &path,
        r#"{"type": "Feature", "properties": {"Layer": "wall"},
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}"#,
    )
    .unwrap();

    let collection = load_collection(&path).unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(
        collection.features[0].geometry,
        Geometry::Point(Coord::xy(1.0, 2.0))
    );
}

#[test]
fn bare_geometry_is_rejected() {
    let dir = TempDir::new("geojson_purge_io").unwrap();
    let path = dir.path().join("point.geojson");
    fs::write(&path, r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#).unwrap();

    let err = load_collection(&path).unwrap_err();
    assert!(matches!(err, PurgeError::UnsupportedDocument { .. }), "{err}");
}

#[test]
fn bad_geometry_is_reported_with_its_feature() {
    let dir = TempDir::new("geojson_purge_io").unwrap();
    let path = dir.path().join("circle.geojson");
    fs::write(
        &path,
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"Layer": "wall"},
             "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
            {"type": "Feature", "properties": {"Layer": "wall"},
             "geometry": {"type": "LineString", "coordinates": [1.0, 2.0]}}
        ]}"#,
    )
    .unwrap();

    let err = load_collection(&path).unwrap_err();
    assert!(
        matches!(&err, PurgeError::InvalidGeometryVariant { feature: 1, .. }),
        "{err}"
    );
    assert_eq!(
        err.to_string(),
        "feature 1: invalid LineString geometry: coordinates do not match the geometry type"
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_collection(Path::new("does/not/exist.geojson")).unwrap_err();
    assert!(matches!(err, PurgeError::Io(_)), "{err}");
}
