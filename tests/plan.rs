use std::path::Path;

use geojson_purge::model::{Coord, Feature, FeatureCollection, Geometry, Properties, PropertyValue};
use geojson_purge::{load_collection, run, Operation, OperationKind, PlanConfig};
use pretty_assertions::assert_eq;

fn drawing() -> FeatureCollection {
    load_collection(&Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/drawing.geojson"))
        .unwrap()
}

#[test]
fn merge_all_picks_values_shared_by_two_or_more() {
    let plan = PlanConfig::from_json(r#"{"merge": {"layers": "all"}}"#).unwrap();
    assert_eq!(
        plan.resolve(&drawing()),
        vec![Operation::MergeLayers {
            key: "Layer".to_string(),
            values: vec!["fence".into(), "wall".into()],
        }]
    );
}

#[test]
fn layer_names_match_non_string_values() {
    let numbered = |n: i64| {
        let mut properties = Properties::new();
        properties.insert("Level".to_string(), n.into());
        Feature::new(Geometry::Point(Coord::xy(n as f64, 0.0)), properties)
    };
    let fc = FeatureCollection::new(vec![numbered(5), numbered(5), numbered(6)]);

    let plan = PlanConfig::from_json(
        r#"{"merge": {"key": "Level", "layers": {"values": ["5", "basement"]}}}"#,
    )
    .unwrap();
    assert_eq!(
        plan.resolve(&fc),
        vec![Operation::MergeLayers {
            key: "Level".to_string(),
            values: vec![PropertyValue::from(5_i64), PropertyValue::from("basement")],
        }]
    );
}

#[test]
fn all_except_expands_to_the_other_keys() {
    let plan = PlanConfig::from_json(r#"{"delete_properties": {"all_except": ["Layer"]}}"#)
        .unwrap();
    assert_eq!(
        plan.resolve(&drawing()),
        vec![Operation::DeleteProperties {
            keys: vec![
                "Color".to_string(),
                "Height".to_string(),
                "EntityHandle".to_string()
            ],
        }]
    );
}

#[test]
fn operations_come_out_in_fixed_order() {
    let plan = PlanConfig::from_json(
        r#"{
            "truncate": 4,
            "remove_z": true,
            "delete_properties": {"keys": ["Color"]},
            "merge": {"layers": {"values": ["fence"]}}
        }"#,
    )
    .unwrap();
    let kinds: Vec<OperationKind> = plan.resolve(&drawing()).iter().map(Operation::kind).collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::MergeLayers,
            OperationKind::DeleteProperties,
            OperationKind::RemoveZ,
            OperationKind::Truncate,
        ]
    );
}

#[test]
fn keeping_everything_skips_the_delete_step() {
    let plan = PlanConfig::from_json(
        r#"{"delete_properties": {"all_except": ["Layer", "Color", "Height", "EntityHandle"]}}"#,
    )
    .unwrap();
    let input = drawing();
    let operations = plan.resolve(&input);
    let (out, report) = run(input.clone(), &operations).unwrap();
    assert_eq!(out, input);
    assert_eq!(report.steps[0].to_string(), "delete properties: skipped, nothing selected");
}
