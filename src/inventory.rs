use indexmap::IndexMap;

use crate::model::{FeatureCollection, PropertyValue};

/// Merging a group of one is a no-op, so a value needs at least this many
/// features to be offered for merging
pub const MIN_MERGE_GROUP: usize = 2;

/// Count the features carrying each value of `key`, in first-seen order.
///
/// Features without the key, or with a `null` or empty-string value, are not
/// counted.
pub fn inventory_by_key(
    collection: &FeatureCollection,
    key: &str,
) -> IndexMap<PropertyValue, usize> {
    let mut counts = IndexMap::new();
    for value in collection
        .features
        .iter()
        .filter_map(|f| f.property(key))
        .filter(|v| !v.is_blank())
    {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}

/// Values of `key` carried by at least [`MIN_MERGE_GROUP`] features
pub fn mergeable_values(
    collection: &FeatureCollection,
    key: &str,
) -> Vec<(PropertyValue, usize)> {
    inventory_by_key(collection, key)
        .into_iter()
        .filter(|(_, count)| *count >= MIN_MERGE_GROUP)
        .collect()
}

/// Every property key seen in the collection, in first-seen order, paired
/// with its value on the first feature that defines it
pub fn property_keys_with_samples(
    collection: &FeatureCollection,
) -> IndexMap<String, PropertyValue> {
    let mut samples = IndexMap::new();
    for (key, value) in collection.features.iter().flat_map(|f| &f.properties) {
        if !samples.contains_key(key) {
            samples.insert(key.clone(), value.clone());
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coord, Feature, Geometry, Properties};
    use pretty_assertions::assert_eq;

    fn feature(props: &[(&str, PropertyValue)]) -> Feature {
        Feature::new(
            Geometry::Point(Coord::xy(0.0, 0.0)),
            props
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Properties>(),
        )
    }

    fn layered(layers: &[&str]) -> FeatureCollection {
        FeatureCollection::new(
            layers
                .iter()
                .map(|l| feature(&[("Layer", PropertyValue::from(*l))]))
                .collect(),
        )
    }

    #[test]
    fn counts_values_in_first_seen_order() {
        let fc = layered(&["b", "a", "b", "c", "b", "c", "b", "b"]);
        let counts: Vec<_> = inventory_by_key(&fc, "Layer").into_iter().collect();
        assert_eq!(
            counts,
            vec![
                (PropertyValue::from("b"), 5),
                (PropertyValue::from("a"), 1),
                (PropertyValue::from("c"), 2),
            ]
        );
    }

    #[test]
    fn singletons_are_not_mergeable() {
        let fc = layered(&["b", "a", "b", "c", "b", "c", "b", "b"]);
        let values: Vec<_> = mergeable_values(&fc, "Layer")
            .into_iter()
            .map(|(v, _)| v)
            .collect();
        assert_eq!(values, vec![PropertyValue::from("b"), PropertyValue::from("c")]);
    }

    #[test]
    fn blank_and_missing_values_are_skipped() {
        let fc = FeatureCollection::new(vec![
            feature(&[("Layer", PropertyValue::Null)]),
            feature(&[("Layer", PropertyValue::from(""))]),
            feature(&[("Color", PropertyValue::from("red"))]),
            feature(&[("Layer", PropertyValue::from(3_i64))]),
        ]);
        let counts: Vec<_> = inventory_by_key(&fc, "Layer").into_iter().collect();
        assert_eq!(counts, vec![(PropertyValue::from(3_i64), 1)]);
        assert!(inventory_by_key(&fc, "Type").is_empty());
    }

    #[test]
    fn samples_come_from_first_defining_feature() {
        let fc = FeatureCollection::new(vec![
            feature(&[("Layer", PropertyValue::from("wall"))]),
            feature(&[
                ("Color", PropertyValue::from("red")),
                ("Layer", PropertyValue::from("fence")),
            ]),
            feature(&[("Color", PropertyValue::from("blue"))]),
        ]);
        let samples: Vec<_> = property_keys_with_samples(&fc).into_iter().collect();
        assert_eq!(
            samples,
            vec![
                ("Layer".to_string(), PropertyValue::from("wall")),
                ("Color".to_string(), PropertyValue::from("red")),
            ]
        );
    }
}
