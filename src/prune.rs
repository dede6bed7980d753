use crate::model::FeatureCollection;
use crate::report::Rewritten;

/// Remove `keys` from every feature's properties. Keys a feature lacks are
/// ignored and geometries are left alone, so pruning twice is the same as
/// pruning once.
pub fn delete_properties(mut collection: FeatureCollection, keys: &[String]) -> Rewritten {
    let mut touched = Vec::new();
    for (i, feature) in collection.features.iter_mut().enumerate() {
        let before = feature.properties.len();
        for key in keys {
            // shift_remove keeps the order of the remaining keys
            feature.properties.shift_remove(key.as_str());
        }
        if feature.properties.len() != before {
            touched.push(i);
        }
    }
    Rewritten {
        collection,
        touched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coord, Feature, Geometry, Properties, PropertyValue};
    use pretty_assertions::assert_eq;

    fn wall() -> Feature {
        let properties: Properties = [
            ("Layer", PropertyValue::from("wall")),
            ("Color", PropertyValue::from("red")),
            ("Height", PropertyValue::from(3.2)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Feature::new(Geometry::Point(Coord::xy(0.0, 0.0)), properties)
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn removes_selected_keys_and_keeps_order() {
        let fc = FeatureCollection::new(vec![wall()]);
        let pruned = delete_properties(fc, &keys(&["Color"]));
        let remaining: Vec<_> = pruned.collection.features[0]
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        assert_eq!(
            remaining,
            vec![
                ("Layer", PropertyValue::from("wall")),
                ("Height", PropertyValue::from(3.2)),
            ]
        );
        assert_eq!(pruned.touched, vec![0]);
    }

    #[test]
    fn absent_keys_are_ignored() {
        let fc = FeatureCollection::new(vec![wall(), wall()]);
        let pruned = delete_properties(fc.clone(), &keys(&["Material"]));
        assert_eq!(pruned.collection, fc);
        assert!(pruned.touched.is_empty());
    }

    #[test]
    fn pruning_is_idempotent() {
        let fc = FeatureCollection::new(vec![wall()]);
        let once = delete_properties(fc, &keys(&["Color", "Height"]));
        let twice = delete_properties(once.collection.clone(), &keys(&["Color", "Height"]));
        assert_eq!(twice.collection, once.collection);
        assert!(twice.touched.is_empty());
    }

    #[test]
    fn sequential_pruning_equals_pruning_the_union() {
        let fc = FeatureCollection::new(vec![wall()]);
        let k1 = keys(&["Color"]);
        let k2 = keys(&["Height", "Material"]);
        let both = keys(&["Color", "Height", "Material"]);

        let a = delete_properties(delete_properties(fc.clone(), &k1).collection, &k2);
        let b = delete_properties(delete_properties(fc.clone(), &k2).collection, &k1);
        let c = delete_properties(fc, &both);
        assert_eq!(a.collection, c.collection);
        assert_eq!(b.collection, c.collection);
    }
}
