use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::model::{Feature, FeatureCollection, Properties, PropertyValue};
use crate::report::{MergeSummary, MergedGroup};
use crate::union::union_all;

/// Result of [`merge_layers`]
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub collection: FeatureCollection,
    pub summary: MergeSummary,
}

/// Dissolve all features whose `key` holds one of `values` into one feature
/// per value.
///
/// A merged feature carries the union of its group's geometries and only the
/// `{key: value}` attribute. Merged features come first, in selection order,
/// followed by every other feature in input order. Features without the key
/// (or with a `null` value) are never grouped. If no feature has the key at
/// all, the collection is returned unchanged.
pub fn merge_layers(collection: FeatureCollection, key: &str, values: &[PropertyValue]) -> Merged {
    let selected: IndexSet<&PropertyValue> = values
        .iter()
        .filter(|v| !matches!(v, PropertyValue::Null))
        .collect();

    let has_key = collection
        .features
        .iter()
        .any(|f| f.properties.contains_key(key));
    if selected.is_empty() || !has_key {
        let passed_through = collection.len();
        return Merged {
            collection,
            summary: MergeSummary {
                passed_through,
                ..Default::default()
            },
        };
    }

    let FeatureCollection {
        features,
        bbox,
        foreign_members,
    } = collection;

    // one accumulator per selected value
    let mut members: Vec<Vec<(usize, Feature)>> =
        (0..selected.len()).map(|_| Vec::new()).collect();
    let mut passed = Vec::new();
    for (i, feature) in features.into_iter().enumerate() {
        match feature.property(key).and_then(|v| selected.get_index_of(v)) {
            Some(slot) => members[slot].push((i, feature)),
            None => passed.push(feature),
        }
    }

    let mut merged = Vec::with_capacity(selected.len() + passed.len());
    let mut summary = MergeSummary {
        passed_through: passed.len(),
        ..Default::default()
    };
    for (value, group) in selected.into_iter().zip(members) {
        if group.is_empty() {
            warn!(key, %value, "no features carry the selected value");
            summary.unmatched.push(value.clone());
            continue;
        }

        let geometry = union_all(group.iter().map(|(_, f)| &f.geometry));
        debug!(
            key,
            %value,
            members = group.len(),
            result = %geometry.kind(),
            "dissolved group"
        );

        let mut properties = Properties::new();
        properties.insert(key.to_string(), value.clone());
        merged.push(Feature::new(geometry, properties));
        summary.groups.push(MergedGroup {
            value: value.clone(),
            members: group.into_iter().map(|(i, _)| i).collect(),
        });
    }
    merged.extend(passed);

    // dissolved polygons lose Z, so the old extent may not hold
    let bbox = if summary.groups.is_empty() { bbox } else { None };

    Merged {
        collection: FeatureCollection {
            features: merged,
            bbox,
            foreign_members,
        },
        summary,
    }
}
