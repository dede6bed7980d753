//! Turning user choices into a list of [`Operation`]s.
//!
//! A [`PlanConfig`] says what the user wants in terms they can type ("merge
//! all layers", "delete everything but `Layer`"). [`PlanConfig::resolve`]
//! looks at the collection to turn that into concrete values and keys.

use serde::Deserialize;

use crate::error::PurgeError;
use crate::inventory::{inventory_by_key, mergeable_values, property_keys_with_samples};
use crate::model::{FeatureCollection, PropertyValue};
use crate::pipeline::Operation;

/// Attribute that holds the drawing layer in CAD exports
pub const DEFAULT_MERGE_KEY: &str = "Layer";

fn default_merge_key() -> String {
    DEFAULT_MERGE_KEY.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSelection {
    /// Every value carried by two or more features
    #[default]
    All,
    Values(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    #[serde(default = "default_merge_key")]
    pub key: String,
    #[serde(default)]
    pub layers: LayerSelection,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            key: default_merge_key(),
            layers: LayerSelection::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertySelection {
    Keys(Vec<String>),
    /// Every key found in the collection except these
    AllExcept(Vec<String>),
}

/// What to do with a collection, as read from a plan file or the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    pub merge: Option<MergeConfig>,
    pub delete_properties: Option<PropertySelection>,
    pub remove_z: bool,
    /// Number of decimal places to keep
    pub truncate: Option<u32>,
}

impl PlanConfig {
    pub fn from_json(text: &str) -> Result<Self, PurgeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// No operation requested at all
    pub fn is_empty(&self) -> bool {
        self.merge.is_none()
            && self.delete_properties.is_none()
            && !self.remove_z
            && self.truncate.is_none()
    }

    /// Resolve the plan against `collection`.
    ///
    /// Operations come out in a fixed order: merge, delete properties, remove
    /// Z, truncate. Layer names are matched against the values actually found
    /// under the merge key, so a numeric layer can be selected by its text.
    pub fn resolve(&self, collection: &FeatureCollection) -> Vec<Operation> {
        let mut operations = Vec::new();

        if let Some(merge) = &self.merge {
            let values = match &merge.layers {
                LayerSelection::All => mergeable_values(collection, &merge.key)
                    .into_iter()
                    .map(|(value, _)| value)
                    .collect(),
                LayerSelection::Values(names) => {
                    let found = inventory_by_key(collection, &merge.key);
                    names
                        .iter()
                        .map(|name| {
                            found
                                .keys()
                                .find(|value| value.to_string() == *name)
                                .cloned()
                                .unwrap_or_else(|| PropertyValue::String(name.clone()))
                        })
                        .collect()
                }
            };
            operations.push(Operation::MergeLayers {
                key: merge.key.clone(),
                values,
            });
        }

        if let Some(selection) = &self.delete_properties {
            let keys = match selection {
                PropertySelection::Keys(keys) => keys.clone(),
                PropertySelection::AllExcept(keep) => property_keys_with_samples(collection)
                    .into_keys()
                    .filter(|key| !keep.contains(key))
                    .collect(),
            };
            operations.push(Operation::DeleteProperties { keys });
        }

        if self.remove_z {
            operations.push(Operation::RemoveZ);
        }

        if let Some(decimal_places) = self.truncate {
            operations.push(Operation::Truncate { decimal_places });
        }

        operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_full_plan() {
        let plan = PlanConfig::from_json(
            r#"{
                "merge": {"key": "Type", "layers": {"values": ["fence", "wall"]}},
                "delete_properties": {"all_except": ["Type"]},
                "remove_z": true,
                "truncate": 6
            }"#,
        )
        .unwrap();
        assert_eq!(
            plan,
            PlanConfig {
                merge: Some(MergeConfig {
                    key: "Type".to_string(),
                    layers: LayerSelection::Values(vec!["fence".into(), "wall".into()]),
                }),
                delete_properties: Some(PropertySelection::AllExcept(vec!["Type".into()])),
                remove_z: true,
                truncate: Some(6),
            }
        );
    }

    #[test]
    fn merge_defaults_to_all_layers() {
        let plan = PlanConfig::from_json(r#"{"merge": {}}"#).unwrap();
        assert_eq!(plan.merge, Some(MergeConfig::default()));

        let plan = PlanConfig::from_json(r#"{"merge": {"layers": "all"}}"#).unwrap();
        assert_eq!(plan.merge.map(|m| m.layers), Some(LayerSelection::All));
    }

    #[test]
    fn empty_plan() {
        let plan = PlanConfig::from_json("{}").unwrap();
        assert!(plan.is_empty());
        assert!(plan.resolve(&FeatureCollection::default()).is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(PlanConfig::from_json(r#"{"simplify": true}"#).is_err());
    }
}
