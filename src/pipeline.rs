use std::fmt;

use tracing::{info, info_span};

use crate::error::PurgeError;
use crate::merge::merge_layers;
use crate::model::{FeatureCollection, PropertyValue};
use crate::prune::delete_properties;
use crate::report::{PipelineReport, StepOutcome, StepReport};
use crate::sanitize::{remove_z_all, truncate_all};

/// One fully resolved step of a run
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Dissolve the features whose `key` holds one of `values`
    MergeLayers {
        key: String,
        values: Vec<PropertyValue>,
    },
    DeleteProperties {
        keys: Vec<String>,
    },
    RemoveZ,
    Truncate {
        decimal_places: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    MergeLayers,
    DeleteProperties,
    RemoveZ,
    Truncate,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::MergeLayers => "merge layers",
            OperationKind::DeleteProperties => "delete properties",
            OperationKind::RemoveZ => "remove Z",
            OperationKind::Truncate => "truncate coordinates",
        };
        f.write_str(name)
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::MergeLayers { .. } => OperationKind::MergeLayers,
            Operation::DeleteProperties { .. } => OperationKind::DeleteProperties,
            Operation::RemoveZ => OperationKind::RemoveZ,
            Operation::Truncate { .. } => OperationKind::Truncate,
        }
    }

    /// Whether the user picked nothing for this step
    pub fn is_empty_selection(&self) -> bool {
        match self {
            Operation::MergeLayers { values, .. } => values.is_empty(),
            Operation::DeleteProperties { keys } => keys.is_empty(),
            Operation::RemoveZ | Operation::Truncate { .. } => false,
        }
    }

    /// Apply this step on its own
    pub fn apply(&self, collection: FeatureCollection) -> (FeatureCollection, StepOutcome) {
        if self.is_empty_selection() {
            info!("nothing selected, skipping");
            return (collection, StepOutcome::Skipped);
        }

        match self {
            Operation::MergeLayers { key, values } => {
                let merged = merge_layers(collection, key, values);
                (merged.collection, StepOutcome::Merged(merged.summary))
            }
            Operation::DeleteProperties { keys } => {
                let pruned = delete_properties(collection, keys);
                (
                    pruned.collection,
                    StepOutcome::Rewritten {
                        touched: pruned.touched,
                    },
                )
            }
            Operation::RemoveZ => {
                let flat = remove_z_all(collection);
                (
                    flat.collection,
                    StepOutcome::Rewritten {
                        touched: flat.touched,
                    },
                )
            }
            Operation::Truncate { decimal_places } => {
                let truncated = truncate_all(collection, *decimal_places);
                (
                    truncated.collection,
                    StepOutcome::Rewritten {
                        touched: truncated.touched,
                    },
                )
            }
        }
    }
}

/// Apply `operations` in order, threading the collection through each.
///
/// Every geometry is validated first and the run is aborted on the first
/// invalid one, before anything has been changed.
pub fn run(
    collection: FeatureCollection,
    operations: &[Operation],
) -> Result<(FeatureCollection, PipelineReport), PurgeError> {
    collection.validate()?;

    let mut collection = collection;
    let mut report = PipelineReport::default();
    for operation in operations {
        let span = info_span!("step", operation = %operation.kind());
        let _enter = span.enter();

        let features_before = collection.len();
        let (next, outcome) = operation.apply(collection);
        collection = next;
        info!(
            features_before,
            features_after = collection.len(),
            "step finished"
        );

        report.steps.push(StepReport {
            operation: operation.kind(),
            outcome,
        });
    }

    Ok((collection, report))
}
