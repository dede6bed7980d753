use std::fmt;

use crate::model::{FeatureCollection, PropertyValue};
use crate::pipeline::OperationKind;

/// A collection after a per-feature rewrite, with the indices of the
/// features that actually changed
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    pub collection: FeatureCollection,
    pub touched: Vec<usize>,
}

/// One dissolved group: the key value and the input indices of its members
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGroup {
    pub value: PropertyValue,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeSummary {
    pub groups: Vec<MergedGroup>,
    /// Selected values no feature carries
    pub unmatched: Vec<PropertyValue>,
    pub passed_through: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Nothing was selected for this operation
    Skipped,
    Merged(MergeSummary),
    Rewritten { touched: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub operation: OperationKind,
    pub outcome: StepOutcome,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.operation)?;
        match &self.outcome {
            StepOutcome::Skipped => f.write_str("skipped, nothing selected"),
            StepOutcome::Merged(summary) => {
                let merged: usize = summary.groups.iter().map(|g| g.members.len()).sum();
                write!(
                    f,
                    "{} features dissolved into {}, {} left as they were",
                    merged,
                    summary.groups.len(),
                    summary.passed_through
                )?;
                if !summary.unmatched.is_empty() {
                    let names: Vec<String> =
                        summary.unmatched.iter().map(ToString::to_string).collect();
                    write!(f, " (no features for {})", names.join(", "))?;
                }
                Ok(())
            }
            StepOutcome::Rewritten { touched } => write!(f, "{} features changed", touched.len()),
        }
    }
}

/// Everything the pipeline did, one entry per requested operation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    /// Indices touched by the step at `index`, if it rewrote features in place
    pub fn touched(&self, index: usize) -> Option<&[usize]> {
        match &self.steps.get(index)?.outcome {
            StepOutcome::Rewritten { touched } => Some(touched),
            _ => None,
        }
    }
}
