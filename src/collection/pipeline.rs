//! Per-step results of the provisioning and teardown pipelines.

use std::fmt;

use serde::Serialize;

/// The five cloud resources making up a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Container,
    Index,
    DataSource,
    Skillset,
    Indexer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Container => "container",
            Self::Index => "index",
            Self::DataSource => "data source",
            Self::Skillset => "skillset",
            Self::Indexer => "indexer",
        };
        f.write_str(name)
    }
}

/// How a single pipeline step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed { reason: String },
    /// Nothing to do, e.g. deleting a resource that does not exist.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub resource: ResourceKind,
    pub name: String,
    pub outcome: StepOutcome,
}

impl StepReport {
    pub fn completed(resource: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            resource,
            name: name.into(),
            outcome: StepOutcome::Completed,
        }
    }

    pub fn failed(
        resource: ResourceKind,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            resource,
            name: name.into(),
            outcome: StepOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn skipped(
        resource: ResourceKind,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            resource,
            name: name.into(),
            outcome: StepOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failed { .. })
    }
}

/// Results from one run of a composite pipeline, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
    /// Duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Check that no step failed.
    pub fn is_success(&self) -> bool {
        !self.steps.iter().any(StepReport::is_failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.is_failed())
    }

    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome == StepOutcome::Completed)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
            .count()
    }

    /// Resources in the order their steps ran.
    pub fn resources(&self) -> Vec<ResourceKind> {
        self.steps.iter().map(|s| s.resource).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_report_counts() {
        let report = PipelineReport {
            steps: vec![
                StepReport::completed(ResourceKind::Index, "a_index"),
                StepReport::failed(ResourceKind::DataSource, "a-ds", "boom"),
                StepReport::skipped(ResourceKind::Skillset, "a-ss", "nothing to delete"),
            ],
            duration_ms: 3,
        };
        assert!(!report.is_success());
        assert_eq!(report.completed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            report.resources(),
            vec![ResourceKind::Index, ResourceKind::DataSource, ResourceKind::Skillset]
        );
    }

    #[test]
    fn test_empty_report_is_success() {
        assert!(PipelineReport::default().is_success());
    }

    #[test]
    fn test_step_serializes_tagged_outcome() {
        let step = StepReport::failed(ResourceKind::DataSource, "a-ds", "denied");
        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({
                "resource": "data_source",
                "name": "a-ds",
                "outcome": {"status": "failed", "reason": "denied"}
            })
        );
    }
}
