use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::application::{ProcessOutcome, Task};
use crate::domain::optimizer::OptimizeStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub command: String,
    pub input: String,
    pub status: String,
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsDto {
    pub nodes_in: usize,
    pub nodes_out: usize,
    pub steps: usize,
    pub rules: Vec<RuleCountDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCountDto {
    pub rule: String,
    pub count: usize,
}

impl RunReport {
    pub fn failed(task: Task, input: &Path, error: &anyhow::Error) -> Self {
        Self {
            command: task.to_string(),
            input: input.display().to_string(),
            status: "failed".to_string(),
            outputs: Vec::new(),
            stats: None,
            error: Some(format!("{:#}", error)),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

impl From<&OptimizeStats> for StatsDto {
    fn from(stats: &OptimizeStats) -> Self {
        StatsDto {
            nodes_in: stats.nodes_in,
            nodes_out: stats.nodes_out,
            steps: stats.steps,
            rules: stats
                .per_rule
                .iter()
                .map(|(rule, count)| RuleCountDto {
                    rule: rule.clone(),
                    count: *count,
                })
                .collect(),
        }
    }
}

impl From<&ProcessOutcome> for RunReport {
    fn from(outcome: &ProcessOutcome) -> Self {
        RunReport {
            command: outcome.task.to_string(),
            input: outcome.input.display().to_string(),
            status: "ok".to_string(),
            outputs: outcome
                .outputs
                .iter()
                .map(|(_, path)| path.display().to_string())
                .collect(),
            stats: outcome.stats.as_ref().map(StatsDto::from),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::artifact::Artifact;

    #[test]
    fn test_report_from_outcome() {
        let outcome = ProcessOutcome {
            task: Task::Deob,
            input: PathBuf::from("dropper.ps1"),
            outputs: vec![(Artifact::Deobfuscated, PathBuf::from("dropper.deob.ps1"))],
            stats: Some(OptimizeStats {
                nodes_in: 40,
                nodes_out: 10,
                steps: 3,
                per_rule: vec![("fold_binary".to_string(), 3)],
            }),
        };
        let report = RunReport::from(&outcome);
        assert!(report.succeeded());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["command"], "deob");
        assert_eq!(json["stats"]["rules"][0]["rule"], "fold_binary");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failed_report() {
        let error = anyhow::anyhow!("parser exited").context("Failed to parse x.ps1");
        let report = RunReport::failed(Task::Format, Path::new("x.ps1"), &error);
        assert!(!report.succeeded());
        assert_eq!(report.error.as_deref(), Some("Failed to parse x.ps1: parser exited"));
        assert_eq!(report.status, "failed");
    }
}
