//! Outcome and report types for an installation run.
//!
//! An outcome's status is always derived from the recorded step results,
//! never set independently, so the report is an evidence trail a user can
//! audit after a failed batch.

use serde::Serialize;

use crate::runner::StepResult;

/// Which lifecycle phase a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Install,
    PostInstall,
}

/// The phase at which a tool's lifecycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Install,
    PostInstall,
}

/// Why a tool was skipped instead of attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnsupportedPlatform,
    UnknownTool,
    InvalidRecipe(String),
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnsupportedPlatform => write!(f, "unsupported platform"),
            SkipReason::UnknownTool => write!(f, "unknown tool"),
            SkipReason::InvalidRecipe(reason) => write!(f, "invalid recipe: {}", reason),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal status of one tool within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    AlreadyInstalled,
    Installed,
    Skipped,
    Failed,
}

/// One executed step and its result.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub stage: Stage,
    pub command: String,
    pub result: StepResult,
}

/// Terminal status and evidence trail for one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool_id: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_stage: Option<FailureStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub steps: Vec<StepRecord>,
}

impl ToolOutcome {
    pub fn skipped(tool_id: &str, reason: SkipReason) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            status: OutcomeStatus::Skipped,
            failure_stage: None,
            skip_reason: Some(reason),
            steps: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::AlreadyInstalled | OutcomeStatus::Installed
        )
    }

    /// The failing step, when the outcome has one to show.
    pub fn failing_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| !s.result.succeeded())
    }
}

/// Ordered outcomes for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub outcomes: Vec<ToolOutcome>,
}

impl RunReport {
    pub fn elapsed_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Process exit contract: zero only if every resolved tool is already
    /// installed or reached done; anything failed or skipped is non-zero.
    pub fn exit_code(&self) -> i32 {
        if self.outcomes.iter().all(|o| o.succeeded()) {
            0
        } else {
            1
        }
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: OutcomeStatus) -> ToolOutcome {
        ToolOutcome {
            tool_id: "demo".to_string(),
            status,
            failure_stage: None,
            skip_reason: None,
            steps: Vec::new(),
        }
    }

    fn report(outcomes: Vec<ToolOutcome>) -> RunReport {
        let now = chrono::Utc::now();
        RunReport {
            started_at: now,
            finished_at: now,
            outcomes,
        }
    }

    #[test]
    fn test_exit_code_all_successful() {
        let report = report(vec![
            outcome(OutcomeStatus::AlreadyInstalled),
            outcome(OutcomeStatus::Installed),
        ]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_with_failure() {
        let report = report(vec![
            outcome(OutcomeStatus::Installed),
            outcome(OutcomeStatus::Failed),
        ]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_with_skip() {
        let report = report(vec![outcome(OutcomeStatus::Skipped)]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_empty_run() {
        let report = report(vec![]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&OutcomeStatus::AlreadyInstalled).unwrap(),
            "\"already_installed\""
        );
        assert_eq!(
            serde_json::to_string(&SkipReason::UnsupportedPlatform).unwrap(),
            "\"unsupported_platform\""
        );
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::UnsupportedPlatform.to_string(), "unsupported platform");
        assert_eq!(
            SkipReason::InvalidRecipe("bad".to_string()).to_string(),
            "invalid recipe: bad"
        );
    }
}
