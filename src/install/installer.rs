//! Per-tool installation lifecycle.
//!
//! A [`ToolInstaller`] binds one resolved platform branch of a recipe to a
//! command runner and drives it through the lifecycle state machine:
//!
//! ```text
//! NotChecked → Checking → {AlreadyInstalled | NeedsInstall}
//!            → Installing → {Installed | InstallFailed}
//!            → PostInstalling → Done
//! ```
//!
//! `force` short-circuits `AlreadyInstalled` back into `NeedsInstall`; the
//! check still runs so the report can say what was found.

use std::time::Duration;

use crate::recipe::PlatformSteps;
use crate::runner::{CommandRunner, StepResult};

use super::report::{FailureStage, OutcomeStatus, Stage, StepRecord, ToolOutcome};

/// Lifecycle states for one tool within one run.
/// `InstallFailed` and `Done` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotChecked,
    Checking,
    AlreadyInstalled,
    NeedsInstall,
    Installing,
    Installed,
    InstallFailed,
    PostInstalling,
    Done,
}

pub struct ToolInstaller<'a> {
    tool_id: &'a str,
    steps: PlatformSteps,
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> ToolInstaller<'a> {
    /// `steps` must already have substitution tokens resolved.
    pub fn new(
        tool_id: &'a str,
        steps: PlatformSteps,
        runner: &'a dyn CommandRunner,
        timeout: Duration,
    ) -> Self {
        Self {
            tool_id,
            steps,
            runner,
            timeout,
        }
    }

    /// Run the check command; exit 0 means the tool is present.
    ///
    /// Fails soft: a spawn error counts as "not installed". A machine where
    /// the check binary itself is missing is exactly a machine that needs
    /// the install, so absence of evidence is evidence of absence here.
    pub async fn is_installed(&self) -> bool {
        match self.runner.run(&self.steps.check_command, self.timeout).await {
            Ok(result) => result.succeeded(),
            Err(e) => {
                tracing::warn!(
                    tool = self.tool_id,
                    error = %e,
                    "check command could not run; treating tool as not installed"
                );
                false
            }
        }
    }

    /// Run install commands in order, fail-fast.
    ///
    /// Stops at the first non-zero exit (a spawn error is recorded as a
    /// synthetic failed step) and returns the steps executed so far,
    /// including the failing one.
    pub async fn install(&self) -> Vec<StepRecord> {
        let mut records = Vec::new();
        for command in &self.steps.install_commands {
            let result = self.run_step(command).await;
            let failed = !result.succeeded();
            records.push(StepRecord {
                stage: Stage::Install,
                command: command.clone(),
                result,
            });
            if failed {
                break;
            }
        }
        records
    }

    /// Run post-install commands, best-effort.
    ///
    /// Failures are recorded but do not stop the remaining configuration
    /// steps and never flip a successful install back to failed.
    pub async fn post_install(&self) -> Vec<StepRecord> {
        let mut records = Vec::new();
        for command in &self.steps.post_install {
            let result = self.run_step(command).await;
            if !result.succeeded() {
                tracing::warn!(
                    tool = self.tool_id,
                    command,
                    "post-install step failed (continuing)"
                );
            }
            records.push(StepRecord {
                stage: Stage::PostInstall,
                command: command.clone(),
                result,
            });
        }
        records
    }

    async fn run_step(&self, command: &str) -> StepResult {
        match self.runner.run(command, self.timeout).await {
            Ok(result) => result,
            Err(e) => StepResult::spawn_failure(&e.to_string()),
        }
    }

    /// Drive the full lifecycle and fold the evidence into an outcome.
    pub async fn run(&self, force: bool) -> ToolOutcome {
        let mut state = LifecycleState::NotChecked;

        state = self.transition(state, LifecycleState::Checking);
        let installed = self.is_installed().await;

        state = self.transition(
            state,
            if installed {
                LifecycleState::AlreadyInstalled
            } else {
                LifecycleState::NeedsInstall
            },
        );

        if state == LifecycleState::AlreadyInstalled {
            if !force {
                return ToolOutcome {
                    tool_id: self.tool_id.to_string(),
                    status: OutcomeStatus::AlreadyInstalled,
                    failure_stage: None,
                    skip_reason: None,
                    steps: Vec::new(),
                };
            }
            state = self.transition(state, LifecycleState::NeedsInstall);
        }

        state = self.transition(state, LifecycleState::Installing);
        let mut steps = self.install().await;
        let install_ok = steps.iter().all(|s| s.result.succeeded());

        if !install_ok {
            self.transition(state, LifecycleState::InstallFailed);
            return ToolOutcome {
                tool_id: self.tool_id.to_string(),
                status: OutcomeStatus::Failed,
                failure_stage: Some(FailureStage::Install),
                skip_reason: None,
                steps,
            };
        }

        state = self.transition(state, LifecycleState::Installed);
        state = self.transition(state, LifecycleState::PostInstalling);
        steps.extend(self.post_install().await);
        self.transition(state, LifecycleState::Done);

        let post_failed = steps
            .iter()
            .any(|s| s.stage == Stage::PostInstall && !s.result.succeeded());

        ToolOutcome {
            tool_id: self.tool_id.to_string(),
            status: OutcomeStatus::Installed,
            failure_stage: post_failed.then_some(FailureStage::PostInstall),
            skip_reason: None,
            steps,
        }
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> LifecycleState {
        tracing::debug!(tool = self.tool_id, ?from, ?to, "lifecycle transition");
        to
    }
}
