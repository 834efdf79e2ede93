//! Batch orchestration across requested tools.
//!
//! The manager resolves the request up front (groups expanded, duplicates
//! removed) so the report can state exactly what will run, then drives each
//! tool sequentially through its lifecycle. Tools are independent: one
//! failure never aborts the batch, a deliberate partial-success policy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog;
use crate::error::{Result, ToolupError};
use crate::platform::{PlatformInfo, PlatformKey};
use crate::recipe::RecipeSet;
use crate::runner::{CancelToken, CommandRunner};

use super::installer::ToolInstaller;
use super::report::{RunReport, SkipReason, ToolOutcome};

/// One installation request, consumed once.
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    /// Explicit tool ids, in request order.
    pub tools: Vec<String>,
    /// Named groups, expanded at resolution time.
    pub groups: Vec<String>,
    /// Install every known recipe.
    pub all: bool,
    /// Reinstall even when the check says the tool is present.
    pub force: bool,
}

/// Progress notifications for the calling surface.
#[derive(Debug)]
pub enum ToolEvent<'a> {
    Started { tool: &'a str },
    Finished { outcome: &'a ToolOutcome },
}

pub struct InstallerManager {
    recipes: RecipeSet,
    platform: PlatformInfo,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    substitutions: HashMap<String, String>,
    cancel: CancelToken,
}

impl InstallerManager {
    pub fn new(
        recipes: RecipeSet,
        platform: PlatformInfo,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
        substitutions: HashMap<String, String>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            recipes,
            platform,
            runner,
            timeout,
            substitutions,
            cancel,
        }
    }

    /// Expand groups and de-duplicate into the concrete ordered tool list.
    ///
    /// Groups resolve first, then explicit tools; first occurrence wins. An
    /// unknown group is a request-construction error and fails the whole
    /// run before any tool executes. Unknown tool ids stay in the list and
    /// surface as skipped outcomes so the rest of the batch still runs.
    pub fn resolve(&self, request: &InstallRequest) -> Result<Vec<String>> {
        let mut resolved: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            if !resolved.iter().any(|r| r == id) {
                resolved.push(id.to_string());
            }
        };

        if request.all {
            for id in self.recipes.ids() {
                push(&id);
            }
        }
        for group in &request.groups {
            let members = catalog::group_members(group)
                .ok_or_else(|| ToolupError::UnknownGroup(group.clone()))?;
            for id in members {
                push(id);
            }
        }
        for id in &request.tools {
            push(id);
        }

        Ok(resolved)
    }

    pub async fn run(&self, request: &InstallRequest) -> Result<RunReport> {
        self.run_with_progress(request, &|_| {}).await
    }

    /// Run the batch, emitting a progress event as each tool starts and
    /// finishes.
    pub async fn run_with_progress(
        &self,
        request: &InstallRequest,
        progress: &(dyn Fn(ToolEvent<'_>) + Send + Sync),
    ) -> Result<RunReport> {
        let resolved = self.resolve(request)?;
        let started_at = chrono::Utc::now();
        let key = self.platform.key();
        tracing::info!(
            platform = %key,
            tools = resolved.len(),
            force = request.force,
            "starting installation run"
        );

        let mut outcomes = Vec::with_capacity(resolved.len());
        for id in &resolved {
            // Cancellation skips the queued remainder; the in-flight step
            // was already terminated by the runner.
            if self.cancel.is_cancelled() {
                outcomes.push(ToolOutcome::skipped(id, SkipReason::Cancelled));
                continue;
            }

            progress(ToolEvent::Started { tool: id });
            let outcome = self.run_tool(id, key, request.force).await;
            tracing::info!(tool = %id, status = ?outcome.status, "tool finished");
            progress(ToolEvent::Finished { outcome: &outcome });
            outcomes.push(outcome);
        }

        Ok(RunReport {
            started_at,
            finished_at: chrono::Utc::now(),
            outcomes,
        })
    }

    async fn run_tool(&self, id: &str, key: PlatformKey, force: bool) -> ToolOutcome {
        let Some(recipe) = self.recipes.get(id) else {
            return ToolOutcome::skipped(id, SkipReason::UnknownTool);
        };

        if let Err(e) = recipe.validate() {
            return ToolOutcome::skipped(id, SkipReason::InvalidRecipe(e.to_string()));
        }

        if !recipe.supports(key) {
            tracing::warn!(tool = id, platform = %key, "platform not supported, skipping");
            return ToolOutcome::skipped(id, SkipReason::UnsupportedPlatform);
        }

        // validate() guarantees the entry exists for a supported platform.
        let Some(steps) = recipe.steps_for(key) else {
            return ToolOutcome::skipped(
                id,
                SkipReason::InvalidRecipe(format!("missing steps for platform '{}'", key)),
            );
        };

        let steps = match steps.substituted(id, &self.substitutions) {
            Ok(steps) => steps,
            Err(e) => {
                return ToolOutcome::skipped(id, SkipReason::InvalidRecipe(e.to_string()));
            }
        };

        ToolInstaller::new(id, steps, self.runner.as_ref(), self.timeout)
            .run(force)
            .await
    }
}
