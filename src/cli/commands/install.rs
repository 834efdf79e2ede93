use std::sync::Arc;
use std::time::Duration;

use console::style;
use dialoguer::MultiSelect;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::error::{Result, ToolupError};
use crate::install::{
    InstallRequest, InstallerManager, OutcomeStatus, RunReport, ToolEvent, ToolOutcome,
};
use crate::platform::PlatformInfo;
use crate::runner::{CancelToken, ShellRunner};

pub struct InstallOptions {
    pub tools: Vec<String>,
    pub groups: Vec<String>,
    pub all: bool,
    pub force: bool,
    pub timeout: Option<String>,
    pub json: bool,
    pub interactive: bool,
    pub verbose: bool,
}

pub async fn execute(opts: InstallOptions) -> Result<i32> {
    let mut settings = Settings::load()?;
    if let Some(timeout) = &opts.timeout {
        settings.command_timeout = timeout.clone();
        settings.validate()?;
    }

    let platform = PlatformInfo::detect()?;
    let recipes = super::load_recipes(&settings)?;

    let mut request = InstallRequest {
        tools: opts.tools,
        groups: opts.groups,
        all: opts.all,
        force: opts.force,
    };

    if opts.interactive && request.tools.is_empty() && request.groups.is_empty() && !request.all
    {
        request.tools = pick_tools(&recipes)?;
        if request.tools.is_empty() {
            println!("{}", style("Nothing selected.").dim());
            return Ok(0);
        }
    }

    if request.tools.is_empty() && request.groups.is_empty() && !request.all {
        return Err(ToolupError::Config(
            "nothing to install: pass tool ids, --group, --all or --interactive".to_string(),
        ));
    }

    // Ctrl-C terminates the in-flight command and skips the queued rest.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    }

    let runner = Arc::new(ShellRunner::new(cancel.clone()));
    let manager = InstallerManager::new(
        recipes,
        platform.clone(),
        runner,
        settings.timeout(),
        settings.substitutions.clone(),
        cancel,
    );

    if !opts.json {
        println!(
            "{} {}",
            style("Platform:").bold(),
            style(platform.describe()).white()
        );
    }

    let report = if opts.json {
        manager.run(&request).await?
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid spinner template"),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let report = manager
            .run_with_progress(&request, &|event| match event {
                ToolEvent::Started { tool } => {
                    spinner.set_message(format!("installing {}...", tool));
                }
                ToolEvent::Finished { outcome } => {
                    spinner.println(outcome_line(outcome));
                }
            })
            .await;
        spinner.finish_and_clear();
        report?
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, opts.verbose);
    }

    Ok(report.exit_code())
}

fn pick_tools(recipes: &crate::recipe::RecipeSet) -> Result<Vec<String>> {
    let items: Vec<String> = recipes
        .iter()
        .map(|r| format!("{} - {}", r.id, r.description))
        .collect();
    let ids = recipes.ids();

    let picked = MultiSelect::new()
        .with_prompt("Select tools to install (space to toggle, enter to confirm)")
        .items(&items)
        .interact()?;

    Ok(picked.into_iter().map(|i| ids[i].clone()).collect())
}

fn outcome_line(outcome: &ToolOutcome) -> String {
    match outcome.status {
        OutcomeStatus::AlreadyInstalled => format!(
            "{} {} {}",
            style("✓").green().bold(),
            outcome.tool_id,
            style("already installed").dim()
        ),
        OutcomeStatus::Installed => {
            let note = match outcome.failure_stage {
                Some(_) => style("installed (post-install issues)").yellow(),
                None => style("installed").green(),
            };
            format!("{} {} {}", style("✓").green().bold(), outcome.tool_id, note)
        }
        OutcomeStatus::Skipped => format!(
            "{} {} {}",
            style("!").yellow().bold(),
            outcome.tool_id,
            style(format!(
                "skipped ({})",
                outcome
                    .skip_reason
                    .as_ref()
                    .map(|r| r.to_string())
                    .unwrap_or_default()
            ))
            .yellow()
        ),
        OutcomeStatus::Failed => format!(
            "{} {} {}",
            style("✗").red().bold(),
            outcome.tool_id,
            style("failed").red()
        ),
    }
}

fn print_summary(report: &RunReport, verbose: bool) {
    // Failures get their evidence printed: stage, command, captured output.
    for outcome in &report.outcomes {
        let show_evidence = outcome.status == OutcomeStatus::Failed
            || (outcome.failure_stage.is_some() && verbose);
        if !show_evidence {
            continue;
        }
        let Some(step) = outcome.failing_step() else {
            continue;
        };

        println!();
        println!(
            "{} {} failed during {:?}:",
            style("✗").red().bold(),
            style(&outcome.tool_id).bold(),
            outcome.failure_stage.unwrap_or(crate::install::report::FailureStage::Install)
        );
        println!("  command: {}", style(&step.command).white());
        if step.result.timed_out {
            println!(
                "  {}",
                style(format!("timed out after {}ms", step.result.duration_ms)).red()
            );
        } else {
            println!("  exit code: {}", style(step.result.exit_code).red());
        }
        print_output("stdout", &step.result.stdout);
        print_output("stderr", &step.result.stderr);
    }

    let installed = report.count(OutcomeStatus::Installed);
    let present = report.count(OutcomeStatus::AlreadyInstalled);
    let skipped = report.count(OutcomeStatus::Skipped);
    let failed = report.count(OutcomeStatus::Failed);

    println!();
    println!(
        "{} {} installed, {} already present, {} skipped, {} failed {}",
        style("Summary:").bold(),
        style(installed).green(),
        style(present).green(),
        style(skipped).yellow(),
        style(failed).red(),
        style(format!("({}s)", report.elapsed_secs())).dim()
    );
}

fn print_output(label: &str, text: &str) {
    let text = text.trim_end();
    if text.is_empty() {
        return;
    }
    println!("  {}:", label);
    // Keep the terminal readable: last 20 lines are where the error is.
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(20);
    if start > 0 {
        println!("    {}", style(format!("... ({} earlier lines)", start)).dim());
    }
    for line in &lines[start..] {
        println!("    {}", style(line).dim());
    }
}
