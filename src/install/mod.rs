//! Installation orchestration: per-tool lifecycle and batch sequencing.

pub mod installer;
pub mod manager;
pub mod report;

pub use installer::ToolInstaller;
pub use manager::{InstallRequest, InstallerManager, ToolEvent};
pub use report::{OutcomeStatus, RunReport, SkipReason, StepRecord, ToolOutcome};
