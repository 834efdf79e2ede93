pub mod commands;

use clap::{Parser, Subcommand};

use crate::error::Result;

#[derive(Parser)]
#[command(name = "toolup")]
#[command(version)]
#[command(about = "Cross-platform developer tool installer")]
#[command(
    long_about = "Install developer tools from declarative recipes.\n\nOne command, any machine: toolup detects the platform, picks the right\nrecipe branch and reports exactly what ran."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available tools, grouped by category
    List,

    /// List named tool groups and their members
    Groups,

    /// Show details for one tool
    Info {
        /// Tool id (see `toolup list`)
        tool: String,
    },

    /// Install one or more tools
    Install {
        /// Tool ids to install
        tools: Vec<String>,

        /// Install a named group (repeatable): basic, languages, panels, robotics
        #[arg(short, long = "group")]
        groups: Vec<String>,

        /// Install every known tool
        #[arg(long)]
        all: bool,

        /// Reinstall even when the tool is already present
        #[arg(short, long)]
        force: bool,

        /// Per-command timeout override (e.g. "600s", "10m")
        #[arg(long)]
        timeout: Option<String>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Pick tools from an interactive menu
        #[arg(short, long)]
        interactive: bool,
    },
}

impl Cli {
    /// Dispatch to the command handlers. Returns the process exit code.
    pub async fn execute(self) -> Result<i32> {
        match self.command {
            Commands::List => {
                commands::list::execute().await?;
                Ok(0)
            }
            Commands::Groups => {
                commands::list::groups().await?;
                Ok(0)
            }
            Commands::Info { tool } => {
                commands::info::execute(&tool).await?;
                Ok(0)
            }
            Commands::Install {
                tools,
                groups,
                all,
                force,
                timeout,
                json,
                interactive,
            } => {
                let opts = commands::install::InstallOptions {
                    tools,
                    groups,
                    all,
                    force,
                    timeout,
                    json,
                    interactive,
                    verbose: self.verbose,
                };
                commands::install::execute(opts).await
            }
        }
    }
}
