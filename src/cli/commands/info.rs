use console::style;

use crate::config::Settings;
use crate::error::{Result, ToolupError};
use crate::platform::PlatformInfo;

pub async fn execute(tool: &str) -> Result<()> {
    let settings = Settings::load()?;
    let recipes = super::load_recipes(&settings)?;

    let recipe = recipes.get(tool).ok_or_else(|| ToolupError::Recipe {
        tool: tool.to_string(),
        reason: "no recipe with this id (see `toolup list`)".to_string(),
    })?;

    println!("{}", style(&recipe.name).bold().cyan());
    if !recipe.description.is_empty() {
        println!("{}", recipe.description);
    }
    println!();
    println!("  Category:  {}", style(&recipe.category).white());
    println!(
        "  Platforms: {}",
        style(
            recipe
                .supported_platforms
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
        .white()
    );

    // Show the branch this host would actually run, when there is one.
    if let Ok(platform) = PlatformInfo::detect() {
        let key = platform.key();
        if let Some(steps) = recipe.steps_for(key) {
            println!("\n{} ({}):", style("Steps on this host").bold(), key);
            println!("  check: {}", style(&steps.check_command).dim());
            for (i, cmd) in steps.install_commands.iter().enumerate() {
                println!("  install {}: {}", i + 1, style(cmd).dim());
            }
            for (i, cmd) in steps.post_install.iter().enumerate() {
                println!("  post {}: {}", i + 1, style(cmd).dim());
            }
        } else {
            println!(
                "\n{}",
                style(format!("Not available on this host ({})", key)).yellow()
            );
        }
    }

    Ok(())
}
