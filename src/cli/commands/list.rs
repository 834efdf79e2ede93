use std::collections::BTreeMap;

use console::style;

use crate::catalog;
use crate::config::Settings;
use crate::error::Result;

pub async fn execute() -> Result<()> {
    let settings = Settings::load()?;
    let recipes = super::load_recipes(&settings)?;

    let mut by_category: BTreeMap<&str, Vec<_>> = BTreeMap::new();
    for recipe in recipes.iter() {
        by_category.entry(&recipe.category).or_default().push(recipe);
    }

    println!("{}", style("Available tools").bold().cyan());
    for (category, tools) in by_category {
        println!("\n{}:", style(category).bold());
        for recipe in tools {
            println!(
                "  {:<14} {}",
                style(&recipe.id).green(),
                style(&recipe.description).dim()
            );
        }
    }
    println!(
        "\nInstall with {} or see {} for details.",
        style("toolup install <tool>").cyan(),
        style("toolup info <tool>").cyan()
    );

    Ok(())
}

pub async fn groups() -> Result<()> {
    println!("{}", style("Tool groups").bold().cyan());
    for name in catalog::group_names() {
        let members = catalog::group_members(name).unwrap_or(&[]);
        println!(
            "  {:<12} {}",
            style(*name).green(),
            style(members.join(", ")).dim()
        );
    }
    println!(
        "\nInstall a group with {}.",
        style("toolup install --group <name>").cyan()
    );

    Ok(())
}
