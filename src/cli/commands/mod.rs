pub mod info;
pub mod install;
pub mod list;

use crate::catalog;
use crate::config::Settings;
use crate::error::Result;
use crate::recipe::RecipeSet;

/// Built-in catalog plus the user recipe directory, when configured.
/// User recipes override built-ins with the same id.
pub fn load_recipes(settings: &Settings) -> Result<RecipeSet> {
    let mut set = catalog::builtin_recipe_set();
    if let Some(dir) = settings.recipe_dir_path() {
        let loaded = set.load_dir(&dir)?;
        tracing::debug!(dir = %dir.display(), loaded, "loaded user recipes");
    }
    Ok(set)
}
