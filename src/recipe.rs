//! Declarative tool recipes.
//!
//! A recipe describes how to check for, install and configure one tool on
//! each platform it supports. Recipes come from the built-in catalog or from
//! YAML files in a user recipe directory; user recipes override built-ins
//! with the same id. Recipes are loaded and validated once, then immutable
//! for the rest of the run.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolupError};
use crate::platform::PlatformKey;

/// Shell steps for one platform branch of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSteps {
    /// Ordered install commands; executed fail-fast.
    pub install_commands: Vec<String>,
    /// Exit 0 means the tool is already present.
    pub check_command: String,
    /// Ordered post-install configuration; best-effort.
    #[serde(default)]
    pub post_install: Vec<String>,
}

impl PlatformSteps {
    /// Resolve `{{token}}` references against the substitution map.
    ///
    /// An unknown token is a recipe error, never passed through literally:
    /// a command with a dangling `{{node_version}}` would fail in ways the
    /// recipe author cannot predict.
    pub fn substituted(&self, tool: &str, vars: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            install_commands: self
                .install_commands
                .iter()
                .map(|c| substitute(tool, c, vars))
                .collect::<Result<Vec<_>>>()?,
            check_command: substitute(tool, &self.check_command, vars)?,
            post_install: self
                .post_install
                .iter()
                .map(|c| substitute(tool, c, vars))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

fn substitute(tool: &str, command: &str, vars: &HashMap<String, String>) -> Result<String> {
    let re = Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid token regex");

    let mut out = String::with_capacity(command.len());
    let mut last = 0;
    for caps in re.captures_iter(command) {
        let whole = caps.get(0).expect("match");
        let name = &caps[1];
        let value = vars.get(name).ok_or_else(|| ToolupError::Recipe {
            tool: tool.to_string(),
            reason: format!("unknown substitution token '{{{{{}}}}}'", name),
        })?;
        out.push_str(&command[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&command[last..]);
    Ok(out)
}

/// Declarative description of one installable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub supported_platforms: Vec<PlatformKey>,
    pub platforms: BTreeMap<PlatformKey, PlatformSteps>,
}

fn default_category() -> String {
    "other".to_string()
}

impl ToolRecipe {
    /// Structural validation, run once at load time.
    ///
    /// Every platform a recipe claims to support must have a steps entry;
    /// a claim without steps would otherwise surface as a silent skip at
    /// install time.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(ToolupError::Recipe {
                tool: self.id.clone(),
                reason,
            })
        };

        if self.id.trim().is_empty() {
            return fail("empty tool id".to_string());
        }
        if self.supported_platforms.is_empty() {
            return fail("no supported platforms declared".to_string());
        }
        for key in &self.supported_platforms {
            let Some(steps) = self.platforms.get(key) else {
                return fail(format!("missing steps for supported platform '{}'", key));
            };
            if steps.check_command.trim().is_empty() {
                return fail(format!("empty check command for platform '{}'", key));
            }
            if steps.install_commands.is_empty() {
                return fail(format!("no install commands for platform '{}'", key));
            }
        }
        Ok(())
    }

    pub fn supports(&self, key: PlatformKey) -> bool {
        self.supported_platforms.contains(&key)
    }

    pub fn steps_for(&self, key: PlatformKey) -> Option<&PlatformSteps> {
        self.platforms.get(&key)
    }
}

/// The immutable set of recipes available to a run.
#[derive(Debug, Default)]
pub struct RecipeSet {
    recipes: BTreeMap<String, ToolRecipe>,
}

impl RecipeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a recipe, replacing any existing one with the same id.
    pub fn insert(&mut self, recipe: ToolRecipe) {
        self.recipes.insert(recipe.id.clone(), recipe);
    }

    pub fn get(&self, id: &str) -> Option<&ToolRecipe> {
        self.recipes.get(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.recipes.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolRecipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Load every `*.yaml` / `*.yml` file in a directory as one recipe each.
    ///
    /// Returns the number of recipes loaded. A malformed file fails the load
    /// with a recipe error naming the file instead of being dropped.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Err(ToolupError::Config(format!(
                "recipe directory not found: {}",
                dir.display()
            )));
        }

        let mut loaded = 0;
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let recipe: ToolRecipe =
                serde_yaml::from_str(&content).map_err(|e| ToolupError::Recipe {
                    tool: path.display().to_string(),
                    reason: format!("invalid recipe file: {}", e),
                })?;
            recipe.validate()?;
            tracing::debug!(id = %recipe.id, file = %path.display(), "loaded recipe");
            self.insert(recipe);
            loaded += 1;
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe() -> ToolRecipe {
        ToolRecipe {
            id: "git".to_string(),
            name: "Git".to_string(),
            description: "Version control".to_string(),
            category: "basic".to_string(),
            supported_platforms: vec![PlatformKey::LinuxUbuntu, PlatformKey::Darwin],
            platforms: BTreeMap::from([
                (
                    PlatformKey::LinuxUbuntu,
                    PlatformSteps {
                        install_commands: vec!["apt-get install -y git".to_string()],
                        check_command: "git --version".to_string(),
                        post_install: vec![],
                    },
                ),
                (
                    PlatformKey::Darwin,
                    PlatformSteps {
                        install_commands: vec!["brew install git".to_string()],
                        check_command: "git --version".to_string(),
                        post_install: vec![],
                    },
                ),
            ]),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_recipe().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_platform_steps() {
        let mut recipe = sample_recipe();
        recipe.supported_platforms.push(PlatformKey::Windows);
        let err = recipe.validate().unwrap_err();
        assert!(err.to_string().contains("missing steps"));
        assert!(err.to_string().contains("windows"));
    }

    #[test]
    fn test_validate_empty_check_command() {
        let mut recipe = sample_recipe();
        recipe
            .platforms
            .get_mut(&PlatformKey::Darwin)
            .unwrap()
            .check_command = "  ".to_string();
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn test_validate_no_install_commands() {
        let mut recipe = sample_recipe();
        recipe
            .platforms
            .get_mut(&PlatformKey::Darwin)
            .unwrap()
            .install_commands
            .clear();
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn test_substitution_replaces_tokens() {
        let steps = PlatformSteps {
            install_commands: vec![
                "curl -fsSL {{mirror_base}}/node-v{{node_version}}.tar.gz".to_string(),
            ],
            check_command: "node --version".to_string(),
            post_install: vec!["npm config set registry {{mirror_base}}".to_string()],
        };
        let vars = HashMap::from([
            ("node_version".to_string(), "22.12.0".to_string()),
            ("mirror_base".to_string(), "https://mirror.example".to_string()),
        ]);

        let resolved = steps.substituted("nodejs", &vars).unwrap();
        assert_eq!(
            resolved.install_commands[0],
            "curl -fsSL https://mirror.example/node-v22.12.0.tar.gz"
        );
        assert_eq!(
            resolved.post_install[0],
            "npm config set registry https://mirror.example"
        );
    }

    #[test]
    fn test_substitution_unknown_token_fails() {
        let steps = PlatformSteps {
            install_commands: vec!["echo {{missing}}".to_string()],
            check_command: "true".to_string(),
            post_install: vec![],
        };
        let err = steps
            .substituted("demo", &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("unknown substitution token"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_substitution_allows_whitespace_in_braces() {
        let vars = HashMap::from([("v".to_string(), "1".to_string())]);
        assert_eq!(substitute("t", "x{{ v }}y", &vars).unwrap(), "x1y");
    }

    #[test]
    fn test_recipe_set_override_by_id() {
        let mut set = RecipeSet::new();
        set.insert(sample_recipe());
        let mut replacement = sample_recipe();
        replacement.description = "patched".to_string();
        set.insert(replacement);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("git").unwrap().description, "patched");
    }

    #[test]
    fn test_recipe_yaml_roundtrip() {
        let yaml = r#"
id: nodejs
name: Node.js
description: JavaScript runtime
category: languages
supported_platforms: [linux_ubuntu]
platforms:
  linux_ubuntu:
    check_command: node --version
    install_commands:
      - curl -fsSL https://deb.nodesource.com/setup_{{node_version}}.x | bash -
      - apt-get install -y nodejs
    post_install:
      - npm config set fund false
"#;
        let recipe: ToolRecipe = serde_yaml::from_str(yaml).unwrap();
        assert!(recipe.validate().is_ok());
        assert_eq!(recipe.id, "nodejs");
        let steps = recipe.steps_for(PlatformKey::LinuxUbuntu).unwrap();
        assert_eq!(steps.install_commands.len(), 2);
        assert_eq!(steps.post_install.len(), 1);
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("jq.yaml"),
            r#"
id: jq
name: jq
supported_platforms: [linux_ubuntu]
platforms:
  linux_ubuntu:
    check_command: jq --version
    install_commands: [apt-get install -y jq]
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut set = RecipeSet::new();
        let loaded = set.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 1);
        assert!(set.get("jq").is_some());
        assert_eq!(set.get("jq").unwrap().category, "other");
    }

    #[test]
    fn test_load_dir_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "id: [not a recipe").unwrap();

        let mut set = RecipeSet::new();
        assert!(set.load_dir(dir.path()).is_err());
    }

    #[test]
    fn test_load_dir_missing_directory() {
        let mut set = RecipeSet::new();
        assert!(set.load_dir(Path::new("/nonexistent/recipes")).is_err());
    }
}
