use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolupError};

/// Process-wide settings, read once at startup. No hot reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Per-command timeout as a duration string: "600s", "10m", "1h".
    #[serde(default = "default_timeout")]
    pub command_timeout: String,

    /// Extra recipe directory; files there override built-in recipes by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_dir: Option<String>,

    /// Values available to recipes as `{{token}}` substitutions. Entries
    /// here override the built-in defaults (version pins, mirror URLs).
    #[serde(default)]
    pub substitutions: HashMap<String, String>,
}

fn default_timeout() -> String {
    "600s".to_string()
}

fn default_substitutions() -> HashMap<String, String> {
    HashMap::from([
        ("node_major".to_string(), "22".to_string()),
        (
            "npm_registry".to_string(),
            "https://registry.npmjs.org/".to_string(),
        ),
        (
            "pip_index_url".to_string(),
            "https://pypi.org/simple".to_string(),
        ),
        ("python_version".to_string(), "3.12".to_string()),
        ("ros_distro".to_string(), "jazzy".to_string()),
    ])
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_timeout: default_timeout(),
            recipe_dir: None,
            substitutions: default_substitutions(),
        }
    }
}

impl Settings {
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("toolup"))
            .ok_or_else(|| ToolupError::Config("cannot determine config directory".to_string()))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Load settings, falling back to defaults when no config file exists.
    ///
    /// User-provided substitutions are merged over the built-in defaults so
    /// a config file only has to pin what it wants to change.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let loaded: Settings = serde_yaml::from_str(&content)
            .map_err(|e| ToolupError::Config(format!("invalid config: {}", e)))?;

        let mut substitutions = default_substitutions();
        substitutions.extend(loaded.substitutions);

        let settings = Settings {
            substitutions,
            ..loaded
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if parse_duration(&self.command_timeout).is_none() {
            return Err(ToolupError::Config(format!(
                "invalid command_timeout '{}'. Use format like '600s', '10m' or '1h'",
                self.command_timeout
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        parse_duration(&self.command_timeout).unwrap_or(Duration::from_secs(600))
    }

    /// Expanded recipe directory, if configured.
    pub fn recipe_dir_path(&self) -> Option<PathBuf> {
        self.recipe_dir
            .as_ref()
            .map(|d| PathBuf::from(shellexpand::tilde(d).to_string()))
    }
}

fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>().ok().map(|h| Duration::from_secs(h * 3600))
    } else if let Some(minutes) = s.strip_suffix('m') {
        minutes.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else if let Some(seconds) = s.strip_suffix('s') {
        seconds.parse::<u64>().ok().map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
