use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Platform detection failed: {0}")]
    Detection(String),

    #[error("Recipe error for '{tool}': {reason}")]
    Recipe { tool: String, reason: String },

    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    #[error("Failed to spawn command: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dialog error: {0}")]
    Dialog(#[from] dialoguer::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ToolupError {
    /// Process exit code for run-fatal errors.
    ///
    /// Detection, configuration and recipe-class failures exit with 2 so
    /// callers can tell them apart from individual tool failures (exit 1).
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolupError::Detection(_)
            | ToolupError::Config(_)
            | ToolupError::Recipe { .. }
            | ToolupError::UnknownGroup(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolupError::Recipe {
            tool: "git".to_string(),
            reason: "missing platform entry".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Recipe error for 'git': missing platform entry"
        );

        let err = ToolupError::Detection("unsupported OS".to_string());
        assert_eq!(err.to_string(), "Platform detection failed: unsupported OS");
    }

    #[test]
    fn test_fatal_errors_use_distinct_exit_code() {
        assert_eq!(ToolupError::Detection("x".into()).exit_code(), 2);
        assert_eq!(ToolupError::Config("x".into()).exit_code(), 2);
        assert_eq!(ToolupError::UnknownGroup("x".into()).exit_code(), 2);
        assert_eq!(ToolupError::Spawn("x".into()).exit_code(), 1);
    }
}
