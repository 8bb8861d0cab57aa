//! Settings Models
//!
//! Runner configuration stored in runner.toml.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dotnet_workflow_commands::{CommandType, SplitTestsFilterSettings};
use dotnet_workflow_core::OsType;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths;

/// Configuration of one build step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Command id, e.g. "build", "test", "nuget-push"
    pub command: Option<String>,
    /// Project, solution or assembly paths; one command runs per target
    pub targets: Vec<String>,
    /// Extra command arguments appended after the targets
    pub arguments: Vec<String>,
    /// Build working directory; the current directory when unset
    pub working_directory: Option<PathBuf>,
    /// Explicit dotnet executable; looked up on PATH when unset
    pub dotnet_path: Option<PathBuf>,
    /// Processes run under a path-virtualization layer (a container)
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
    /// Where the working directory is mounted inside the container
    pub mount_point: Option<String>,
    /// Operating system the processes run on; the host OS when unset
    pub target_os: Option<OsType>,
    /// Redact secrets from the visible build log
    pub messages_guard: bool,
    /// Values the messages guard hides
    pub secrets: Vec<String>,
    /// Report a build problem when a command exits with a non-zero code
    pub fail_build_on_exit_code: bool,
    pub split_tests: SplitTestsFilterSettings,
    /// Extra environment variables for every command
    pub environment: BTreeMap<String, String>,
    /// Upper bound of property providers probed at the same time
    pub max_parallel_providers: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            command: None,
            targets: Vec::new(),
            arguments: Vec::new(),
            working_directory: None,
            dotnet_path: None,
            is_virtual: false,
            mount_point: None,
            target_os: None,
            messages_guard: true,
            secrets: Vec::new(),
            fail_build_on_exit_code: true,
            split_tests: SplitTestsFilterSettings::default(),
            environment: BTreeMap::new(),
            max_parallel_providers: 4,
        }
    }
}

impl RunnerSettings {
    /// Validate settings values
    pub fn validate(&self) -> Result<(), String> {
        if let Some(command) = self.command.as_deref().filter(|c| !c.trim().is_empty()) {
            command.parse::<CommandType>().map_err(|e| e.to_string())?;
        }

        if self.targets.iter().any(|t| t.trim().is_empty()) {
            return Err("targets must not contain blank entries".to_string());
        }

        if self.split_tests.enabled && self.split_tests.chunk_size == 0 {
            return Err("split_tests.chunk_size must be at least 1".to_string());
        }

        if self.max_parallel_providers == 0 {
            return Err("max_parallel_providers must be at least 1".to_string());
        }

        if self.environment.keys().any(|k| k.trim().is_empty() || k.contains('=')) {
            return Err("environment variable names must be non-empty and must not contain '='".to_string());
        }

        Ok(())
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(text: &str) -> AppResult<Self> {
        let settings: RunnerSettings = toml::from_str(text)?;
        settings.validate().map_err(AppError::validation)?;
        Ok(settings)
    }

    /// Load settings from a file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;
        tracing::debug!("[RunnerSettings] Loaded {}", path.display());
        Self::from_toml(&text)
    }

    /// Load settings from `path`, or from ~/.dotnet-workflow/runner.toml.
    /// A missing default file yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = paths::settings_path()?;
        if default_path.exists() {
            Self::load(&default_path)
        } else {
            tracing::debug!("[RunnerSettings] No settings at {}, using defaults", default_path.display());
            Ok(Self::default())
        }
    }

    pub fn command_type(&self) -> Option<CommandType> {
        self.command.as_deref().and_then(CommandType::try_parse)
    }

    pub fn target_os(&self) -> OsType {
        self.target_os.unwrap_or_else(OsType::current)
    }

    pub fn working_directory(&self) -> AppResult<PathBuf> {
        match &self.working_directory {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}
