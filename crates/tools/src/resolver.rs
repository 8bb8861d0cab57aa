//! Tool Resolvers
//!
//! A [`ToolResolver`] tells the command pipeline which executable runs a
//! command and whether the command verb (`build`, `test`, ...) has to be
//! passed as leading arguments.

use std::path::{Path, PathBuf};

use dotnet_workflow_core::EnvironmentVariable;

use crate::tool::ToolPlatform;

/// Where an executable lives.
///
/// `path` is the location on the agent, `virtual_path` the location as seen
/// from the execution environment, and `home_paths` any directories already
/// known to contain the tool. An empty `home_paths` under a virtualized
/// context means the real location has to be discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPath {
    pub path: PathBuf,
    pub virtual_path: PathBuf,
    pub home_paths: Vec<PathBuf>,
}

impl ToolPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            virtual_path: path.clone(),
            path,
            home_paths: Vec::new(),
        }
    }

    pub fn with_virtual_path(mut self, virtual_path: impl Into<PathBuf>) -> Self {
        self.virtual_path = virtual_path.into();
        self
    }

    pub fn with_home_paths(mut self, home_paths: Vec<PathBuf>) -> Self {
        self.home_paths = home_paths;
        self
    }

    /// File name of the executable, falling back to the whole path.
    pub fn name(&self) -> String {
        self.virtual_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.virtual_path.to_string_lossy().into_owned())
    }
}

pub trait ToolResolver: Send + Sync {
    fn platform(&self) -> ToolPlatform;

    fn executable(&self) -> ToolPath;

    /// Whether the command verb must precede the other arguments.
    fn is_command_required(&self) -> bool;
}

// ============================================================================
// dotnet CLI
// ============================================================================

/// Resolves the `dotnet` CLI. A configured path wins; otherwise the bare
/// command name is used and the real location is left to discovery.
#[derive(Debug, Clone, Default)]
pub struct DotnetToolResolver {
    configured_path: Option<PathBuf>,
}

impl DotnetToolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.configured_path = path.filter(|p| !p.as_os_str().is_empty());
        self
    }
}

impl ToolResolver for DotnetToolResolver {
    fn platform(&self) -> ToolPlatform {
        ToolPlatform::CrossPlatform
    }

    fn executable(&self) -> ToolPath {
        match &self.configured_path {
            Some(path) => {
                let home = path.parent().map(Path::to_path_buf).into_iter().collect();
                ToolPath::new(path.clone()).with_home_paths(home)
            }
            None => ToolPath::new(DOTNET_EXECUTABLE),
        }
    }

    fn is_command_required(&self) -> bool {
        true
    }
}

pub const DOTNET_EXECUTABLE: &str = "dotnet";

/// Variables every `dotnet` invocation runs with: no telemetry, no banner,
/// no first-run experience.
pub fn default_environment_variables() -> Vec<EnvironmentVariable> {
    vec![
        EnvironmentVariable::new("DOTNET_CLI_TELEMETRY_OPTOUT", "true"),
        EnvironmentVariable::new("DOTNET_SKIP_FIRST_TIME_EXPERIENCE", "true"),
        EnvironmentVariable::new("DOTNET_NOLOGO", "true"),
    ]
}
