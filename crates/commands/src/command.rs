//! Build Commands
//!
//! A [`DotnetCommand`] is a build intent that has not been turned into a
//! process yet: which command, for which targets, run by which tool, with
//! which environment, and who looks at the results. Resolvers rewrite
//! commands by replacing fields; nothing here launches anything.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use dotnet_workflow_core::{CommandLineArgument, CoreError, EnvironmentVariable, EventObserver, empty_observer};
use dotnet_workflow_tools::{ToolResolver, Version};
use serde::{Deserialize, Serialize};

// ============================================================================
// Command Type
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandType {
    Build,
    Pack,
    Publish,
    Restore,
    Test,
    /// `test` run against compiled test assemblies instead of projects
    TestAssembly,
    /// `test --list-tests` probe used by test splitting
    ListTests,
    Run,
    #[serde(rename = "msbuild")]
    MSBuild,
    #[serde(rename = "vstest")]
    VSTest,
    #[serde(rename = "nuget-push")]
    NuGetPush,
    #[serde(rename = "nuget-delete")]
    NuGetDelete,
    Clean,
    Custom,
}

impl CommandType {
    pub const ALL: [CommandType; 14] = [
        CommandType::Build,
        CommandType::Pack,
        CommandType::Publish,
        CommandType::Restore,
        CommandType::Test,
        CommandType::TestAssembly,
        CommandType::ListTests,
        CommandType::Run,
        CommandType::MSBuild,
        CommandType::VSTest,
        CommandType::NuGetPush,
        CommandType::NuGetDelete,
        CommandType::Clean,
        CommandType::Custom,
    ];

    /// Configuration identifier.
    pub fn id(self) -> &'static str {
        match self {
            CommandType::Build => "build",
            CommandType::Pack => "pack",
            CommandType::Publish => "publish",
            CommandType::Restore => "restore",
            CommandType::Test => "test",
            CommandType::TestAssembly => "test-assembly",
            CommandType::ListTests => "list-tests",
            CommandType::Run => "run",
            CommandType::MSBuild => "msbuild",
            CommandType::VSTest => "vstest",
            CommandType::NuGetPush => "nuget-push",
            CommandType::NuGetDelete => "nuget-delete",
            CommandType::Clean => "clean",
            CommandType::Custom => "custom",
        }
    }

    /// Identifier the verb tokens are derived from. Differs from [`id`] only
    /// for the test variants, which all run the `test` verb; custom commands
    /// have no verb.
    ///
    /// [`id`]: CommandType::id
    pub fn verb(self) -> &'static str {
        match self {
            CommandType::TestAssembly | CommandType::ListTests => "test",
            CommandType::Custom => "",
            other => other.id(),
        }
    }

    /// Verb tokens: the verb split on `-` with empty segments dropped.
    pub fn words(self) -> Vec<&'static str> {
        self.verb().split('-').filter(|w| !w.is_empty()).collect()
    }

    pub fn try_parse(id: &str) -> Option<CommandType> {
        let id = id.trim();
        CommandType::ALL.iter().copied().find(|t| t.id().eq_ignore_ascii_case(id))
    }

    pub fn is_test(self) -> bool {
        matches!(self, CommandType::Test | CommandType::TestAssembly | CommandType::VSTest)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for CommandType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandType::try_parse(s).ok_or_else(|| CoreError::unknown("command", s))
    }
}

// ============================================================================
// Targets and Results
// ============================================================================

/// Arguments naming one target, usually a single project or assembly path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetArguments {
    pub arguments: Vec<CommandLineArgument>,
}

impl TargetArguments {
    pub fn new(arguments: Vec<CommandLineArgument>) -> Self {
        Self { arguments }
    }

    /// One target path as a single argument.
    pub fn path(path: impl Into<String>) -> Self {
        Self::new(vec![CommandLineArgument::target(path)])
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Whether every argument names a compiled assembly.
    pub fn is_assembly(&self) -> bool {
        !self.arguments.is_empty()
            && self
                .arguments
                .iter()
                .all(|a| a.value.to_ascii_lowercase().ends_with(".dll"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandResult {
    Success,
    Fail,
    FailedTests,
}

pub type CommandResults = HashSet<CommandResult>;

/// Values available when a command's arguments and environment are built.
#[derive(Debug, Clone)]
pub struct DotnetBuildContext {
    pub working_directory: PathBuf,
    pub command_type: CommandType,
    pub tool_version: Option<Version>,
}

impl DotnetBuildContext {
    pub fn new(working_directory: impl Into<PathBuf>, command_type: CommandType) -> Self {
        Self {
            working_directory: working_directory.into(),
            command_type,
            tool_version: None,
        }
    }

    pub fn with_tool_version(mut self, version: Option<Version>) -> Self {
        self.tool_version = version;
        self
    }
}

// ============================================================================
// Collaborator Seams
// ============================================================================

/// Command-specific arguments, e.g. `--configuration Release`.
pub trait CommandArguments: Send + Sync {
    fn arguments(&self, context: &DotnetBuildContext) -> Vec<CommandLineArgument>;
}

/// A fixed argument list.
#[derive(Debug, Clone, Default)]
pub struct StaticArguments(pub Vec<CommandLineArgument>);

impl CommandArguments for StaticArguments {
    fn arguments(&self, _context: &DotnetBuildContext) -> Vec<CommandLineArgument> {
        self.0.clone()
    }
}

/// Contributes environment variables to an invocation.
pub trait EnvironmentBuilder: Send + Sync {
    fn build(&self, context: &DotnetBuildContext) -> Vec<EnvironmentVariable>;
}

/// Classifies how a command went from its exit code.
pub trait ResultsAnalyzer: Send + Sync {
    fn analyze(&self, exit_code: i32, results: &mut CommandResults);
}

// ============================================================================
// Dotnet Command
// ============================================================================

/// An unresolved build intent.
///
/// Cloning is cheap: collaborators are shared. Two clones are still separate
/// commands and become separate invocations.
#[derive(Clone)]
pub struct DotnetCommand {
    pub command_type: CommandType,
    pub target_arguments: Vec<TargetArguments>,
    pub tool_resolver: Arc<dyn ToolResolver>,
    pub arguments: Arc<dyn CommandArguments>,
    pub environment_builders: Vec<Arc<dyn EnvironmentBuilder>>,
    pub results_analyzer: Arc<dyn ResultsAnalyzer>,
    pub results_observer: Arc<EventObserver>,
}

impl DotnetCommand {
    pub fn new(
        command_type: CommandType,
        tool_resolver: Arc<dyn ToolResolver>,
        results_analyzer: Arc<dyn ResultsAnalyzer>,
    ) -> Self {
        Self {
            command_type,
            target_arguments: Vec::new(),
            tool_resolver,
            arguments: Arc::new(StaticArguments::default()),
            environment_builders: Vec::new(),
            results_analyzer,
            results_observer: empty_observer(),
        }
    }

    pub fn with_targets(mut self, target_arguments: Vec<TargetArguments>) -> Self {
        self.target_arguments = target_arguments;
        self
    }

    pub fn with_arguments(mut self, arguments: Arc<dyn CommandArguments>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_environment_builder(mut self, builder: Arc<dyn EnvironmentBuilder>) -> Self {
        self.environment_builders.push(builder);
        self
    }

    pub fn with_results_observer(mut self, observer: Arc<EventObserver>) -> Self {
        self.results_observer = observer;
        self
    }

    pub fn with_command_type(mut self, command_type: CommandType) -> Self {
        self.command_type = command_type;
        self
    }

    pub fn get_arguments(&self, context: &DotnetBuildContext) -> Vec<CommandLineArgument> {
        self.arguments.arguments(context)
    }

    pub fn environment(&self, context: &DotnetBuildContext) -> Vec<EnvironmentVariable> {
        self.environment_builders
            .iter()
            .flat_map(|builder| builder.build(context))
            .collect()
    }
}

impl fmt::Debug for DotnetCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DotnetCommand")
            .field("command_type", &self.command_type)
            .field("target_arguments", &self.target_arguments)
            .finish_non_exhaustive()
    }
}
