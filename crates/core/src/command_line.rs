//! Invocation Model
//!
//! A [`CommandLine`] describes one operating-system process launch. It may
//! wrap a base invocation (a shell running a script, a profiler running a
//! host), forming a chain that is always finite: the base is fixed when the
//! wrapper is built and the wrapper always gets a fresh identity, so a chain
//! can never loop back on itself.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::text::StdOutText;

// ============================================================================
// Target Type
// ============================================================================

/// Priority class of an invocation. Composers run in ascending priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    NotApplicable,
    /// e.g. `dotnet --version`
    SystemDiagnostics,
    /// e.g. `dotnet`, `msbuild`, `nuget`
    Tool,
    /// e.g. `cmd`, `mono`
    Host,
    PerformanceProfiler,
    MemoryProfiler,
    CodeCoverageProfiler,
}

impl TargetType {
    pub fn priority(self) -> u32 {
        match self {
            TargetType::NotApplicable => 0,
            TargetType::SystemDiagnostics => 1,
            TargetType::Tool => 100,
            TargetType::Host => 200,
            TargetType::PerformanceProfiler => 300,
            TargetType::MemoryProfiler => 310,
            TargetType::CodeCoverageProfiler => 320,
        }
    }
}

// ============================================================================
// Arguments and Environment
// ============================================================================

/// Role of an argument. Only later filtering and splitting logic looks at it;
/// the process receives the value either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentType {
    Mandatory,
    Target,
    #[default]
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandLineArgument {
    pub value: String,
    #[serde(default)]
    pub argument_type: ArgumentType,
}

impl CommandLineArgument {
    /// Custom argument.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            argument_type: ArgumentType::Custom,
        }
    }

    pub fn mandatory(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            argument_type: ArgumentType::Mandatory,
        }
    }

    pub fn target(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            argument_type: ArgumentType::Target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// Command Line
// ============================================================================

/// Opaque identity of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandLineId(Uuid);

impl CommandLineId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CommandLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single process invocation.
///
/// Two structurally identical invocations (two test chunks, for instance) are
/// still different invocations: equality compares identities only.
#[derive(Debug, Clone)]
pub struct CommandLine {
    id: CommandLineId,
    base: Option<Arc<CommandLine>>,
    pub target: TargetType,
    pub executable: PathBuf,
    pub working_directory: PathBuf,
    pub arguments: Vec<CommandLineArgument>,
    pub environment: Vec<EnvironmentVariable>,
    pub title: Option<String>,
    pub description: Vec<StdOutText>,
}

impl CommandLine {
    pub fn new(
        target: TargetType,
        executable: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: CommandLineId::generate(),
            base: None,
            target,
            executable: executable.into(),
            working_directory: working_directory.into(),
            arguments: Vec::new(),
            environment: Vec::new(),
            title: None,
            description: Vec::new(),
        }
    }

    /// Build an invocation that wraps `base`, e.g. a shell running a script.
    pub fn wrapping(
        base: CommandLine,
        target: TargetType,
        executable: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        let mut wrapper = Self::new(target, executable, working_directory);
        wrapper.base = Some(Arc::new(base));
        wrapper
    }

    pub fn with_arguments(mut self, arguments: Vec<CommandLineArgument>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_environment(mut self, environment: Vec<EnvironmentVariable>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: Vec<StdOutText>) -> Self {
        self.description = description;
        self
    }

    pub fn id(&self) -> CommandLineId {
        self.id
    }

    pub fn base(&self) -> Option<&CommandLine> {
        self.base.as_deref()
    }

    /// The invocation followed by every base it wraps, outermost first.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Whether any invocation in the chain has the given classification.
    pub fn chain_contains(&self, target: TargetType) -> bool {
        self.chain().any(|c| c.target == target)
    }

    pub fn argument_values(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().map(|a| a.value.as_str())
    }

    /// Lower-cased extension of the executable, empty when there is none.
    pub fn executable_extension(&self) -> String {
        extension_of(&self.executable)
    }
}

impl PartialEq for CommandLine {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandLine {}

impl std::hash::Hash for CommandLine {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Iterator over a base chain, outermost first.
pub struct Chain<'a> {
    next: Option<&'a CommandLine>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a CommandLine;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.base();
        Some(current)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
