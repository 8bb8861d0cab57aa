//! Path Resolution Sub-Workflow
//!
//! Under a virtualized context the agent cannot look inside the execution
//! environment's file system, so a tool's real location is discovered by
//! running the platform locator (`which` or `where`) there and reading its
//! first non-blank output line.

use std::path::PathBuf;
use std::sync::Arc;

use dotnet_workflow_core::{
    CommandLine, CommandLineArgument, OnceSlot, OsType, StdOutText, TargetType, VirtualContext,
    Workflow, WorkflowContext,
};

/// One pending path lookup. The first non-blank resolved path is kept and
/// passed to the optional observer; later candidates are ignored.
#[derive(Debug, Clone)]
pub struct PathResolverState {
    pub path_to_resolve: PathBuf,
    resolved: OnceSlot<PathBuf>,
}

impl PathResolverState {
    pub fn new(path_to_resolve: impl Into<PathBuf>) -> Self {
        Self {
            path_to_resolve: path_to_resolve.into(),
            resolved: OnceSlot::new(),
        }
    }

    pub fn with_observer(path_to_resolve: impl Into<PathBuf>, observer: impl Fn(&PathBuf) + Send + Sync + 'static) -> Self {
        Self {
            path_to_resolve: path_to_resolve.into(),
            resolved: OnceSlot::with_callback(observer),
        }
    }

    /// Offer a candidate path. Blank candidates never count.
    pub fn offer(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return false;
        }
        self.resolved.publish(PathBuf::from(candidate))
    }

    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.resolved.get().cloned()
    }
}

pub trait PathResolverWorkflowComposer: Send + Sync {
    fn compose(&self, context: &Arc<WorkflowContext>, state: PathResolverState) -> Workflow;
}

/// Runs `which <name>` (or `where <name>` on Windows) inside the execution
/// environment. Produces nothing when the context is not virtualized.
pub struct LocatorPathResolver {
    virtual_context: Arc<dyn VirtualContext>,
}

impl LocatorPathResolver {
    pub fn new(virtual_context: Arc<dyn VirtualContext>) -> Self {
        Self { virtual_context }
    }

    fn locator(&self) -> &'static str {
        match self.virtual_context.target_os() {
            OsType::Windows => "where",
            OsType::Unix | OsType::Mac => "which",
        }
    }
}

impl PathResolverWorkflowComposer for LocatorPathResolver {
    fn compose(&self, context: &Arc<WorkflowContext>, state: PathResolverState) -> Workflow {
        if !self.virtual_context.is_virtual() {
            return Workflow::empty();
        }

        let name = state.path_to_resolve.to_string_lossy().into_owned();
        let locator = self.locator();
        let command_line = CommandLine::new(TargetType::SystemDiagnostics, locator, context.working_directory())
            .with_arguments(vec![CommandLineArgument::target(name.clone())])
            .with_title(format!("{} {}", locator, name))
            .with_description(vec![StdOutText::new(format!("Getting the {} location", name))]);

        let subscription = context.subscribe_output(command_line.id(), move |line| {
            if state.offer(line) {
                tracing::debug!("[PathResolver] Resolved {} to {}", state.path_to_resolve.display(), line.trim());
            }
        });

        Workflow::observed(command_line, subscription)
    }
}
