//! Tool State Resolver
//!
//! Discovers where a tool really lives and, when asked, which version it is,
//! by emitting invocations into the workflow and watching their output:
//!
//! ```text
//! NotStarted -> PathResolving -> PathResolved -> VersionProbing -> VersionResolved
//! ```
//!
//! Path resolution only happens under a virtualized context without a known
//! home path. The version probe only happens when a version observer was
//! registered. A probe whose output never parses to a version leaves the
//! lookup in `VersionProbing`; that is "tool not found", not an error.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dotnet_workflow_core::{
    CommandLine, CommandLineArgument, EnvironmentVariable, OnceSlot, StdOutText, Subscription,
    TargetType, VirtualContext, Workflow, WorkflowContext,
};

use crate::path_resolver::{PathResolverState, PathResolverWorkflowComposer};
use crate::resolver::ToolPath;
use crate::version::{Version, VersionParser};

// ============================================================================
// Tool State
// ============================================================================

/// Discovery record for one tool lookup. Each field is published at most once.
#[derive(Debug, Clone)]
pub struct ToolState {
    pub executable: ToolPath,
    virtual_path: OnceSlot<PathBuf>,
    version: Option<OnceSlot<Version>>,
    stage: Arc<Mutex<ToolLookupStage>>,
}

impl ToolState {
    pub fn new(executable: ToolPath) -> Self {
        Self {
            executable,
            virtual_path: OnceSlot::new(),
            version: None,
            stage: Arc::new(Mutex::new(ToolLookupStage::NotStarted)),
        }
    }

    /// Be told the discovered location of the tool.
    pub fn on_virtual_path(mut self, observer: impl Fn(&PathBuf) + Send + Sync + 'static) -> Self {
        self.virtual_path = OnceSlot::with_callback(observer);
        self
    }

    /// Request a version probe and be told its result.
    pub fn on_version(mut self, observer: impl Fn(&Version) + Send + Sync + 'static) -> Self {
        self.version = Some(OnceSlot::with_callback(observer));
        self
    }

    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.virtual_path.get().cloned()
    }

    pub fn version(&self) -> Option<Version> {
        self.version.as_ref().and_then(|v| v.get().cloned())
    }

    pub fn is_version_requested(&self) -> bool {
        self.version.is_some()
    }

    pub fn stage(&self) -> ToolLookupStage {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_stage(&self, stage: ToolLookupStage) {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner()) = stage;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolLookupStage {
    NotStarted,
    PathResolving,
    PathResolved,
    VersionProbing,
    VersionResolved,
}

// ============================================================================
// Composer
// ============================================================================

/// Produces the discovery invocations for a [`ToolState`].
pub struct ToolStateWorkflowComposer {
    virtual_context: Arc<dyn VirtualContext>,
    path_resolvers: Vec<Arc<dyn PathResolverWorkflowComposer>>,
    version_parser: Arc<dyn VersionParser>,
    environment: Vec<EnvironmentVariable>,
    title: String,
    description: String,
}

impl ToolStateWorkflowComposer {
    pub fn new(virtual_context: Arc<dyn VirtualContext>, version_parser: Arc<dyn VersionParser>) -> Self {
        Self {
            virtual_context,
            path_resolvers: Vec::new(),
            version_parser,
            environment: Vec::new(),
            title: "dotnet --version".to_string(),
            description: "Getting the .NET SDK version".to_string(),
        }
    }

    pub fn with_path_resolver(mut self, resolver: Arc<dyn PathResolverWorkflowComposer>) -> Self {
        self.path_resolvers.push(resolver);
        self
    }

    pub fn with_environment(mut self, environment: Vec<EnvironmentVariable>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_probe_text(mut self, title: impl Into<String>, description: impl Into<String>) -> Self {
        self.title = title.into();
        self.description = description.into();
        self
    }

    pub fn target(&self) -> TargetType {
        TargetType::SystemDiagnostics
    }

    pub fn compose(&self, context: &Arc<WorkflowContext>, state: ToolState) -> Workflow {
        Workflow::new(ToolLookup {
            context: context.clone(),
            virtual_context: self.virtual_context.clone(),
            path_resolvers: self.path_resolvers.clone(),
            version_parser: self.version_parser.clone(),
            environment: self.environment.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            state,
            path_workflow: None,
            probe_subscription: None,
            finished: false,
        })
    }
}

/// Pull-driven lookup. Each call to `next` advances the state machine until it
/// has an invocation to hand out or the lookup is over.
struct ToolLookup {
    context: Arc<WorkflowContext>,
    virtual_context: Arc<dyn VirtualContext>,
    path_resolvers: Vec<Arc<dyn PathResolverWorkflowComposer>>,
    version_parser: Arc<dyn VersionParser>,
    environment: Vec<EnvironmentVariable>,
    title: String,
    description: String,
    state: ToolState,
    path_workflow: Option<Workflow>,
    probe_subscription: Option<Subscription>,
    finished: bool,
}

impl ToolLookup {
    fn start_path_resolution(&mut self) -> Workflow {
        let target = self.state.virtual_path.clone();
        let path_state = PathResolverState::with_observer(
            self.state.executable.virtual_path.clone(),
            move |path: &PathBuf| {
                target.publish(path.clone());
            },
        );

        let context = self.context.clone();
        let resolvers = self.path_resolvers.clone();
        resolvers
            .into_iter()
            .fold(Workflow::empty(), move |workflow, resolver| {
                let context = context.clone();
                let state = path_state.clone();
                workflow.then(Workflow::deferred(move || resolver.compose(&context, state)))
            })
    }

    fn version_probe(&mut self, version: OnceSlot<Version>) -> CommandLine {
        let executable = self
            .state
            .resolved_path()
            .unwrap_or_else(|| self.state.executable.virtual_path.clone());

        let probe = CommandLine::new(TargetType::SystemDiagnostics, executable, self.context.working_directory())
            .with_arguments(vec![CommandLineArgument::new("--version")])
            .with_environment(self.environment.clone())
            .with_title(self.title.clone())
            .with_description(vec![StdOutText::new(self.description.clone())]);

        let parser = self.version_parser.clone();
        self.probe_subscription = Some(self.context.subscribe_output(probe.id(), move |line| {
            let parsed = parser.parse(&[line.to_string()]);
            if !parsed.is_empty() {
                version.publish(parsed);
            }
        }));

        probe
    }
}

impl Iterator for ToolLookup {
    type Item = CommandLine;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            match self.state.stage() {
                ToolLookupStage::NotStarted => {
                    if self.virtual_context.is_virtual() && self.state.executable.home_paths.is_empty() {
                        self.path_workflow = Some(self.start_path_resolution());
                        self.state.set_stage(ToolLookupStage::PathResolving);
                    } else {
                        self.state.set_stage(ToolLookupStage::PathResolved);
                    }
                }
                ToolLookupStage::PathResolving => {
                    if self.context.is_aborted() {
                        self.finished = true;
                        continue;
                    }
                    if let Some(command_line) = self.path_workflow.as_mut().and_then(Iterator::next) {
                        return Some(command_line);
                    }
                    self.path_workflow = None;
                    self.state.set_stage(ToolLookupStage::PathResolved);
                }
                ToolLookupStage::PathResolved => {
                    let Some(version) = self.state.version.clone() else {
                        self.finished = true;
                        continue;
                    };
                    if self.context.is_aborted() {
                        self.finished = true;
                        continue;
                    }
                    let probe = self.version_probe(version);
                    self.state.set_stage(ToolLookupStage::VersionProbing);
                    return Some(probe);
                }
                ToolLookupStage::VersionProbing => {
                    self.probe_subscription = None;
                    self.finished = true;
                    if self.state.version().is_some() {
                        self.state.set_stage(ToolLookupStage::VersionResolved);
                    } else {
                        tracing::debug!(
                            "[ToolState] No version reported by {}",
                            self.state.executable.virtual_path.display()
                        );
                    }
                }
                ToolLookupStage::VersionResolved => {
                    self.finished = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_resolver::LocatorPathResolver;
    use crate::version::DotnetVersionParser;
    use dotnet_workflow_core::{
        CommandResultEvent, ContainerContext, HostContext, OsType, OutputEvent, OutputStream,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn output(command_line: &CommandLine, text: &str) -> CommandResultEvent {
        CommandResultEvent::Output(OutputEvent::new(text, OutputStream::Stdout, command_line.id()))
    }

    fn host_composer() -> ToolStateWorkflowComposer {
        ToolStateWorkflowComposer::new(
            Arc::new(HostContext::with_os(OsType::Unix)),
            Arc::new(DotnetVersionParser),
        )
    }

    #[test]
    fn test_without_version_request_nothing_is_emitted() {
        let context = Arc::new(WorkflowContext::new("/work"));
        let state = ToolState::new(ToolPath::new("dotnet"));
        let workflow = host_composer().compose(&context, state.clone());

        assert_eq!(workflow.count(), 0);
        assert_eq!(state.stage(), ToolLookupStage::PathResolved);
    }

    #[test]
    fn test_version_probe_publishes_once() {
        let context = Arc::new(WorkflowContext::new("/work"));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let state = ToolState::new(ToolPath::new("dotnet")).on_version(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut workflow = host_composer().compose(&context, state.clone());
        let probe = workflow.next().unwrap();
        assert_eq!(probe.target, TargetType::SystemDiagnostics);
        assert_eq!(probe.working_directory, PathBuf::from("/work"));
        assert_eq!(probe.argument_values().collect::<Vec<_>>(), vec!["--version"]);
        assert_eq!(probe.title.as_deref(), Some("dotnet --version"));
        assert_eq!(state.stage(), ToolLookupStage::VersionProbing);

        context.publish(&mut output(&probe, "Welcome"));
        context.publish(&mut output(&probe, "8.0.100"));
        context.publish(&mut output(&probe, "9.0.100"));

        assert!(workflow.next().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.version().map(|v| v.to_string()), Some("8.0.100".to_string()));
        assert_eq!(state.stage(), ToolLookupStage::VersionResolved);
    }

    #[test]
    fn test_unparsable_output_never_fires() {
        let context = Arc::new(WorkflowContext::new("/work"));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let state = ToolState::new(ToolPath::new("dotnet")).on_version(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut workflow = host_composer().compose(&context, state.clone());
        let probe = workflow.next().unwrap();
        context.publish(&mut output(&probe, "command not found"));

        assert!(workflow.next().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.stage(), ToolLookupStage::VersionProbing);
    }

    #[test]
    fn test_virtual_context_resolves_path_before_probe() {
        let virtual_context: Arc<dyn VirtualContext> =
            Arc::new(ContainerContext::new(OsType::Unix, "/agent", "/mnt"));
        let composer = ToolStateWorkflowComposer::new(virtual_context.clone(), Arc::new(DotnetVersionParser))
            .with_path_resolver(Arc::new(LocatorPathResolver::new(virtual_context)));
        let context = Arc::new(WorkflowContext::new("/work"));
        let state = ToolState::new(ToolPath::new("dotnet")).on_version(|_| {});

        let mut workflow = composer.compose(&context, state.clone());
        let locate = workflow.next().unwrap();
        assert_eq!(locate.executable, PathBuf::from("which"));
        context.publish(&mut output(&locate, "/usr/share/dotnet/dotnet"));

        let probe = workflow.next().unwrap();
        assert_eq!(probe.executable, PathBuf::from("/usr/share/dotnet/dotnet"));
        assert_eq!(state.resolved_path(), Some(PathBuf::from("/usr/share/dotnet/dotnet")));
    }

    #[test]
    fn test_known_home_path_skips_resolution() {
        let virtual_context: Arc<dyn VirtualContext> =
            Arc::new(ContainerContext::new(OsType::Unix, "/agent", "/mnt"));
        let composer = ToolStateWorkflowComposer::new(virtual_context.clone(), Arc::new(DotnetVersionParser))
            .with_path_resolver(Arc::new(LocatorPathResolver::new(virtual_context)));
        let context = Arc::new(WorkflowContext::new("/work"));
        let executable = ToolPath::new("/opt/dotnet/dotnet").with_home_paths(vec![PathBuf::from("/opt/dotnet")]);
        let state = ToolState::new(executable).on_version(|_| {});

        let probe = composer.compose(&context, state).next().unwrap();
        assert_eq!(probe.executable, PathBuf::from("/opt/dotnet/dotnet"));
    }

    #[test]
    fn test_abort_stops_before_probe() {
        let context = Arc::new(WorkflowContext::new("/work"));
        context.abort("cancelled");
        let state = ToolState::new(ToolPath::new("dotnet")).on_version(|_| {});
        assert_eq!(host_composer().compose(&context, state).count(), 0);
    }
}
