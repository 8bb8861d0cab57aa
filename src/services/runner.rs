//! Workflow Runner
//!
//! Assembles the services of one build step from [`RunnerSettings`] and
//! executes the composed workflow: every invocation is pulled lazily, run
//! to completion through the execution adapter, and only then is the next
//! one requested. Interrupting the runner terminates the running process
//! and stops the workflow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use dotnet_workflow_commands::{
    CommandResolutionPipeline, CommandStreamResolver, CommandType, ComposedCommandStreamResolver,
    DotnetBuildContext, DotnetCommand, DotnetCommandSet, EnvironmentBuilder, ExactMatchTestCommandsStreamResolver,
    InMemoryTestNamesSessionManager, StaticArguments, TargetArguments,
};
use dotnet_workflow_core::{
    CommandLineArgument, CommandResultEvent, ContainerContext, EnvironmentVariable, EventObserver, HostContext,
    VirtualContext, WorkflowContext,
};
use dotnet_workflow_tools::{
    default_environment_variables, DotnetToolResolver, DotnetVersionParser, LocatorPathResolver, ToolResolver,
    ToolStateWorkflowComposer,
};

use crate::models::{BuildProblem, RunnerSettings};
use crate::services::analysis::{DefaultResultsAnalyzer, DotnetWorkflowAnalyzer, TestFailureTracker};
use crate::services::composers::{CmdWorkflowComposer, DotnetWorkflowComposer, WorkflowComposer, WorkflowComposition};
use crate::services::execution::{CommandExecutionAdapter, MessagesGuard, ProcessRunner};
use crate::services::logging::{ConsoleLoggerService, LoggerService};
use crate::services::messages::{ServiceMessageSource, ServiceMessagesRegister};
use crate::services::step::{BuildStepContext, RunnerContext};
use crate::utils::error::AppResult;

/// Outcome of one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Exit codes of the executed invocations, in execution order.
    pub exit_codes: Vec<i32>,
    pub build_problems: Vec<BuildProblem>,
    pub aborted: bool,
}

impl RunSummary {
    pub fn invocations(&self) -> usize {
        self.exit_codes.len()
    }

    pub fn is_success(&self) -> bool {
        self.build_problems.is_empty() && !self.aborted
    }
}

/// A fixed set of environment variables.
struct StaticEnvironment(Vec<EnvironmentVariable>);

impl EnvironmentBuilder for StaticEnvironment {
    fn build(&self, _context: &DotnetBuildContext) -> Vec<EnvironmentVariable> {
        self.0.clone()
    }
}

pub struct WorkflowRunner {
    settings: RunnerSettings,
    logger: Arc<dyn LoggerService>,
    cancellation: CancellationToken,
}

impl WorkflowRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self {
            settings,
            logger: Arc::new(ConsoleLoggerService::new()),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn LoggerService>) -> Self {
        self.logger = logger;
        self
    }

    /// Cancelling the token interrupts the step.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    fn virtual_context(&self, working_directory: &Path) -> Arc<dyn VirtualContext> {
        let os = self.settings.target_os();
        if !self.settings.is_virtual {
            return Arc::new(HostContext::with_os(os));
        }

        let host_root = working_directory.to_string_lossy().into_owned();
        let mount_point = self.settings.mount_point.clone().unwrap_or_else(|| host_root.clone());
        Arc::new(ContainerContext::new(os, host_root, mount_point))
    }

    fn command_set(&self, tracker: Arc<TestFailureTracker>) -> DotnetCommandSet {
        let Some(command_type) = self.settings.command_type() else {
            return DotnetCommandSet::new(Vec::new());
        };

        let tool_resolver: Arc<dyn ToolResolver> =
            Arc::new(DotnetToolResolver::new().with_path(self.settings.dotnet_path.clone()));
        let analyzer = DefaultResultsAnalyzer::new(command_type, self.settings.fail_build_on_exit_code)
            .with_test_failures(tracker);
        let arguments = self
            .settings
            .arguments
            .iter()
            .map(|a| CommandLineArgument::new(a.as_str()))
            .collect();
        let environment = self
            .settings
            .environment
            .iter()
            .map(|(name, value)| EnvironmentVariable::new(name.as_str(), value.as_str()))
            .collect();

        let command = DotnetCommand::new(command_type, tool_resolver, Arc::new(analyzer))
            .with_targets(self.settings.targets.iter().map(|t| TargetArguments::path(t.as_str())).collect())
            .with_arguments(Arc::new(StaticArguments(arguments)))
            .with_environment_builder(Arc::new(StaticEnvironment(default_environment_variables())))
            .with_environment_builder(Arc::new(StaticEnvironment(environment)));

        DotnetCommandSet::new(vec![command])
    }

    fn pipeline(&self) -> CommandResolutionPipeline {
        let split_tests = self.settings.split_tests.clone();
        let sessions = Arc::new(InMemoryTestNamesSessionManager::new(split_tests.chunk_size));
        let resolvers: Vec<Arc<dyn CommandStreamResolver>> = vec![
            Arc::new(ExactMatchTestCommandsStreamResolver::new(split_tests, sessions)),
            Arc::new(ComposedCommandStreamResolver),
        ];
        CommandResolutionPipeline::new(resolvers)
    }

    /// Run the configured step.
    pub async fn run(&self) -> AppResult<RunSummary> {
        let working_directory = self.settings.working_directory()?;
        let command = self.settings.command_type().map(CommandType::id).unwrap_or("<none>");
        tracing::info!(
            "[WorkflowRunner] Running {} in {}",
            command,
            working_directory.display()
        );

        let virtual_context = self.virtual_context(&working_directory);

        let register = Arc::new(ServiceMessagesRegister::new());
        let test_failures_source = ServiceMessageSource::test_failures(register.clone());
        let tracker = Arc::new(TestFailureTracker::new());
        let _test_failures = tracker.observe(&test_failures_source);

        let adapter = CommandExecutionAdapter::new(self.logger.clone(), virtual_context.clone())
            .with_messages_guard(
                Arc::new(MessagesGuard::new(self.settings.secrets.clone())),
                self.settings.messages_guard,
            )
            .with_service_messages(register);

        let path_resolver = Arc::new(LocatorPathResolver::new(virtual_context.clone()));
        let tool_state = ToolStateWorkflowComposer::new(virtual_context.clone(), Arc::new(DotnetVersionParser))
            .with_path_resolver(path_resolver.clone())
            .with_environment(default_environment_variables());

        let step = Arc::new(BuildStepContext::new());
        let composers: Vec<Arc<dyn WorkflowComposer>> = vec![
            Arc::new(DotnetWorkflowComposer::new(
                step.clone(),
                Arc::new(self.command_set(tracker)),
                Arc::new(self.pipeline()),
                Arc::new(tool_state),
                virtual_context.clone(),
                Arc::new(DotnetWorkflowAnalyzer::new(self.logger.clone())),
            )),
            Arc::new(CmdWorkflowComposer::new(virtual_context, path_resolver)),
        ];
        let composition = WorkflowComposition::new(composers);

        step.start_session(RunnerContext::new(self.settings.clone(), working_directory.clone()));
        let result = self.execute(&composition, &adapter, working_directory).await;
        step.finish_session();

        let mut summary = result?;
        summary.build_problems = self.logger.build_problems();
        tracing::info!(
            "[WorkflowRunner] Finished: {} invocation(s), {} build problem(s)",
            summary.invocations(),
            summary.build_problems.len()
        );
        Ok(summary)
    }

    async fn execute(
        &self,
        composition: &WorkflowComposition,
        adapter: &CommandExecutionAdapter,
        working_directory: PathBuf,
    ) -> AppResult<RunSummary> {
        let context = Arc::new(WorkflowContext::new(working_directory));
        let workflow = composition.compose(&context)?;
        let runner = ProcessRunner::new();
        let mut summary = RunSummary::default();

        for command_line in workflow {
            if self.cancellation.is_cancelled() {
                context.abort("Build step was interrupted");
                break;
            }

            let events: Arc<EventObserver> = {
                let context = context.clone();
                Arc::new(move |event: &mut CommandResultEvent| context.publish(event))
            };
            let mut execution = adapter.create(command_line, events);
            let exit_code = runner.run(&mut execution, &self.cancellation).await?;
            summary.exit_codes.push(exit_code);

            if self.cancellation.is_cancelled() && !context.is_aborted() {
                context.abort("Build step was interrupted");
            }
        }

        summary.aborted = context.is_aborted();
        Ok(summary)
    }
}
