//! Dotnet Workflow Composer
//!
//! Turns the resolved commands of the step into `dotnet` invocations.
//!
//! Before the first command run by a cross-platform tool, the tool state
//! lookup is spliced in (path discovery under a container, then
//! `dotnet --version`), so every command can be built with the discovered
//! location and version. Each invocation's result events are forwarded to
//! its command's observer; its exit code goes to the results analyzer and
//! then to the workflow analyzer. The workflow stops producing invocations
//! once the context is aborted, and the workflow analyzer summarizes the
//! step when the commands run out.

use std::path::PathBuf;
use std::sync::Arc;

use dotnet_workflow_commands::{
    CommandResolutionPipeline, CommandResults, CommandStream, DotnetBuildContext, DotnetCommand, DotnetCommandSet,
};
use dotnet_workflow_core::{
    CommandLine, CommandResultEvent, Subscription, TargetType, VirtualContext, Workflow, WorkflowContext,
};
use dotnet_workflow_tools::{ToolPlatform, ToolState, ToolStateWorkflowComposer, Version};

use crate::services::analysis::{WorkflowAnalyzer, WorkflowAnalyzerContext};
use crate::services::composers::WorkflowComposer;
use crate::services::execution::presentation::combine_arguments;
use crate::services::step::BuildStepContext;
use crate::utils::error::AppResult;

pub struct DotnetWorkflowComposer {
    step: Arc<BuildStepContext>,
    command_set: Arc<DotnetCommandSet>,
    pipeline: Arc<CommandResolutionPipeline>,
    tool_state: Arc<ToolStateWorkflowComposer>,
    virtual_context: Arc<dyn VirtualContext>,
    workflow_analyzer: Arc<dyn WorkflowAnalyzer>,
}

impl DotnetWorkflowComposer {
    pub fn new(
        step: Arc<BuildStepContext>,
        command_set: Arc<DotnetCommandSet>,
        pipeline: Arc<CommandResolutionPipeline>,
        tool_state: Arc<ToolStateWorkflowComposer>,
        virtual_context: Arc<dyn VirtualContext>,
        workflow_analyzer: Arc<dyn WorkflowAnalyzer>,
    ) -> Self {
        Self {
            step,
            command_set,
            pipeline,
            tool_state,
            virtual_context,
            workflow_analyzer,
        }
    }
}

impl WorkflowComposer for DotnetWorkflowComposer {
    fn target(&self) -> TargetType {
        TargetType::Tool
    }

    fn compose(&self, context: &Arc<WorkflowContext>, workflow: Workflow) -> AppResult<Workflow> {
        let runner = self.step.runner_context()?;
        let commands = self
            .pipeline
            .resolve(self.command_set.commands(runner.settings.command.as_deref()));

        Ok(workflow.then(Workflow::new(DotnetCommandLines {
            context: context.clone(),
            commands,
            tool_state_composer: self.tool_state.clone(),
            virtual_context: self.virtual_context.clone(),
            workflow_analyzer: self.workflow_analyzer.clone(),
            analyzer_context: Arc::new(WorkflowAnalyzerContext::new()),
            tool_state: None,
            lookup: None,
            pending: None,
            current: None,
            finished: false,
        })))
    }
}

struct DotnetCommandLines {
    context: Arc<WorkflowContext>,
    commands: CommandStream,
    tool_state_composer: Arc<ToolStateWorkflowComposer>,
    virtual_context: Arc<dyn VirtualContext>,
    workflow_analyzer: Arc<dyn WorkflowAnalyzer>,
    analyzer_context: Arc<WorkflowAnalyzerContext>,
    tool_state: Option<ToolState>,
    /// Tool state invocations still to hand out.
    lookup: Option<Workflow>,
    /// Command waiting for the lookup to finish.
    pending: Option<DotnetCommand>,
    /// Result routing of the invocation handed out last.
    current: Option<Subscription>,
    finished: bool,
}

impl DotnetCommandLines {
    fn finish(&mut self) {
        self.finished = true;
        self.pending = None;
        self.workflow_analyzer.summarize(&self.analyzer_context);
    }

    fn start_lookup(&mut self, command: &DotnetCommand) {
        let state = ToolState::new(command.tool_resolver.executable()).on_version(|version: &Version| {
            tracing::info!("[DotnetWorkflowComposer] .NET SDK version {}", version);
        });
        self.lookup = Some(self.tool_state_composer.compose(&self.context, state.clone()));
        self.tool_state = Some(state);
    }

    fn executable(&self, command: &DotnetCommand) -> PathBuf {
        let tool = command.tool_resolver.executable();
        let discovered = self
            .tool_state
            .as_ref()
            .filter(|_| command.tool_resolver.platform() == ToolPlatform::CrossPlatform)
            .and_then(ToolState::resolved_path);

        match discovered {
            Some(path) => path,
            None if self.virtual_context.is_virtual() => tool.virtual_path,
            None => tool.path,
        }
    }

    fn command_line(&mut self, command: DotnetCommand) -> CommandLine {
        let version = self.tool_state.as_ref().and_then(ToolState::version);
        let build_context = DotnetBuildContext::new(self.context.working_directory(), command.command_type)
            .with_tool_version(version);

        let arguments = command.get_arguments(&build_context);
        let executable = self.executable(&command);
        let name = command.tool_resolver.executable().name();
        let mut title: Vec<&str> = vec![name.as_str()];
        title.extend(command.command_type.words());
        title.extend(
            command
                .target_arguments
                .iter()
                .flat_map(|t| t.arguments.iter().map(|a| a.value.as_str())),
        );
        let title = combine_arguments(title);

        let command_line = CommandLine::new(TargetType::Tool, executable, self.context.working_directory())
            .with_arguments(arguments)
            .with_environment(command.environment(&build_context))
            .with_title(title);

        let results_observer = command.results_observer.clone();
        let results_analyzer = command.results_analyzer.clone();
        let workflow_analyzer = self.workflow_analyzer.clone();
        let analyzer_context = self.analyzer_context.clone();
        self.current = Some(self.context.subscribe_to(
            command_line.id(),
            Arc::new(move |event: &mut CommandResultEvent| {
                results_observer.on_next(event);
                if let Some(exit_code) = event.exit_code() {
                    let mut results = CommandResults::new();
                    results_analyzer.analyze(exit_code, &mut results);
                    workflow_analyzer.register_result(&analyzer_context, &results, exit_code);
                }
            }),
        ));

        command_line
    }
}

impl Iterator for DotnetCommandLines {
    type Item = CommandLine;

    fn next(&mut self) -> Option<Self::Item> {
        // the previous invocation has run by now
        self.current = None;

        loop {
            if self.finished {
                return None;
            }

            if let Some(lookup) = self.lookup.as_mut() {
                if let Some(command_line) = lookup.next() {
                    return Some(command_line);
                }
                self.lookup = None;
            }

            if self.context.is_aborted() {
                tracing::info!("[DotnetWorkflowComposer] Workflow aborted, no further commands");
                self.finish();
                return None;
            }

            let Some(command) = self.pending.take().or_else(|| self.commands.next()) else {
                self.finish();
                return None;
            };

            if self.tool_state.is_none() && command.tool_resolver.platform() == ToolPlatform::CrossPlatform {
                self.start_lookup(&command);
                self.pending = Some(command);
                continue;
            }

            return Some(self.command_line(command));
        }
    }
}
