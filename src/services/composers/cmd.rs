//! Shell Wrapper Composer
//!
//! Windows cannot start `.cmd` and `.bat` files directly. On Windows
//! targets such invocations are wrapped as
//! `cmd /D /C "<script> <arguments>"`, keeping the script invocation as the
//! base of the wrapper. The `cmd` location is resolved once per run, the
//! first time a script shows up, and reused afterwards.

use std::path::PathBuf;
use std::sync::Arc;

use dotnet_workflow_core::{
    CommandLine, CommandLineArgument, OsType, TargetType, VirtualContext, Workflow, WorkflowContext,
};
use dotnet_workflow_tools::{PathResolverState, PathResolverWorkflowComposer};

use crate::services::composers::WorkflowComposer;
use crate::services::execution::presentation::combine_arguments;
use crate::utils::error::AppResult;

const CMD_EXECUTABLE: &str = "cmd";

pub struct CmdWorkflowComposer {
    virtual_context: Arc<dyn VirtualContext>,
    path_resolver: Arc<dyn PathResolverWorkflowComposer>,
}

impl CmdWorkflowComposer {
    pub fn new(virtual_context: Arc<dyn VirtualContext>, path_resolver: Arc<dyn PathResolverWorkflowComposer>) -> Self {
        Self {
            virtual_context,
            path_resolver,
        }
    }
}

impl WorkflowComposer for CmdWorkflowComposer {
    fn target(&self) -> TargetType {
        TargetType::Host
    }

    fn compose(&self, context: &Arc<WorkflowContext>, workflow: Workflow) -> AppResult<Workflow> {
        if self.virtual_context.target_os() != OsType::Windows {
            return Ok(workflow);
        }

        Ok(Workflow::new(ScriptWrapping {
            context: context.clone(),
            virtual_context: self.virtual_context.clone(),
            path_resolver: self.path_resolver.clone(),
            inner: workflow,
            cmd: None,
            resolution: None,
            waiting: None,
        }))
    }
}

struct ScriptWrapping {
    context: Arc<WorkflowContext>,
    virtual_context: Arc<dyn VirtualContext>,
    path_resolver: Arc<dyn PathResolverWorkflowComposer>,
    inner: Workflow,
    /// Set once `cmd` resolution has been started.
    cmd: Option<PathResolverState>,
    resolution: Option<Workflow>,
    /// Script invocation waiting for `cmd` to be resolved.
    waiting: Option<CommandLine>,
}

impl ScriptWrapping {
    fn is_script(command_line: &CommandLine) -> bool {
        matches!(command_line.executable_extension().as_str(), "cmd" | "bat")
    }

    fn cmd_path(&self) -> PathBuf {
        self.cmd
            .as_ref()
            .and_then(PathResolverState::resolved_path)
            .unwrap_or_else(|| PathBuf::from(CMD_EXECUTABLE))
    }

    fn wrap(&self, script: CommandLine) -> CommandLine {
        let executable = self.virtual_context.resolve_path(&script.executable.to_string_lossy());
        let script_line = combine_arguments(std::iter::once(executable.as_str()).chain(script.argument_values()));

        let environment = script.environment.clone();
        let title = script.title.clone();
        let description = script.description.clone();
        let working_directory = script.working_directory.clone();

        let mut wrapper = CommandLine::wrapping(script, TargetType::Host, self.cmd_path(), working_directory)
            .with_arguments(vec![
                CommandLineArgument::mandatory("/D"),
                CommandLineArgument::mandatory("/C"),
                CommandLineArgument::target(format!("\"{}\"", script_line)),
            ])
            .with_environment(environment)
            .with_description(description);
        wrapper.title = title;
        self.context.link(&wrapper);
        wrapper
    }
}

impl Iterator for ScriptWrapping {
    type Item = CommandLine;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(resolution) = self.resolution.as_mut() {
                if let Some(command_line) = resolution.next() {
                    return Some(command_line);
                }
                self.resolution = None;
            }

            if let Some(script) = self.waiting.take() {
                return Some(self.wrap(script));
            }

            let command_line = self.inner.next()?;
            if !Self::is_script(&command_line) {
                return Some(command_line);
            }

            if self.cmd.is_some() {
                return Some(self.wrap(command_line));
            }

            let state = PathResolverState::new(CMD_EXECUTABLE);
            self.resolution = Some(self.path_resolver.compose(&self.context, state.clone()));
            self.cmd = Some(state);
            self.waiting = Some(command_line);
        }
    }
}
