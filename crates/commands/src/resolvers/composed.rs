//! Final argument composition.
//!
//! Positional order is fixed: verb tokens (when the tool wants them), then
//! every target argument in group order, then the command's own arguments.

use std::sync::Arc;

use dotnet_workflow_core::CommandLineArgument;

use crate::command::{CommandArguments, CommandType, DotnetBuildContext, TargetArguments};
use crate::pipeline::{CommandStream, CommandStreamResolver, ResolvingStage};

#[derive(Debug, Clone, Copy, Default)]
pub struct ComposedCommandStreamResolver;

impl CommandStreamResolver for ComposedCommandStreamResolver {
    fn stage(&self) -> ResolvingStage {
        ResolvingStage::FinalComposition
    }

    fn should_apply(&self, _commands: &CommandStream) -> bool {
        true
    }

    fn apply(&self, commands: CommandStream) -> CommandStream {
        commands.map(|mut command| {
            command.arguments = Arc::new(ComposedArguments {
                command_type: command.command_type,
                command_required: command.tool_resolver.is_command_required(),
                targets: command.target_arguments.clone(),
                command_arguments: command.arguments.clone(),
            });
            command
        })
    }
}

struct ComposedArguments {
    command_type: CommandType,
    command_required: bool,
    targets: Vec<TargetArguments>,
    command_arguments: Arc<dyn CommandArguments>,
}

impl CommandArguments for ComposedArguments {
    fn arguments(&self, context: &DotnetBuildContext) -> Vec<CommandLineArgument> {
        let mut arguments = Vec::new();

        if self.command_required {
            arguments.extend(self.command_type.words().into_iter().map(CommandLineArgument::mandatory));
        }

        // targets e.g. project files or directories
        arguments.extend(self.targets.iter().flat_map(|t| t.arguments.iter().cloned()));

        arguments.extend(self.command_arguments.arguments(context));
        arguments
    }
}
