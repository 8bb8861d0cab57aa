//! Command Set
//!
//! Picks the configured command and fans it out into one command per target
//! group. A command without targets still runs once with an empty group.
//! For `test`, consecutive assembly targets are run together as one
//! `test-assembly` command; project targets stay separate.

use std::collections::HashMap;

use crate::command::{CommandType, DotnetCommand, TargetArguments};
use crate::pipeline::CommandStream;

pub struct DotnetCommandSet {
    known_commands: HashMap<CommandType, DotnetCommand>,
}

impl DotnetCommandSet {
    pub fn new(commands: Vec<DotnetCommand>) -> Self {
        Self {
            known_commands: commands
                .into_iter()
                .map(|command| (command.command_type, command))
                .collect(),
        }
    }

    /// Commands for the given command id, matched case-insensitively.
    /// Unknown, blank or missing ids produce an empty stream.
    pub fn commands(&self, command_id: Option<&str>) -> CommandStream {
        let Some(command) = command_id
            .and_then(CommandType::try_parse)
            .and_then(|command_type| self.known_commands.get(&command_type))
        else {
            if let Some(id) = command_id.filter(|id| !id.trim().is_empty()) {
                tracing::debug!("[DotnetCommandSet] Unknown command \"{}\"", id);
            }
            return CommandStream::empty();
        };

        let commands = split_by_targets(command);
        let kinds: Vec<CommandType> = commands.iter().map(|c| c.command_type).collect();
        CommandStream::new(commands, kinds)
    }
}

fn split_by_targets(command: &DotnetCommand) -> Vec<DotnetCommand> {
    if command.target_arguments.is_empty() {
        return vec![command.clone().with_targets(vec![TargetArguments::default()])];
    }

    if command.command_type != CommandType::Test {
        return command
            .target_arguments
            .iter()
            .map(|target| command.clone().with_targets(vec![target.clone()]))
            .collect();
    }

    let mut commands = Vec::new();
    let mut assemblies: Vec<TargetArguments> = Vec::new();
    for target in &command.target_arguments {
        if target.is_assembly() {
            assemblies.push(target.clone());
            continue;
        }

        if !assemblies.is_empty() {
            commands.push(test_assembly(command, std::mem::take(&mut assemblies)));
        }
        commands.push(command.clone().with_targets(vec![target.clone()]));
    }

    if !assemblies.is_empty() {
        commands.push(test_assembly(command, assemblies));
    }
    commands
}

fn test_assembly(command: &DotnetCommand, assemblies: Vec<TargetArguments>) -> DotnetCommand {
    let merged = TargetArguments::new(assemblies.into_iter().flat_map(|t| t.arguments).collect());
    command
        .clone()
        .with_command_type(CommandType::TestAssembly)
        .with_targets(vec![merged])
}
