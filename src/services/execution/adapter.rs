//! Command Execution Adapter
//!
//! Bridges one running process to the rest of the step:
//!
//! - every output line becomes a [`CommandResultEvent`] delivered to the
//!   invocation's observer before anything is logged
//! - lines no observer suppressed are written to the build log, through the
//!   messages guard when it is enabled
//! - invocations that involve a diagnostic probe are logged at trace level
//!   only
//!
//! The adapter never launches anything itself; the process runner calls into
//! a [`CommandExecution`] as the process makes progress.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dotnet_workflow_core::{
    plain_text, CommandLine, CommandResultEvent, EventObserver, OutputEvent, OutputStream, StdOutText, Subscription,
    TargetType, VirtualContext,
};

use crate::services::execution::guard::{OutputReplacer, TransparentOutputReplacer};
use crate::services::execution::presentation::CommandLinePresentationService;
use crate::services::logging::LoggerService;
use crate::services::messages::ServiceMessagesRegister;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingStrategy {
    Default,
    HiddenInBuildLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationAction {
    KillProcess,
    KillProcessTree,
}

// ============================================================================
// Adapter
// ============================================================================

#[derive(Clone)]
pub struct CommandExecutionAdapter {
    logger: Arc<dyn LoggerService>,
    virtual_context: Arc<dyn VirtualContext>,
    presentation: Arc<CommandLinePresentationService>,
    output_replacer: Arc<dyn OutputReplacer>,
    service_messages: Option<Arc<ServiceMessagesRegister>>,
}

impl CommandExecutionAdapter {
    pub fn new(logger: Arc<dyn LoggerService>, virtual_context: Arc<dyn VirtualContext>) -> Self {
        Self {
            logger,
            presentation: Arc::new(CommandLinePresentationService::new(virtual_context.clone())),
            virtual_context,
            output_replacer: Arc::new(TransparentOutputReplacer),
            service_messages: None,
        }
    }

    /// Route visible output through `guard`. With `enabled` false output is
    /// logged unchanged.
    pub fn with_messages_guard(mut self, guard: Arc<dyn OutputReplacer>, enabled: bool) -> Self {
        self.output_replacer = if enabled {
            guard
        } else {
            Arc::new(TransparentOutputReplacer)
        };
        self
    }

    pub fn with_service_messages(mut self, register: Arc<ServiceMessagesRegister>) -> Self {
        self.service_messages = Some(register);
        self
    }

    pub fn create(&self, command_line: CommandLine, events: Arc<EventObserver>) -> CommandExecution {
        let strategy = if command_line.chain_contains(TargetType::SystemDiagnostics) {
            LoggingStrategy::HiddenInBuildLog
        } else {
            LoggingStrategy::Default
        };

        CommandExecution {
            adapter: self.clone(),
            command_line,
            events,
            strategy,
            block: None,
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Progress callbacks of one invocation.
pub struct CommandExecution {
    adapter: CommandExecutionAdapter,
    command_line: CommandLine,
    events: Arc<EventObserver>,
    strategy: LoggingStrategy,
    block: Option<Subscription>,
}

impl CommandExecution {
    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    pub fn logging_strategy(&self) -> LoggingStrategy {
        self.strategy
    }

    pub fn process_started(&mut self) {
        if let Some(title) = self.command_line.title.clone().filter(|t| !t.trim().is_empty()) {
            match self.strategy {
                LoggingStrategy::HiddenInBuildLog => self.write_text(&title),
                LoggingStrategy::Default => self.block = Some(self.adapter.logger.write_block(&title)),
            }
        }

        // outermost first, down to the invocation that was wrapped
        let starting: Vec<Vec<StdOutText>> = self
            .command_line
            .chain()
            .map(|command_line| {
                let mut line = vec![StdOutText::new("Starting: ")];
                if !command_line.description.is_empty() {
                    line.extend(command_line.description.iter().cloned());
                    line.push(StdOutText::new(" "));
                }
                line.extend(
                    self.adapter
                        .presentation
                        .build_executable_presentation(&command_line.executable),
                );
                line.extend(self.adapter.presentation.build_args_presentation(&command_line.arguments));
                line
            })
            .collect();
        for line in &starting {
            self.write_fragments(line);
        }

        let working_directory = self
            .adapter
            .virtual_context
            .resolve_path(&self.command_line.working_directory.to_string_lossy());
        self.write_fragments(&[StdOutText::new("in directory: "), StdOutText::new(working_directory)]);
    }

    pub fn on_standard_output(&self, text: &str) {
        if let Some(register) = &self.adapter.service_messages {
            register.dispatch(text);
        }

        let mut event = self.output_event(text, OutputStream::Stdout);
        self.notify(&mut event);
        if !is_suppressed(&event) {
            self.write_text(text);
        }
    }

    pub fn on_error_output(&self, text: &str) {
        let mut event = self.output_event(text, OutputStream::Stderr);
        self.notify(&mut event);
        if is_suppressed(&event) {
            return;
        }

        match self.strategy {
            LoggingStrategy::Default => {
                for line in self.adapter.output_replacer.replace(text) {
                    self.adapter.logger.write_warning(&line);
                }
            }
            LoggingStrategy::HiddenInBuildLog => self.adapter.logger.write_trace(text),
        }
    }

    pub fn process_finished(&mut self, exit_code: i32) {
        let mut event = CommandResultEvent::ExitCode {
            code: exit_code,
            command_line_id: self.command_line.id(),
        };
        self.notify(&mut event);
        self.block.take();
    }

    /// The process never started. Reported like a run without output that
    /// exited with `exit_code`, so analyzers see it as an ordinary failure.
    pub fn process_failed_to_start(&mut self, error: &std::io::Error, exit_code: i32) {
        let message = format!("Failed to start {}: {}", self.command_line.executable.display(), error);
        match self.strategy {
            LoggingStrategy::Default => {
                for line in self.adapter.output_replacer.replace(&message) {
                    self.adapter.logger.write_error_output(&line);
                }
            }
            LoggingStrategy::HiddenInBuildLog => self.adapter.logger.write_trace(&message),
        }
        self.process_finished(exit_code);
    }

    pub fn interrupt_requested(&self) -> TerminationAction {
        TerminationAction::KillProcessTree
    }

    fn output_event(&self, text: &str, stream: OutputStream) -> CommandResultEvent {
        CommandResultEvent::Output(OutputEvent::new(text, stream, self.command_line.id()))
    }

    fn notify(&self, event: &mut CommandResultEvent) {
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| self.events.on_next(event)));
        if delivered.is_err() {
            tracing::debug!(
                "[CommandExecution] Result observer panicked for {}; continuing",
                self.command_line.id()
            );
        }
    }

    fn write_text(&self, text: &str) {
        match self.strategy {
            LoggingStrategy::Default => {
                for line in self.adapter.output_replacer.replace(text) {
                    self.adapter.logger.write_standard_output(&[StdOutText::new(line)]);
                }
            }
            LoggingStrategy::HiddenInBuildLog => self.adapter.logger.write_trace(text),
        }
    }

    fn write_fragments(&self, text: &[StdOutText]) {
        match self.strategy {
            LoggingStrategy::Default => {
                let replacer = &self.adapter.output_replacer;
                let guarded: Vec<StdOutText> = text
                    .iter()
                    .map(|fragment| StdOutText {
                        text: replacer.replace(&fragment.text).join(" "),
                        ..fragment.clone()
                    })
                    .collect();

                // a secret spanning several fragments only shows up in the whole line
                let line = plain_text(&guarded);
                let whole = replacer.replace(&line).join(" ");
                if whole == line {
                    self.adapter.logger.write_standard_output(&guarded);
                } else {
                    self.adapter.logger.write_standard_output(&[StdOutText::new(whole)]);
                }
            }
            LoggingStrategy::HiddenInBuildLog => self.adapter.logger.write_trace(&plain_text(text)),
        }
    }
}

fn is_suppressed(event: &CommandResultEvent) -> bool {
    matches!(event, CommandResultEvent::Output(output) if output.is_suppressed())
}
