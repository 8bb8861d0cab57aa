//! Exact-match test splitting.
//!
//! Turns one `test` command into a `test --list-tests` probe followed by one
//! copy of the test command per chunk of discovered test names. The chunk
//! count is only known once the probe has run, so it is read on the pull
//! that follows the probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dotnet_workflow_core::{CommandLineArgument, CommandResultEvent};

use crate::command::{CommandArguments, CommandType, DotnetBuildContext, DotnetCommand};
use crate::pipeline::{CommandStream, CommandStreamResolver, ResolvingStage};
use crate::split_tests::{SplitTestsFilterSettings, TestNamesSaver, TestNamesSession, TestNamesSessionManager};

pub const TESTS_LIST_OUTPUT_MARKER: &str = "The following Tests are available:";

pub struct ExactMatchTestCommandsStreamResolver {
    settings: SplitTestsFilterSettings,
    sessions: Arc<dyn TestNamesSessionManager>,
}

impl ExactMatchTestCommandsStreamResolver {
    pub fn new(settings: SplitTestsFilterSettings, sessions: Arc<dyn TestNamesSessionManager>) -> Self {
        Self { settings, sessions }
    }
}

impl CommandStreamResolver for ExactMatchTestCommandsStreamResolver {
    fn stage(&self) -> ResolvingStage {
        ResolvingStage::Transformation
    }

    fn should_apply(&self, commands: &CommandStream) -> bool {
        self.settings.is_active()
            && self.settings.use_exact_match_filter()
            && commands.contains(CommandType::Test)
    }

    fn apply(&self, commands: CommandStream) -> CommandStream {
        let sessions = self.sessions.clone();
        commands.flat_map(
            move |command| -> Box<dyn Iterator<Item = DotnetCommand> + Send> {
                if command.command_type == CommandType::Test {
                    Box::new(SplitTestCommands::new(command, sessions.start_session()))
                } else {
                    Box::new(std::iter::once(command))
                }
            },
            [CommandType::ListTests],
        )
    }
}

/// The probe, then the test command once per chunk.
struct SplitTestCommands {
    test_command: DotnetCommand,
    session: Arc<dyn TestNamesSession>,
    probe_emitted: bool,
    remaining: Option<usize>,
}

impl SplitTestCommands {
    fn new(test_command: DotnetCommand, session: Arc<dyn TestNamesSession>) -> Self {
        Self {
            test_command,
            session,
            probe_emitted: false,
            remaining: None,
        }
    }

    fn list_tests_command(&self) -> DotnetCommand {
        let handler = ListTestsOutputHandler::new(self.session.saver());
        self.test_command
            .clone()
            .with_command_type(CommandType::ListTests)
            .with_arguments(Arc::new(ListTestsArguments {
                inner: self.test_command.arguments.clone(),
            }))
            .with_results_observer(Arc::new(move |event: &mut CommandResultEvent| handler.on_event(event)))
    }
}

impl Iterator for SplitTestCommands {
    type Item = DotnetCommand;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.probe_emitted {
            self.probe_emitted = true;
            return Some(self.list_tests_command());
        }

        let remaining = self.remaining.get_or_insert_with(|| {
            let chunks = self.session.chunks_count();
            if chunks == 0 {
                tracing::warn!("[ExactMatchTestSplitting] No tests were discovered; the test command is skipped");
            } else {
                tracing::debug!("[ExactMatchTestSplitting] Running tests in {} chunk(s)", chunks);
            }
            chunks
        });

        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(self.test_command.clone())
    }
}

/// The test command's own arguments followed by `--list-tests`.
struct ListTestsArguments {
    inner: Arc<dyn CommandArguments>,
}

impl CommandArguments for ListTestsArguments {
    fn arguments(&self, context: &DotnetBuildContext) -> Vec<CommandLineArgument> {
        let mut arguments = self.inner.arguments(context);
        arguments.push(CommandLineArgument::mandatory("--list-tests"));
        arguments
    }
}

/// Collects test names printed after the marker line. Every line of the
/// probe is suppressed from the build log.
pub struct ListTestsOutputHandler {
    saver: Arc<dyn TestNamesSaver>,
    tests_output_started: AtomicBool,
}

impl ListTestsOutputHandler {
    pub fn new(saver: Arc<dyn TestNamesSaver>) -> Self {
        Self {
            saver,
            tests_output_started: AtomicBool::new(false),
        }
    }

    pub fn on_event(&self, event: &mut CommandResultEvent) {
        let CommandResultEvent::Output(output) = event else {
            return;
        };

        output.suppress();
        let line = output.text.trim();

        if !self.tests_output_started.load(Ordering::SeqCst) {
            if line.eq_ignore_ascii_case(TESTS_LIST_OUTPUT_MARKER) {
                self.tests_output_started.store(true, Ordering::SeqCst);
            }
            return;
        }

        for name in line.split_whitespace() {
            self.saver.try_save(name);
        }
    }
}
