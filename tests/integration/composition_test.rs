//! Workflow Composition Integration Tests
//!
//! Drives composed workflows by hand: pull an invocation, publish the events
//! its process would have produced, pull the next one.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dotnet_workflow::models::RunnerSettings;
use dotnet_workflow::services::analysis::{DefaultResultsAnalyzer, DotnetWorkflowAnalyzer};
use dotnet_workflow::services::composers::{
    CmdWorkflowComposer, DotnetWorkflowComposer, WorkflowComposer, WorkflowComposition,
};
use dotnet_workflow::services::step::{BuildStepContext, RunnerContext};
use dotnet_workflow::services::LoggerService;
use dotnet_workflow::AppResult;
use dotnet_workflow_commands::{
    CommandResolutionPipeline, CommandStreamResolver, CommandType, ComposedCommandStreamResolver, DotnetCommand,
    DotnetCommandSet, ExactMatchTestCommandsStreamResolver, InMemoryTestNamesSessionManager, SplitTestsFilterSettings,
    StaticArguments, TargetArguments,
};
use dotnet_workflow_core::{
    CommandLine, CommandLineArgument, CommandResultEvent, HostContext, OsType, OutputEvent, OutputStream, TargetType,
    VirtualContext, Workflow, WorkflowContext,
};
use dotnet_workflow_tools::{
    DotnetToolResolver, DotnetVersionParser, LocatorPathResolver, ToolPath, ToolState, ToolStateWorkflowComposer,
};

use crate::common::RecordingLogger;

// ============================================================================
// Helpers
// ============================================================================

fn stdout(context: &WorkflowContext, command_line: &CommandLine, text: &str) -> CommandResultEvent {
    let mut event = CommandResultEvent::Output(OutputEvent::new(text, OutputStream::Stdout, command_line.id()));
    context.publish(&mut event);
    event
}

fn exit(context: &WorkflowContext, command_line: &CommandLine, code: i32) {
    context.publish(&mut CommandResultEvent::ExitCode {
        code,
        command_line_id: command_line.id(),
    });
}

fn args(command_line: &CommandLine) -> Vec<&str> {
    command_line.argument_values().collect()
}

struct Fixture {
    logger: Arc<RecordingLogger>,
    sessions: Arc<InMemoryTestNamesSessionManager>,
    composer: DotnetWorkflowComposer,
}

fn fixture(command: &str, targets: &[&str], arguments: &[&str], split_tests: SplitTestsFilterSettings) -> Fixture {
    let command_type = CommandType::try_parse(command).unwrap();
    let logger = Arc::new(RecordingLogger::default());
    let step = Arc::new(BuildStepContext::new());
    step.start_session(RunnerContext::new(
        RunnerSettings {
            command: Some(command.to_string()),
            split_tests: split_tests.clone(),
            ..Default::default()
        },
        "/work",
    ));

    let dotnet = DotnetCommand::new(
        command_type,
        Arc::new(DotnetToolResolver::new()),
        Arc::new(DefaultResultsAnalyzer::new(command_type, true)),
    )
    .with_targets(targets.iter().map(|t| TargetArguments::path(*t)).collect())
    .with_arguments(Arc::new(StaticArguments(
        arguments.iter().map(|a| CommandLineArgument::new(*a)).collect(),
    )));

    let sessions = Arc::new(InMemoryTestNamesSessionManager::new(split_tests.chunk_size));
    let resolvers: Vec<Arc<dyn CommandStreamResolver>> = vec![
        Arc::new(ComposedCommandStreamResolver),
        Arc::new(ExactMatchTestCommandsStreamResolver::new(split_tests, sessions.clone())),
    ];

    let virtual_context: Arc<dyn VirtualContext> = Arc::new(HostContext::new());
    let composer = DotnetWorkflowComposer::new(
        step,
        Arc::new(DotnetCommandSet::new(vec![dotnet])),
        Arc::new(CommandResolutionPipeline::new(resolvers)),
        Arc::new(ToolStateWorkflowComposer::new(virtual_context.clone(), Arc::new(DotnetVersionParser))),
        virtual_context,
        Arc::new(DotnetWorkflowAnalyzer::new(logger.clone())),
    );

    Fixture {
        logger,
        sessions,
        composer,
    }
}

struct PassThrough;

impl WorkflowComposer for PassThrough {
    fn target(&self) -> TargetType {
        TargetType::Host
    }

    fn compose(&self, _context: &Arc<WorkflowContext>, workflow: Workflow) -> AppResult<Workflow> {
        Ok(workflow)
    }
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_identity_composer_keeps_workflow() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let fixture = fixture("build", &["a.csproj"], &[], SplitTestsFilterSettings::default());
    let composition = WorkflowComposition::new(vec![Arc::new(PassThrough), Arc::new(fixture.composer)]);

    assert_eq!(composition.targets(), vec![TargetType::Tool, TargetType::Host]);

    let mut workflow = composition.compose(&context).unwrap();
    let probe = workflow.next().unwrap();
    assert_eq!(probe.target, TargetType::SystemDiagnostics);
    exit(&context, &probe, 0);

    let build = workflow.next().unwrap();
    assert_eq!(args(&build), vec!["build", "a.csproj"]);
    exit(&context, &build, 0);
    assert!(workflow.next().is_none());
}

#[test]
fn test_no_composers_no_invocations() {
    let context = Arc::new(WorkflowContext::new("/work"));
    assert_eq!(WorkflowComposition::new(Vec::new()).compose(&context).unwrap().count(), 0);
}

#[test]
fn test_arguments_follow_verb_and_targets() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let fixture = fixture(
        "publish",
        &["src/App.csproj"],
        &["--configuration", "Release", "--output", "out dir"],
        SplitTestsFilterSettings::default(),
    );
    let mut workflow = fixture.composer.compose(&context, Workflow::empty()).unwrap();

    let _probe = workflow.next().unwrap();
    let publish = workflow.next().unwrap();
    assert_eq!(
        args(&publish),
        vec!["publish", "src/App.csproj", "--configuration", "Release", "--output", "out dir"]
    );
    assert_eq!(publish.title.as_deref(), Some("dotnet publish src/App.csproj"));
}

#[test]
fn test_exit_code_becomes_single_build_problem() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let fixture = fixture("build", &["a.csproj", "b.csproj"], &[], SplitTestsFilterSettings::default());
    let mut workflow = fixture.composer.compose(&context, Workflow::empty()).unwrap();

    let _probe = workflow.next().unwrap();
    let first = workflow.next().unwrap();
    exit(&context, &first, 1);
    let second = workflow.next().unwrap();
    exit(&context, &second, 1);
    assert!(workflow.next().is_none());

    let problems = fixture.logger.build_problems();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].identity, "dotnet_exit_code1");
    assert_eq!(problems[0].problem_type, "TC_EXIT_CODE");
    assert_eq!(problems[0].description, "Process exited with code 1");
}

#[test]
fn test_wrapped_script_results_reach_the_analyzers() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let logger = Arc::new(RecordingLogger::default());
    let step = Arc::new(BuildStepContext::new());
    step.start_session(RunnerContext::new(
        RunnerSettings {
            command: Some("build".to_string()),
            ..Default::default()
        },
        "/work",
    ));

    let virtual_context: Arc<dyn VirtualContext> = Arc::new(HostContext::with_os(OsType::Windows));
    let dotnet = DotnetCommand::new(
        CommandType::Build,
        Arc::new(DotnetToolResolver::new().with_path(Some(PathBuf::from("C:/sdk/dotnet.cmd")))),
        Arc::new(DefaultResultsAnalyzer::new(CommandType::Build, true)),
    )
    .with_targets(vec![TargetArguments::path("a.csproj")]);

    let composition = WorkflowComposition::new(vec![
        Arc::new(CmdWorkflowComposer::new(
            virtual_context.clone(),
            Arc::new(LocatorPathResolver::new(virtual_context.clone())),
        )),
        Arc::new(DotnetWorkflowComposer::new(
            step,
            Arc::new(DotnetCommandSet::new(vec![dotnet])),
            Arc::new(CommandResolutionPipeline::new(vec![Arc::new(ComposedCommandStreamResolver)])),
            Arc::new(ToolStateWorkflowComposer::new(virtual_context.clone(), Arc::new(DotnetVersionParser))),
            virtual_context,
            Arc::new(DotnetWorkflowAnalyzer::new(logger.clone())),
        )),
    ]);
    let mut workflow = composition.compose(&context).unwrap();

    let probe = workflow.next().unwrap();
    assert_eq!(probe.executable, PathBuf::from("cmd"));
    assert!(probe.chain_contains(TargetType::SystemDiagnostics));
    stdout(&context, &probe, "8.0.100");
    exit(&context, &probe, 0);

    let build = workflow.next().unwrap();
    assert_eq!(build.target, TargetType::Host);
    assert_eq!(build.base().map(|b| b.target), Some(TargetType::Tool));
    exit(&context, &build, 4);
    assert!(workflow.next().is_none());

    let problems = logger.build_problems();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].identity, "dotnet_exit_code4");
}

// ============================================================================
// Tool state
// ============================================================================

#[test]
fn test_version_callback_fires_at_most_once() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let state = ToolState::new(ToolPath::new("dotnet")).on_version(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let composer = ToolStateWorkflowComposer::new(Arc::new(HostContext::new()), Arc::new(DotnetVersionParser));
    let mut workflow = composer.compose(&context, state.clone());

    let probe = workflow.next().unwrap();
    assert_eq!(args(&probe), vec!["--version"]);
    stdout(&context, &probe, "8.0.100");
    stdout(&context, &probe, "9.0.100");
    exit(&context, &probe, 0);
    assert!(workflow.next().is_none());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.version().map(|v| v.to_string()), Some("8.0.100".to_string()));
}

// ============================================================================
// Test splitting
// ============================================================================

fn exact_match(chunk_size: usize) -> SplitTestsFilterSettings {
    SplitTestsFilterSettings {
        enabled: true,
        exact_match: true,
        chunk_size,
    }
}

#[test]
fn test_split_runs_probe_then_one_command_per_chunk() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let fixture = fixture("test", &["Tests.csproj"], &[], exact_match(2));
    let mut workflow = fixture.composer.compose(&context, Workflow::empty()).unwrap();

    let version = workflow.next().unwrap();
    assert_eq!(version.target, TargetType::SystemDiagnostics);
    stdout(&context, &version, "8.0.100");
    exit(&context, &version, 0);

    let list = workflow.next().unwrap();
    assert_eq!(list.target, TargetType::Tool);
    assert_eq!(args(&list).last(), Some(&"--list-tests"));
    for line in ["Build started", "The following Tests are available:", "    A", "    B", "    C"] {
        let event = stdout(&context, &list, line);
        assert!(matches!(event, CommandResultEvent::Output(ref output) if output.is_suppressed()));
    }
    exit(&context, &list, 0);

    let first = workflow.next().unwrap();
    exit(&context, &first, 0);
    let second = workflow.next().unwrap();
    exit(&context, &second, 0);
    assert!(workflow.next().is_none());

    for chunk in [&first, &second] {
        assert_eq!(args(chunk), vec!["test", "Tests.csproj"]);
    }
    assert_ne!(first, second);

    let sessions = fixture.sessions.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].names(), vec!["A", "B", "C"]);
    assert!(fixture.logger.build_problems().is_empty());
}

#[test]
fn test_split_without_discovered_tests_runs_only_probe() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let fixture = fixture("test", &["Tests.csproj"], &[], exact_match(10));
    let mut workflow = fixture.composer.compose(&context, Workflow::empty()).unwrap();

    let _version = workflow.next().unwrap();
    let list = workflow.next().unwrap();
    stdout(&context, &list, "No test is available");
    exit(&context, &list, 0);
    assert!(workflow.next().is_none());
}

#[test]
fn test_split_disabled_runs_plain_test() {
    let context = Arc::new(WorkflowContext::new("/work"));
    let fixture = fixture("test", &["Tests.csproj"], &[], SplitTestsFilterSettings::default());
    let mut workflow = fixture.composer.compose(&context, Workflow::empty()).unwrap();

    let _version = workflow.next().unwrap();
    let test = workflow.next().unwrap();
    assert_eq!(args(&test), vec!["test", "Tests.csproj"]);
    exit(&context, &test, 0);
    assert!(workflow.next().is_none());
}
