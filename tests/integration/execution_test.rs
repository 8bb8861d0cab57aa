//! Execution Integration Tests
//!
//! Real processes through the adapter and the tokio process runner.

#![cfg(unix)]

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use dotnet_workflow::services::execution::{CommandExecutionAdapter, MessagesGuard, ProcessRunner};
use dotnet_workflow_core::{
    CommandLine, CommandLineArgument, CommandResultEvent, EventObserver, HostContext, TargetType,
};

use crate::common::RecordingLogger;

fn shell(target: TargetType, script: &str) -> CommandLine {
    CommandLine::new(target, "sh", std::env::temp_dir())
        .with_arguments(vec![CommandLineArgument::mandatory("-c"), CommandLineArgument::new(script)])
        .with_title("shell")
}

fn adapter(logger: Arc<RecordingLogger>, guard_enabled: bool) -> CommandExecutionAdapter {
    CommandExecutionAdapter::new(logger, Arc::new(HostContext::new()))
        .with_messages_guard(Arc::new(MessagesGuard::new(vec!["s3cr3t".to_string()])), guard_enabled)
}

fn recorder() -> (Arc<EventObserver>, Arc<Mutex<Vec<CommandResultEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let observer: Arc<EventObserver> =
        Arc::new(move |event: &mut CommandResultEvent| sink.lock().unwrap().push(event.clone()));
    (observer, events)
}

#[tokio::test]
async fn test_diagnostics_never_reach_visible_log() {
    for guard_enabled in [true, false] {
        let logger = Arc::new(RecordingLogger::default());
        let (observer, events) = recorder();
        let mut execution = adapter(logger.clone(), guard_enabled).create(
            shell(TargetType::SystemDiagnostics, "echo 8.0.100; echo probe-warning >&2"),
            observer,
        );

        let exit_code = ProcessRunner::new()
            .run(&mut execution, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(exit_code, 0);
        assert!(logger.visible().is_empty(), "visible: {:?}", logger.visible());
        let traces = logger.traces().join("\n");
        assert!(traces.contains("8.0.100"));
        assert!(traces.contains("probe-warning"));

        // programmatic observers still see everything
        let outputs: Vec<String> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.output().map(str::to_string))
            .collect();
        assert!(outputs.contains(&"8.0.100".to_string()));
    }
}

#[tokio::test]
async fn test_diagnostic_that_cannot_start_is_not_an_error() {
    let logger = Arc::new(RecordingLogger::default());
    let (observer, events) = recorder();
    let probe = CommandLine::new(TargetType::SystemDiagnostics, "/nonexistent/dotnet", std::env::temp_dir())
        .with_arguments(vec![CommandLineArgument::new("--version")]);
    let mut execution = adapter(logger.clone(), true).create(probe, observer);

    let exit_code = ProcessRunner::new()
        .run(&mut execution, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(exit_code, -1);
    assert!(logger.visible().is_empty(), "visible: {:?}", logger.visible());
    assert!(logger.traces().join("\n").contains("Failed to start /nonexistent/dotnet"));

    let events = events.lock().unwrap();
    assert!(events.iter().all(|e| e.output().is_none()));
    assert_eq!(events.last().and_then(|e| e.exit_code()), Some(-1));
}

#[tokio::test]
async fn test_visible_output_is_redacted_but_events_are_not() {
    let logger = Arc::new(RecordingLogger::default());
    let (observer, events) = recorder();
    let mut execution = adapter(logger.clone(), true)
        .create(shell(TargetType::Tool, "echo token=s3cr3t; echo s3cr3t >&2; exit 7"), observer);

    let exit_code = ProcessRunner::new()
        .run(&mut execution, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(exit_code, 7);
    let visible = logger.visible_text();
    assert!(visible.contains("token=*******"));
    assert!(!visible.contains("token=s3cr3t"));
    assert!(visible.contains("Starting: "));

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| e.output() == Some("token=s3cr3t")));
    assert_eq!(events.last().and_then(CommandResultEvent::exit_code), Some(7));
}

#[tokio::test]
async fn test_suppressed_lines_stay_out_of_log() {
    let logger = Arc::new(RecordingLogger::default());
    let observer: Arc<EventObserver> = Arc::new(|event: &mut CommandResultEvent| {
        if let CommandResultEvent::Output(output) = event {
            if output.text.starts_with("hidden") {
                output.suppress();
            }
        }
    });
    let mut execution = adapter(logger.clone(), false)
        .create(shell(TargetType::Tool, "echo hidden line; echo shown line"), observer);

    ProcessRunner::new()
        .run(&mut execution, &CancellationToken::new())
        .await
        .unwrap();

    let visible = logger.visible_text();
    assert!(visible.contains("shown line"));
    assert!(!visible.contains("hidden line"));
}

#[tokio::test]
async fn test_cancellation_terminates_process() {
    let logger = Arc::new(RecordingLogger::default());
    let (observer, _events) = recorder();
    let mut execution = adapter(logger, false).create(shell(TargetType::Tool, "sleep 30"), observer);

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let exit_code = ProcessRunner::new().run(&mut execution, &token).await.unwrap();
    assert_ne!(exit_code, 0);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}
