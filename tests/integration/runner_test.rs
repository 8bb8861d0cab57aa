//! Runner Integration Tests
//!
//! Complete steps against a shell script standing in for `dotnet`.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dotnet_workflow::services::logging::{ColorTheme, ConsoleLoggerService};
use dotnet_workflow::{RunnerSettings, WorkflowRunner};
use dotnet_workflow_commands::SplitTestsFilterSettings;

use crate::common::Buffer;

const FAKE_DOTNET: &str = r#"#!/bin/sh
case "$*" in
  --version)
    echo "8.0.100"
    ;;
  *--list-tests*)
    echo "Build started"
    echo "The following Tests are available:"
    echo "    A"
    echo "    B"
    echo "    C"
    ;;
  *)
    echo "ran $*"
    exit "${FAKE_EXIT_CODE:-0}"
    ;;
esac
"#;

fn fake_dotnet(dir: &Path) -> PathBuf {
    let path = dir.join("dotnet");
    std::fs::write(&path, FAKE_DOTNET).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn settings(dir: &Path, command: &str, targets: &[&str]) -> RunnerSettings {
    RunnerSettings {
        command: Some(command.to_string()),
        targets: targets.iter().map(|t| t.to_string()).collect(),
        working_directory: Some(dir.to_path_buf()),
        dotnet_path: Some(fake_dotnet(dir)),
        ..RunnerSettings::default()
    }
}

fn runner(settings: RunnerSettings) -> (WorkflowRunner, Buffer) {
    let buffer = Buffer::default();
    let logger = ConsoleLoggerService::with_writer(Box::new(buffer.clone())).with_theme(ColorTheme::Plain);
    (WorkflowRunner::new(settings).with_logger(Arc::new(logger)), buffer)
}

#[tokio::test]
async fn test_build_runs_probe_then_each_target() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path(), "build", &["a.csproj", "b.csproj"]);
    settings.arguments = vec!["-c".to_string(), "Release".to_string()];
    let (runner, log) = runner(settings);

    let summary = runner.run().await.unwrap();

    assert_eq!(summary.exit_codes, vec![0, 0, 0]);
    assert!(summary.is_success());

    let log = log.contents();
    assert!(log.contains("ran build a.csproj -c Release"));
    assert!(log.contains("ran build b.csproj -c Release"));
    assert!(log.contains("Starting: "));
    // the version probe stays out of the visible log
    assert!(!log.contains("8.0.100"));
    assert!(!log.contains("--version"));
}

#[tokio::test]
async fn test_command_id_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "Build", &["a.csproj", "b.csproj"]);
    assert!(settings.validate().is_ok());
    let (runner, log) = runner(settings);

    let summary = runner.run().await.unwrap();

    assert_eq!(summary.exit_codes, vec![0, 0, 0]);
    assert!(log.contents().contains("ran build a.csproj"));
    assert!(log.contents().contains("ran build b.csproj"));
}

#[tokio::test]
async fn test_missing_tool_becomes_single_build_problem() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path(), "build", &["a.csproj", "b.csproj"]);
    settings.dotnet_path = Some(PathBuf::from("/nonexistent/dotnet"));
    let (runner, log) = runner(settings);

    let summary = runner.run().await.unwrap();

    // version probe, then both targets
    assert_eq!(summary.exit_codes, vec![-1, -1, -1]);
    assert_eq!(summary.build_problems.len(), 1);
    assert_eq!(summary.build_problems[0].identity, "dotnet_exit_code-1");
    let log = log.contents();
    assert!(log.contains("Failed to start /nonexistent/dotnet"));
    assert!(!log.contains("--version"));
}

#[tokio::test]
async fn test_failing_command_reports_build_problem() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path(), "pack", &[]);
    settings.environment.insert("FAKE_EXIT_CODE".to_string(), "3".to_string());
    let (runner, log) = runner(settings);

    let summary = runner.run().await.unwrap();

    assert_eq!(summary.exit_codes, vec![0, 3]);
    assert!(!summary.is_success());
    assert_eq!(summary.build_problems.len(), 1);
    assert_eq!(summary.build_problems[0].identity, "dotnet_exit_code3");
    assert!(log.contents().contains("Process exited with code 3"));
}

#[tokio::test]
async fn test_exit_code_ignored_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path(), "pack", &[]);
    settings.environment.insert("FAKE_EXIT_CODE".to_string(), "3".to_string());
    settings.fail_build_on_exit_code = false;
    let (runner, _log) = runner(settings);

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.exit_codes, vec![0, 3]);
    assert!(summary.build_problems.is_empty());
}

#[tokio::test]
async fn test_split_tests_run_in_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path(), "test", &["Tests.csproj"]);
    settings.split_tests = SplitTestsFilterSettings {
        enabled: true,
        exact_match: true,
        chunk_size: 2,
    };
    let (runner, log) = runner(settings);

    let summary = runner.run().await.unwrap();

    // version probe, list-tests probe, two chunks
    assert_eq!(summary.exit_codes.len(), 4);
    assert!(summary.is_success());

    let log = log.contents();
    assert_eq!(log.matches("ran test Tests.csproj").count(), 2);
    // list-tests output is consumed, not logged
    assert!(!log.contains("The following Tests are available:"));
}

#[tokio::test]
async fn test_secrets_are_redacted() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path(), "build", &["a.csproj"]);
    settings.arguments = vec!["-p:ApiKey=hunter2".to_string()];
    settings.secrets = vec!["hunter2".to_string()];
    let (runner, log) = runner(settings);

    runner.run().await.unwrap();

    let log = log.contents();
    assert!(!log.contains("hunter2"));
    assert!(log.contains("-p:ApiKey=*******"));
}

#[tokio::test]
async fn test_interrupted_run_is_aborted() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _log) = runner(settings(dir.path(), "build", &["a.csproj"]));
    runner.cancellation_token().cancel();

    let summary = runner.run().await.unwrap();
    assert!(summary.aborted);
    assert!(summary.exit_codes.is_empty());
}
