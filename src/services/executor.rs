//! One-shot Command Execution
//!
//! Runs an invocation to completion and hands back its captured output.
//! Used for quick probes such as `dotnet --version` outside any workflow,
//! where a tool that cannot be started simply means "not available".

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use dotnet_workflow_core::CommandLine;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLineResult {
    pub exit_code: i32,
    pub standard_output: Vec<String>,
    pub error_output: Vec<String>,
}

#[async_trait]
pub trait CommandLineExecutor: Send + Sync {
    /// `None` when the process could not be started or did not finish in time.
    async fn try_execute(&self, command_line: &CommandLine) -> Option<CommandLineResult>;
}

#[derive(Debug, Clone)]
pub struct ProcessCommandLineExecutor {
    timeout: Duration,
}

impl ProcessCommandLineExecutor {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ProcessCommandLineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandLineExecutor for ProcessCommandLineExecutor {
    async fn try_execute(&self, command_line: &CommandLine) -> Option<CommandLineResult> {
        let mut cmd = Command::new(&command_line.executable);
        cmd.args(command_line.argument_values())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !command_line.working_directory.as_os_str().is_empty() {
            cmd.current_dir(&command_line.working_directory);
        }
        for variable in &command_line.environment {
            cmd.env(&variable.name, &variable.value);
        }

        match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Some(CommandLineResult {
                exit_code: output.status.code().unwrap_or(-1),
                standard_output: lines(&output.stdout),
                error_output: lines(&output.stderr),
            }),
            Ok(Err(e)) => {
                tracing::debug!(
                    "[CommandLineExecutor] Cannot start {}: {}",
                    command_line.executable.display(),
                    e
                );
                None
            }
            Err(_) => {
                tracing::debug!(
                    "[CommandLineExecutor] {} timed out after {:?}",
                    command_line.executable.display(),
                    self.timeout
                );
                None
            }
        }
    }
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes).lines().map(str::to_string).collect()
}
