//! Process Runner
//!
//! Launches an invocation with tokio and feeds its output, line by line and
//! in arrival order, into a [`CommandExecution`]. On cancellation the whole
//! process tree is terminated: on Unix the child leads its own process group,
//! which is killed as a unit; on Windows `taskkill /T` walks the tree.

use std::process::Stdio;

use dotnet_workflow_core::CommandLine;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::services::execution::adapter::{CommandExecution, TerminationAction};
use crate::utils::error::{AppError, AppResult};

/// Build the OS command for an invocation.
pub fn build_command(command_line: &CommandLine) -> Command {
    let mut command = Command::new(&command_line.executable);
    command.args(command_line.argument_values());
    command.envs(
        command_line
            .environment
            .iter()
            .map(|variable| (variable.name.as_str(), variable.value.as_str())),
    );
    if !command_line.working_directory.as_os_str().is_empty() {
        command.current_dir(&command_line.working_directory);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    #[cfg(unix)]
    command.process_group(0);

    command
}

/// Owns a spawned child; an abandoned run never leaves it behind.
struct RunningProcess {
    child: Child,
}

impl RunningProcess {
    fn terminate(&mut self, action: TerminationAction) {
        let Some(pid) = self.child.id() else {
            return;
        };

        if action == TerminationAction::KillProcessTree {
            kill_process_tree(pid);
        }
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("[ProcessRunner] Failed to kill process {}: {}", pid, e);
        }
    }
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.terminate(TerminationAction::KillProcessTree);
        }
    }
}

#[cfg(unix)]
fn kill_process_tree(pid: u32) {
    let Ok(group) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child.
    let result = unsafe { libc::killpg(group, libc::SIGKILL) };
    if result != 0 {
        tracing::debug!(
            "[ProcessRunner] killpg({}) failed: {}",
            group,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(windows)]
fn kill_process_tree(pid: u32) {
    let result = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        tracing::debug!("[ProcessRunner] taskkill for {} failed: {}", pid, e);
    }
}

#[cfg(not(any(unix, windows)))]
fn kill_process_tree(_pid: u32) {}

/// Exit code reported for a process killed by a signal or never started.
pub const NO_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run the invocation to completion and return its exit code. A process
    /// killed by a signal, or one that cannot be started, reports
    /// [`NO_EXIT_CODE`].
    pub async fn run(&self, execution: &mut CommandExecution, cancellation: &CancellationToken) -> AppResult<i32> {
        let command_line = execution.command_line().clone();
        let mut command = build_command(&command_line);

        execution.process_started();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(
                    "[ProcessRunner] Cannot start {}: {}",
                    command_line.executable.display(),
                    e
                );
                execution.process_failed_to_start(&e, NO_EXIT_CODE);
                return Ok(NO_EXIT_CODE);
            }
        };
        tracing::debug!(
            "[ProcessRunner] Started {} (pid {:?})",
            command_line.executable.display(),
            child.id()
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::internal("Process stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::internal("Process stderr was not captured"))?;
        let mut process = RunningProcess { child };

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut interrupted = false;

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => execution.on_standard_output(&line),
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        tracing::debug!("[ProcessRunner] stdout closed: {}", e);
                        stdout_open = false;
                    }
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => execution.on_error_output(&line),
                    Ok(None) => stderr_open = false,
                    Err(e) => {
                        tracing::debug!("[ProcessRunner] stderr closed: {}", e);
                        stderr_open = false;
                    }
                },
                _ = cancellation.cancelled(), if !interrupted => {
                    interrupted = true;
                    tracing::info!(
                        "[ProcessRunner] Interrupt requested, terminating {}",
                        command_line.executable.display()
                    );
                    process.terminate(execution.interrupt_requested());
                }
            }
        }

        let status = process
            .child
            .wait()
            .await
            .map_err(|e| AppError::command(format!("Failed to wait for process: {}", e)))?;
        let exit_code = status.code().unwrap_or(NO_EXIT_CODE);
        execution.process_finished(exit_code);
        Ok(exit_code)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use dotnet_workflow_core::{CommandLineArgument, EnvironmentVariable, TargetType};

    fn shell(script: &str) -> CommandLine {
        CommandLine::new(TargetType::Tool, "sh", std::env::temp_dir())
            .with_arguments(vec![CommandLineArgument::new("-c"), CommandLineArgument::new(script)])
    }

    #[test]
    fn test_build_command_carries_arguments_and_environment() {
        let command_line = shell("echo $X").with_environment(vec![EnvironmentVariable::new("X", "1")]);
        let command = build_command(&command_line);
        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "sh");
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(args, vec!["-c", "echo $X"]);
        let envs: Vec<_> = std_command.get_envs().collect();
        assert_eq!(envs.len(), 1);
    }
}
