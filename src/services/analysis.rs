//! Results Analysis
//!
//! Two levels of judgement:
//!
//! - per command, a [`ResultsAnalyzer`] turns an exit code into a
//!   [`CommandResult`] set
//! - per step, a [`WorkflowAnalyzer`] reports build problems and notices from
//!   those sets
//!
//! Test commands exit with a positive code when some tests failed. When test
//! failures were actually reported, that exit code is `FailedTests` and the
//! step still succeeds because all the tests have run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dotnet_workflow_commands::{CommandResult, CommandResults, CommandType, ResultsAnalyzer};
use dotnet_workflow_core::Subscription;

use crate::models::BuildProblem;
use crate::services::logging::LoggerService;
use crate::services::messages::{ServiceMessage, ServiceMessageSource};

// ============================================================================
// Test Failures
// ============================================================================

/// Counts `testFailed` messages since the last command finished.
#[derive(Debug, Default)]
pub struct TestFailureTracker {
    failures: AtomicUsize,
}

impl TestFailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count failures reported through `source` while the subscription lives.
    pub fn observe(self: &Arc<Self>, source: &ServiceMessageSource) -> Subscription {
        let tracker = self.clone();
        source.subscribe(Arc::new(move |message: &mut ServiceMessage| {
            tracing::debug!(
                "[TestFailureTracker] Test failed: {}",
                message.attribute("name").unwrap_or("<unnamed>")
            );
            tracker.record();
        }))
    }

    pub fn record(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Failures since the previous call.
    pub fn take_failures(&self) -> usize {
        self.failures.swap(0, Ordering::SeqCst)
    }
}

// ============================================================================
// Command Results
// ============================================================================

pub struct DefaultResultsAnalyzer {
    command_type: CommandType,
    fail_build_on_exit_code: bool,
    failed_tests: Option<Arc<TestFailureTracker>>,
}

impl DefaultResultsAnalyzer {
    pub fn new(command_type: CommandType, fail_build_on_exit_code: bool) -> Self {
        Self {
            command_type,
            fail_build_on_exit_code,
            failed_tests: None,
        }
    }

    pub fn with_test_failures(mut self, tracker: Arc<TestFailureTracker>) -> Self {
        self.failed_tests = Some(tracker);
        self
    }
}

impl ResultsAnalyzer for DefaultResultsAnalyzer {
    fn analyze(&self, exit_code: i32, results: &mut CommandResults) {
        let tests_failed = self
            .failed_tests
            .as_ref()
            .is_some_and(|tracker| tracker.take_failures() > 0);

        if exit_code == 0 {
            results.insert(CommandResult::Success);
        } else if exit_code > 0 && tests_failed && self.command_type.is_test() {
            results.insert(CommandResult::FailedTests);
        } else if self.fail_build_on_exit_code {
            results.insert(CommandResult::Fail);
        } else {
            tracing::debug!(
                "[ResultsAnalyzer] Exit code {} of {} ignored by configuration",
                exit_code,
                self.command_type
            );
            results.insert(CommandResult::Success);
        }
    }
}

// ============================================================================
// Workflow Results
// ============================================================================

/// Results of the commands of one step, in completion order.
#[derive(Debug, Default)]
pub struct WorkflowAnalyzerContext {
    results: Mutex<Vec<CommandResults>>,
}

impl WorkflowAnalyzerContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_result(&self, results: CommandResults) {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(results);
    }

    pub fn results(&self) -> Vec<CommandResults> {
        self.results.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

pub trait WorkflowAnalyzer: Send + Sync {
    fn register_result(&self, context: &WorkflowAnalyzerContext, results: &CommandResults, exit_code: i32);

    fn summarize(&self, context: &WorkflowAnalyzerContext);
}

pub struct DotnetWorkflowAnalyzer {
    logger: Arc<dyn LoggerService>,
}

impl DotnetWorkflowAnalyzer {
    pub fn new(logger: Arc<dyn LoggerService>) -> Self {
        Self { logger }
    }
}

impl WorkflowAnalyzer for DotnetWorkflowAnalyzer {
    fn register_result(&self, context: &WorkflowAnalyzerContext, results: &CommandResults, exit_code: i32) {
        if results.contains(&CommandResult::Fail) {
            self.logger.write_build_problem(BuildProblem::exit_code(exit_code));
            return;
        }

        context.add_result(results.clone());
        if results.contains(&CommandResult::FailedTests) {
            self.logger.write_error_output(&format!(
                "Process finished with positive exit code {} (some tests have failed). Reporting step success as all the tests have run.",
                exit_code
            ));
        }
    }

    fn summarize(&self, context: &WorkflowAnalyzerContext) {
        let results = context.results();
        let Some(last) = results.last() else {
            return;
        };

        if !last.contains(&CommandResult::FailedTests)
            && results.iter().any(|r| r.contains(&CommandResult::FailedTests))
        {
            self.logger.write_error_output(
                "Some of processes finished with positive exit code (some tests have failed). Reporting step success as all the tests have run.",
            );
        }
    }
}
