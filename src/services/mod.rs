//! Services
//!
//! Step execution services: composers build the workflow, the execution
//! adapter and process runner carry it out, analysis turns exit codes into
//! results and build problems.

pub mod analysis;
pub mod composers;
pub mod execution;
pub mod executor;
pub mod logging;
pub mod messages;
pub mod properties;
pub mod runner;
pub mod step;

pub use analysis::{DefaultResultsAnalyzer, DotnetWorkflowAnalyzer, TestFailureTracker, WorkflowAnalyzer};
pub use composers::{CmdWorkflowComposer, DotnetWorkflowComposer, WorkflowComposer, WorkflowComposition};
pub use executor::{CommandLineExecutor, CommandLineResult, ProcessCommandLineExecutor};
pub use logging::{ColorTheme, ConsoleLoggerService, LoggerService};
pub use messages::{ServiceMessage, ServiceMessageSource, ServiceMessagesRegister};
pub use properties::{AgentPropertiesProvider, AgentProperty, PropertiesAggregator};
pub use runner::{RunSummary, WorkflowRunner};
pub use step::{BuildStepContext, RunnerContext};
