//! Execution
//!
//! Everything between a resolved [`CommandLine`] and a finished process:
//! the adapter that turns process progress into result events and log
//! lines, the output guard, command presentation and the tokio process
//! runner.
//!
//! [`CommandLine`]: dotnet_workflow_core::CommandLine

pub mod adapter;
pub mod guard;
pub mod presentation;
pub mod process;

pub use adapter::{CommandExecution, CommandExecutionAdapter, LoggingStrategy, TerminationAction};
pub use guard::{MessagesGuard, OutputReplacer, TransparentOutputReplacer};
pub use presentation::{combine_arguments, quote_argument, CommandLinePresentationService};
pub use process::ProcessRunner;
