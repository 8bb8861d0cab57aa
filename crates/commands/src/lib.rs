//! Dotnet Workflow Commands
//!
//! Build intents and the pipeline that resolves them:
//!
//! - `command` - `CommandType`, `DotnetCommand` and its collaborator traits
//! - `command_set` - selection of the configured command per target group
//! - `pipeline` - `CommandStream` and the staged `CommandResolutionPipeline`
//! - `resolvers` - exact-match test splitting and final argument composition
//! - `split_tests` - test-name sessions used by test splitting

pub mod command;
pub mod command_set;
pub mod pipeline;
pub mod resolvers;

pub use command::{
    CommandArguments, CommandResult, CommandResults, CommandType, DotnetBuildContext, DotnetCommand,
    EnvironmentBuilder, ResultsAnalyzer, StaticArguments, TargetArguments,
};
pub use command_set::DotnetCommandSet;
pub use pipeline::{CommandResolutionPipeline, CommandStream, CommandStreamResolver, ResolvingStage};
pub use resolvers::{ComposedCommandStreamResolver, ExactMatchTestCommandsStreamResolver, ListTestsOutputHandler};
pub use split_tests::{
    InMemoryTestNamesSession, InMemoryTestNamesSessionManager, SplitTestsFilterSettings, TestNamesSaver,
    TestNamesSession, TestNamesSessionManager,
};
