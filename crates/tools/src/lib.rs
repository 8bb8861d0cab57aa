//! Dotnet Workflow Tools
//!
//! Everything needed to find and identify a build tool before it runs:
//!
//! - `tool` - catalogue of known tools and target platforms
//! - `version` - `Version` and the `VersionParser` seam
//! - `resolver` - `ToolResolver` trait and the `dotnet` CLI resolver
//! - `path_resolver` - path-resolution sub-workflow for virtualized contexts
//! - `state` - Tool State Resolver (path discovery and version probing)

pub mod path_resolver;
pub mod resolver;
pub mod state;
pub mod tool;
pub mod version;

pub use path_resolver::{LocatorPathResolver, PathResolverState, PathResolverWorkflowComposer};
pub use resolver::{default_environment_variables, DotnetToolResolver, ToolPath, ToolResolver, DOTNET_EXECUTABLE};
pub use state::{ToolLookupStage, ToolState, ToolStateWorkflowComposer};
pub use tool::{Platform, Tool, ToolBitness, ToolInfo, ToolPlatform, ToolType};
pub use version::{DotnetVersionParser, Version, VersionParser};
