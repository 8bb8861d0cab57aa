//! dotnet-workflow
//!
//! Composes and runs .NET build steps. Configured commands are resolved
//! through a staged pipeline, turned into a lazy workflow of invocations by
//! priority-ordered composers, and executed one at a time with their output
//! routed to the build log and to programmatic observers.
//!
//! - `models` - runner settings and build problems
//! - `services` - composers, execution, analysis, service messages, agent properties
//! - `utils` - error types and paths

pub mod models;
pub mod services;
pub mod utils;

// ── Settings & Models ──────────────────────────────────────────────────
pub use models::{BuildProblem, RunnerSettings};

// ── Services ───────────────────────────────────────────────────────────
pub use services::composers::{WorkflowComposer, WorkflowComposition};
pub use services::properties::PropertiesAggregator;
pub use services::runner::{RunSummary, WorkflowRunner};

// ── Errors ─────────────────────────────────────────────────────────────
pub use utils::error::{AppError, AppResult};
