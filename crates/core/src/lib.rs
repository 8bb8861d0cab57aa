//! Dotnet Workflow Core
//!
//! Foundational types for composing build-step workflows: the invocation
//! model, lazy workflows, result events with their observer plumbing, and the
//! shared workflow context. This crate has no knowledge of concrete tools or
//! of how processes are launched.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `command_line` - Invocation model (`CommandLine`, `TargetType`, arguments)
//! - `workflow` - Lazy invocation sequences (`Workflow`)
//! - `events` - Result events, observers, subjects and subscriptions
//! - `context` - Per-run shared state (`WorkflowContext`)
//! - `virtual_context` - Path mapping for containerized execution
//! - `once` - Single-assignment slot used by probing composers
//! - `text` - Colored console text fragments

pub mod command_line;
pub mod context;
pub mod error;
pub mod events;
pub mod once;
pub mod text;
pub mod virtual_context;
pub mod workflow;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Invocation Model ───────────────────────────────────────────────────
pub use command_line::{
    ArgumentType, CommandLine, CommandLineArgument, CommandLineId, EnvironmentVariable, TargetType,
};
pub use workflow::Workflow;

// ── Events & Context ───────────────────────────────────────────────────
pub use context::WorkflowContext;
pub use events::{
    empty_observer, CommandResultEvent, EventObserver, Observer, OutputEvent, OutputStream,
    ResultAttribute, Subject, Subscription,
};

// ── Environment ────────────────────────────────────────────────────────
pub use virtual_context::{ContainerContext, HostContext, OsType, VirtualContext};

// ── Utilities ──────────────────────────────────────────────────────────
pub use once::OnceSlot;
pub use text::{plain_text, Color, StdOutText};
