//! Runner Errors
//!
//! Everything the runner binary can fail with. Errors from the workflow
//! crates convert into [`AppError`] keeping their kind.

use dotnet_workflow_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML settings that do not deserialize
    #[error("Settings error: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A process could not be launched or awaited.
    #[error("Command error: {0}")]
    Command(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Build-breaking failure of the current step; never retried
    #[error("Build failure: {0}")]
    RunBuild(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn run_build(msg: impl Into<String>) -> Self {
        Self::RunBuild(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the step has to stop.
    pub fn is_build_breaking(&self) -> bool {
        matches!(self, AppError::RunBuild(_) | AppError::Config(_))
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(err) => AppError::Io(err),
            CoreError::RunBuild(msg) => AppError::RunBuild(msg),
            unknown @ CoreError::UnknownValue { .. } => AppError::Validation(unknown.to_string()),
        }
    }
}
