//! Errors
//!
//! Failures the workflow crates cannot skip. A tool that is missing is not
//! one of them: lookups return `None` and the caller decides what that means.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A name (command, operating system) outside the known set.
    #[error("Unknown {kind} \"{value}\"")]
    UnknownValue { kind: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The current step has to stop.
    #[error("Build failure: {0}")]
    RunBuild(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn unknown(kind: &'static str, value: impl AsRef<str>) -> Self {
        Self::UnknownValue {
            kind,
            value: value.as_ref().trim().to_string(),
        }
    }

    pub fn run_build(msg: impl Into<String>) -> Self {
        Self::RunBuild(msg.into())
    }

    pub fn is_build_breaking(&self) -> bool {
        matches!(self, Self::RunBuild(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_value_is_trimmed() {
        let err = CoreError::unknown("command", "  bulid ");
        assert_eq!(err.to_string(), "Unknown command \"bulid\"");
        assert!(!err.is_build_breaking());
    }

    #[test]
    fn test_run_build_breaks_the_step() {
        let err = CoreError::run_build("no session");
        assert_eq!(err.to_string(), "Build failure: no session");
        assert!(err.is_build_breaking());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: CoreError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
