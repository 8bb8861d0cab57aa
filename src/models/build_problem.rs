//! Build Problems
//!
//! A build problem fails the step. Problems are keyed by identity so the same
//! cause is only ever reported once.

use serde::{Deserialize, Serialize};

pub const EXIT_CODE_PROBLEM_TYPE: &str = "TC_EXIT_CODE";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildProblem {
    pub identity: String,
    pub problem_type: String,
    pub description: String,
}

impl BuildProblem {
    pub fn new(identity: impl Into<String>, problem_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            problem_type: problem_type.into(),
            description: description.into(),
        }
    }

    /// Problem for a process that exited with a failing code.
    pub fn exit_code(code: i32) -> Self {
        Self::new(
            format!("dotnet_exit_code{}", code),
            EXIT_CODE_PROBLEM_TYPE,
            format!("Process exited with code {}", code),
        )
    }
}
