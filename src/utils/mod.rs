//! Utilities
//!
//! Common utilities used throughout the runner.

pub mod error;
pub mod paths;

pub use error::*;
pub use paths::*;
