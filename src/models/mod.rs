//! Data Models
//!
//! Settings and reporting structures shared by the runner services.

pub mod build_problem;
pub mod settings;

pub use build_problem::*;
pub use settings::*;
