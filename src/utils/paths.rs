//! Cross-Platform Path Utilities
//!
//! Resolves the runner's per-user directories (~/.dotnet-workflow/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the runner directory (~/.dotnet-workflow/)
pub fn runner_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".dotnet-workflow"))
}

/// Get the default settings file path (~/.dotnet-workflow/runner.toml)
pub fn settings_path() -> AppResult<PathBuf> {
    Ok(runner_dir()?.join("runner.toml"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
