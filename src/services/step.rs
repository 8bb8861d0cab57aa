//! Build Step Context
//!
//! Holds the runner session of the step being executed. Composers read the
//! step configuration through it; asking before the session has started is
//! a build-breaking error.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::models::RunnerSettings;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct RunnerContext {
    pub settings: RunnerSettings,
    pub working_directory: PathBuf,
}

impl RunnerContext {
    pub fn new(settings: RunnerSettings, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            working_directory: working_directory.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildStepContext {
    runner: RwLock<Option<Arc<RunnerContext>>>,
}

impl BuildStepContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_session(&self, context: RunnerContext) -> Arc<RunnerContext> {
        let context = Arc::new(context);
        tracing::debug!(
            "[BuildStepContext] Runner session started in {}",
            context.working_directory.display()
        );
        *self.runner.write().unwrap_or_else(|e| e.into_inner()) = Some(context.clone());
        context
    }

    pub fn finish_session(&self) {
        self.runner.write().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub fn is_available(&self) -> bool {
        self.runner.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    pub fn runner_context(&self) -> AppResult<Arc<RunnerContext>> {
        self.runner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| AppError::run_build("Runner session was not started"))
    }
}
