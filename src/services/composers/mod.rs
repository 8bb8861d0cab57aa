//! Workflow Composers
//!
//! Each composer contributes to the plan of one step. Composers run in
//! ascending priority of their target type; every composer receives the
//! workflow built so far and returns the workflow to hand on. Nothing is
//! materialized: the result is a lazy sequence pulled by the executor.

pub mod cmd;
pub mod dotnet;

use std::sync::Arc;

use dotnet_workflow_core::{TargetType, Workflow, WorkflowContext};

use crate::utils::error::AppResult;

pub use cmd::CmdWorkflowComposer;
pub use dotnet::DotnetWorkflowComposer;

pub trait WorkflowComposer: Send + Sync {
    fn target(&self) -> TargetType;

    /// Extend, wrap or pass on `workflow`. Expected absence (nothing to do on
    /// this platform) returns the input untouched; only conditions the step
    /// cannot skip are errors.
    fn compose(&self, context: &Arc<WorkflowContext>, workflow: Workflow) -> AppResult<Workflow>;
}

/// The composers of a step, in the order they run.
pub struct WorkflowComposition {
    composers: Vec<Arc<dyn WorkflowComposer>>,
}

impl WorkflowComposition {
    /// Composers sharing a priority keep the order given here.
    pub fn new(mut composers: Vec<Arc<dyn WorkflowComposer>>) -> Self {
        composers.sort_by_key(|c| c.target().priority());
        Self { composers }
    }

    pub fn targets(&self) -> Vec<TargetType> {
        self.composers.iter().map(|c| c.target()).collect()
    }

    pub fn compose(&self, context: &Arc<WorkflowContext>) -> AppResult<Workflow> {
        self.composers
            .iter()
            .try_fold(Workflow::empty(), |workflow, composer| {
                tracing::debug!("[WorkflowComposition] Composing {:?}", composer.target());
                composer.compose(context, workflow)
            })
    }
}
