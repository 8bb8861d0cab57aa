//! Workflow Context
//!
//! The shared state of one workflow run:
//!
//! - the result event stream every composer and resolver can subscribe to
//! - the abort signal composers check between emitted invocations
//! - the build working directory
//!
//! Events of a wrapper invocation (a shell running a script) also reach the
//! subscribers of every invocation it wraps, once the wrapper is linked.
//!
//! Composers receive `&Arc<WorkflowContext>` and keep clones inside the lazy
//! workflows they return.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::command_line::{CommandLine, CommandLineId};
use crate::events::{CommandResultEvent, EventObserver, Subject, Subscription};

pub struct WorkflowContext {
    working_directory: PathBuf,
    events: Subject<CommandResultEvent>,
    /// Wrapper id to the ids of the invocations it wraps.
    wrapped: Arc<Mutex<HashMap<CommandLineId, Vec<CommandLineId>>>>,
    abort: CancellationToken,
    abort_reason: Mutex<Option<String>>,
}

impl WorkflowContext {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            events: Subject::new(),
            wrapped: Arc::new(Mutex::new(HashMap::new())),
            abort: CancellationToken::new(),
            abort_reason: Mutex::new(None),
        }
    }

    /// Use an externally owned cancellation token as the abort signal.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.abort = token;
        self
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    // ========================================================================
    // Event stream
    // ========================================================================

    /// Observe every result event of every invocation.
    pub fn subscribe(&self, observer: Arc<EventObserver>) -> Subscription {
        self.events.subscribe(observer)
    }

    /// Observe the events of a single invocation, including events published
    /// under any linked wrapper of it.
    pub fn subscribe_to(&self, command_line_id: CommandLineId, observer: Arc<EventObserver>) -> Subscription {
        let wrapped = self.wrapped.clone();
        self.events.subscribe(Arc::new(move |event: &mut CommandResultEvent| {
            let source = event.command_line_id();
            let concerns = source == command_line_id
                || wrapped
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .get(&source)
                    .is_some_and(|bases| bases.contains(&command_line_id));
            if concerns {
                observer.on_next(event);
            }
        }))
    }

    /// Route events of `wrapper` to the subscribers of each invocation in its
    /// base chain. Plain invocations need no link.
    pub fn link(&self, wrapper: &CommandLine) {
        let bases: Vec<CommandLineId> = wrapper.chain().skip(1).map(CommandLine::id).collect();
        if bases.is_empty() {
            return;
        }
        self.wrapped
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(wrapper.id(), bases);
    }

    /// Observe output text of a single invocation.
    pub fn subscribe_output<F>(&self, command_line_id: CommandLineId, on_output: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.subscribe_to(
            command_line_id,
            Arc::new(move |event: &mut CommandResultEvent| {
                if let Some(text) = event.output() {
                    on_output(text);
                }
            }),
        )
    }

    /// Deliver an event to all subscribers. Called by the execution adapter.
    pub fn publish(&self, event: &mut CommandResultEvent) {
        self.events.publish(event);
    }

    // ========================================================================
    // Abort signal
    // ========================================================================

    /// Stop producing further invocations. Already running processes finish.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!("[WorkflowContext] Abort requested: {}", reason);
        self.abort_reason
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert(reason);
        self.abort.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    pub fn abort_reason(&self) -> Option<String> {
        self.abort_reason
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.abort.clone()
    }
}
