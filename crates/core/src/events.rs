//! Result Events and Observers
//!
//! The execution adapter is the only producer of [`CommandResultEvent`]s.
//! Events are delivered to subscribers of a [`Subject`] one at a time and in
//! emission order; each subscriber gets mutable access so it can attach
//! attributes (such as [`ResultAttribute::Suppressed`]) that the producer
//! inspects once every subscriber has seen the event.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::command_line::CommandLineId;

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultAttribute {
    /// Keep the line out of the human-facing log.
    Suppressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    pub text: String,
    pub stream: OutputStream,
    pub attributes: HashSet<ResultAttribute>,
    pub command_line_id: CommandLineId,
}

impl OutputEvent {
    pub fn new(text: impl Into<String>, stream: OutputStream, command_line_id: CommandLineId) -> Self {
        Self {
            text: text.into(),
            stream,
            attributes: HashSet::new(),
            command_line_id,
        }
    }

    pub fn suppress(&mut self) {
        self.attributes.insert(ResultAttribute::Suppressed);
    }

    pub fn is_suppressed(&self) -> bool {
        self.attributes.contains(&ResultAttribute::Suppressed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResultEvent {
    Output(OutputEvent),
    ExitCode {
        code: i32,
        command_line_id: CommandLineId,
    },
}

impl CommandResultEvent {
    pub fn command_line_id(&self) -> CommandLineId {
        match self {
            CommandResultEvent::Output(output) => output.command_line_id,
            CommandResultEvent::ExitCode { command_line_id, .. } => *command_line_id,
        }
    }

    /// Output text, if this is an output event.
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandResultEvent::Output(output) => Some(&output.text),
            CommandResultEvent::ExitCode { .. } => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandResultEvent::ExitCode { code, .. } => Some(*code),
            CommandResultEvent::Output(_) => None,
        }
    }
}

// ============================================================================
// Observer
// ============================================================================

/// Receives values pushed by a producer. Implementations may be called from
/// the thread that delivers process output, so they must not block.
pub trait Observer<T>: Send + Sync {
    fn on_next(&self, value: &mut T);
}

impl<T, F> Observer<T> for F
where
    F: Fn(&mut T) + Send + Sync,
{
    fn on_next(&self, value: &mut T) {
        self(value)
    }
}

pub type EventObserver = dyn Observer<CommandResultEvent>;

/// Observer that ignores everything.
pub fn empty_observer<T: 'static>() -> Arc<dyn Observer<T>> {
    Arc::new(|_: &mut T| {})
}

// ============================================================================
// Subject
// ============================================================================

struct SubjectInner<T> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, Arc<dyn Observer<T>>)>>,
}

/// Multicast source. Cloning shares the same subscriber list.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T: 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                next_id: AtomicU64::new(0),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register an observer until the returned subscription is dropped.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, observer));

        let weak: Weak<SubjectInner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .observers
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .retain(|(observer_id, _)| *observer_id != id);
                }
            })),
        }
    }

    /// Deliver a value to every current subscriber, in subscription order.
    ///
    /// The subscriber list is snapshotted first, so an observer may subscribe
    /// or unsubscribe while being notified. A panicking observer is logged and
    /// skipped; the remaining observers still run.
    pub fn publish(&self, value: &mut T) {
        let observers: Vec<Arc<dyn Observer<T>>> = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, o)| o.clone())
            .collect();

        for observer in observers {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| observer.on_next(value)));
            if delivered.is_err() {
                tracing::debug!("[Subject] Observer panicked while handling a value; skipping it");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl<T: 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Keeps an observer registered. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self { unsubscribe: None }
    }

    /// Run `action` when this subscription is dropped.
    pub fn on_drop(action: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(action)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
