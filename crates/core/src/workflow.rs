//! Workflow
//!
//! An ordered, lazily produced sequence of invocations. Pulling the next
//! invocation is what drives composition: a composer that needs the output of
//! an earlier invocation simply computes its next item after that invocation
//! has been executed by the consumer.

use std::fmt;

use crate::command_line::CommandLine;
use crate::events::Subscription;

type CommandLines = Box<dyn Iterator<Item = CommandLine> + Send>;

pub struct Workflow {
    command_lines: CommandLines,
}

impl Workflow {
    pub fn new<I>(command_lines: I) -> Self
    where
        I: IntoIterator<Item = CommandLine>,
        I::IntoIter: Send + 'static,
    {
        Self {
            command_lines: Box::new(command_lines.into_iter()),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Defer building the workflow until its first invocation is requested.
    pub fn deferred<F>(build: F) -> Self
    where
        F: FnOnce() -> Workflow + Send + 'static,
    {
        Self::new(Deferred::Pending(Some(Box::new(build))))
    }

    /// A single invocation whose output is observed through `subscription`.
    ///
    /// The subscription stays alive until the consumer asks for the item after
    /// the invocation, which is after the invocation has been executed.
    pub fn observed(command_line: CommandLine, subscription: Subscription) -> Self {
        Self::new(Observed {
            command_line: Some(command_line),
            subscription: Some(subscription),
        })
    }

    /// This workflow followed by `next`. Neither side is materialized.
    pub fn then(self, next: Workflow) -> Workflow {
        Self::new(self.command_lines.chain(next.command_lines))
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::empty()
    }
}

impl Iterator for Workflow {
    type Item = CommandLine;

    fn next(&mut self) -> Option<Self::Item> {
        self.command_lines.next()
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow").finish_non_exhaustive()
    }
}

enum Deferred {
    Pending(Option<Box<dyn FnOnce() -> Workflow + Send>>),
    Running(Workflow),
}

impl Iterator for Deferred {
    type Item = CommandLine;

    fn next(&mut self) -> Option<Self::Item> {
        if let Deferred::Pending(build) = self {
            let workflow = build.take().map(|b| b()).unwrap_or_default();
            *self = Deferred::Running(workflow);
        }

        match self {
            Deferred::Running(workflow) => workflow.next(),
            Deferred::Pending(_) => None,
        }
    }
}

struct Observed {
    command_line: Option<CommandLine>,
    subscription: Option<Subscription>,
}

impl Iterator for Observed {
    type Item = CommandLine;

    fn next(&mut self) -> Option<Self::Item> {
        match self.command_line.take() {
            Some(command_line) => Some(command_line),
            None => {
                self.subscription.take();
                None
            }
        }
    }
}
