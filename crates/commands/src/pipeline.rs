//! Command Resolution Pipeline
//!
//! Rewrites a stream of [`DotnetCommand`]s in two ordered stages:
//! 1. TRANSFORMATION - expand or replace commands (e.g. test splitting)
//! 2. FINAL_COMPOSITION - assemble the final argument list
//!
//! Each resolver decides once, against the whole pending stream, whether it
//! applies. Resolvers run in stage order; resolvers in the same stage keep
//! their registration order. Nothing is pulled from the stream while the
//! pipeline is being set up.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::command::{CommandType, DotnetCommand};

// ============================================================================
// Stage
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvingStage {
    Transformation,
    FinalComposition,
}

impl fmt::Display for ResolvingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvingStage::Transformation => write!(f, "transformation"),
            ResolvingStage::FinalComposition => write!(f, "final_composition"),
        }
    }
}

// ============================================================================
// Command Stream
// ============================================================================

type Commands = Box<dyn Iterator<Item = DotnetCommand> + Send>;

/// Lazy stream of commands together with the command kinds it may contain.
///
/// The kinds are known up front so resolvers can decide whether they apply
/// without consuming the stream.
pub struct CommandStream {
    commands: Commands,
    kinds: BTreeSet<CommandType>,
}

impl CommandStream {
    pub fn new<I>(commands: I, kinds: impl IntoIterator<Item = CommandType>) -> Self
    where
        I: IntoIterator<Item = DotnetCommand> + 'static,
        I::IntoIter: Send + 'static,
    {
        Self {
            commands: Box::new(commands.into_iter()),
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Stream over an already known list of commands.
    pub fn from_commands(commands: Vec<DotnetCommand>) -> Self {
        let kinds: Vec<CommandType> = commands.iter().map(|c| c.command_type).collect();
        Self::new(commands, kinds)
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty(), [])
    }

    pub fn contains(&self, kind: CommandType) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = CommandType> + '_ {
        self.kinds.iter().copied()
    }

    /// Rewrite each command one to one.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnMut(DotnetCommand) -> DotnetCommand + Send + 'static,
    {
        Self {
            commands: Box::new(self.commands.map(f)),
            kinds: self.kinds,
        }
    }

    /// Rewrite each command into any number of commands. `added_kinds` names
    /// the command kinds the rewrite may introduce.
    pub fn flat_map<F, I>(self, f: F, added_kinds: impl IntoIterator<Item = CommandType>) -> Self
    where
        F: FnMut(DotnetCommand) -> I + Send + 'static,
        I: IntoIterator<Item = DotnetCommand> + 'static,
        I::IntoIter: Send + 'static,
    {
        let mut kinds = self.kinds;
        kinds.extend(added_kinds);
        Self {
            commands: Box::new(self.commands.flat_map(f)),
            kinds,
        }
    }
}

impl Iterator for CommandStream {
    type Item = DotnetCommand;

    fn next(&mut self) -> Option<Self::Item> {
        self.commands.next()
    }
}

impl fmt::Debug for CommandStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStream")
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Resolver Trait
// ============================================================================

pub trait CommandStreamResolver: Send + Sync {
    fn stage(&self) -> ResolvingStage;

    /// Evaluated once against the whole pending stream.
    fn should_apply(&self, commands: &CommandStream) -> bool;

    fn apply(&self, commands: CommandStream) -> CommandStream;
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct CommandResolutionPipeline {
    resolvers: Vec<Arc<dyn CommandStreamResolver>>,
}

impl CommandResolutionPipeline {
    /// Build a pipeline. Resolvers are ordered by stage; the sort is stable,
    /// so resolvers sharing a stage keep the order given here.
    pub fn new(mut resolvers: Vec<Arc<dyn CommandStreamResolver>>) -> Self {
        resolvers.sort_by_key(|r| r.stage());
        Self { resolvers }
    }

    pub fn resolve(&self, commands: CommandStream) -> CommandStream {
        self.resolvers.iter().fold(commands, |stream, resolver| {
            if resolver.should_apply(&stream) {
                tracing::debug!("[CommandResolutionPipeline] Applying {} resolver", resolver.stage());
                resolver.apply(stream)
            } else {
                stream
            }
        })
    }

    pub fn stages(&self) -> Vec<ResolvingStage> {
        self.resolvers.iter().map(|r| r.stage()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
