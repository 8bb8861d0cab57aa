//! Command stream resolvers.

pub mod composed;
pub mod exact_match;

pub use composed::ComposedCommandStreamResolver;
pub use exact_match::{ExactMatchTestCommandsStreamResolver, ListTestsOutputHandler, TESTS_LIST_OUTPUT_MARKER};
