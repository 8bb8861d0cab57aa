//! Integration Tests Module
//!
//! End-to-end coverage of workflow composition, execution and agent
//! property aggregation.

// Shared fakes and log capture
mod common;

// Composer ordering, tool state lookup and test splitting
mod composition_test;

// Execution adapter visibility and exit-code reporting
mod execution_test;

// Concurrent agent property aggregation
mod properties_test;

// Full runs against a scripted dotnet executable
mod runner_test;
