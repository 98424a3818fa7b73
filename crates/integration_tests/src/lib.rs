//! Integration testing library for the template library.
//!
//! The tests under `tests/` drive [`template_library_core::TemplateLibrary`] end to end against the
//! in-memory document store: the approval scenarios, the invariants that must hold after any
//! sequence of transitions, and transitions racing each other.

pub mod fixtures;
pub mod helpers;

// Re-export commonly used types for convenience
pub use fixtures::{actor, template_request};
pub use helpers::{
    assert_single_active, assert_version_chain, init_test_logging, InterferingStore,
    RecordingSender, TestLibrary,
};
