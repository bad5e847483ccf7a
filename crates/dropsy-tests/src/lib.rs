//! Dropsy integration test support
//!
//! Shared fixtures for the cross-crate scenario tests: a scripted in-memory
//! transport and helpers to lay out watched trees with pinned modification times.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Fixtures and the scripted transport
pub mod test_utils;
