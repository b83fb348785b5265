//! Test support module
//!
//! Shared fixtures and helpers for the listing integration tests.

pub mod helpers;

// Re-export rstest fixtures for convenient use in tests
pub mod fixtures;
