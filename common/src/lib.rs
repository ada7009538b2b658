pub mod config;

/// Common utilities shared across the Sentra project
///
/// This crate provides shared functionality that can be used across different
/// modules of the Sentra fraud scoring service, including:
///
/// - Configuration loading
/// - Shared test utilities and helpers

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{TestError, TestResult};
