//! Shared test utilities for vidpipe integration tests.
//!
//! This module provides:
//! - `FakeService`, an axum stand-in for a stage collaborator
//! - `TestHarness`, an orchestrator wired to three fake services and an
//!   on-disk SQLite store in a temp directory
//! - `ConfigBuilder` for building configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{FakeService, TestHarness};
