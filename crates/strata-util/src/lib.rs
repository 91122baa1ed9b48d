//! Shared utilities for the Strata build-configuration resolver.
//!
//! This crate provides cross-cutting concerns used by all other Strata crates:
//! the error taxonomy, filesystem helpers, process spawning for task actions,
//! and terminal status output.

pub mod errors;
pub mod fs;
pub mod process;
pub mod progress;
