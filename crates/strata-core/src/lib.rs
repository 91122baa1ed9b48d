//! Core data types for the Strata build-configuration resolver.
//!
//! This crate defines the types a resolution pass works on: configuration
//! values and fragments, the fragment store, effective configurations, the
//! `Strata.toml` build definition, the option schema, dependency and task
//! declarations, the offline version registry, and global configuration.
//!
//! This crate is intentionally free of async code and network I/O.

/// File name of the build definition.
pub const MANIFEST_FILE: &str = "Strata.toml";

pub mod config;
pub mod dependency;
pub mod effective;
pub mod fragment;
pub mod layout;
pub mod manifest;
pub mod properties;
pub mod registry;
pub mod schema;
pub mod task;
pub mod value;
