//! Resolution engine: merges layered configuration fragments into effective
//! configurations, applies post-merge transforms, and reconciles declared
//! dependency constraints to one version per library.
//!
//! Everything in this crate is a pure function of its inputs.

pub mod conflict;
pub mod merge;
pub mod reconcile;
pub mod target;
pub mod transform;
pub mod version;
