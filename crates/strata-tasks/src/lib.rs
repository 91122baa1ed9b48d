//! Task planning and execution.
//!
//! Tasks come from two places: explicit `tasks` declarations in the effective
//! configuration, and tasks implied by the `plugins` option. They are ordered
//! into a plan by [`graph::TaskGraph`] and optionally run by
//! [`executor::execute`] on a bounded worker pool.

pub mod executor;
pub mod graph;
pub mod plugins;
pub mod state;
