//! Operation: compute the ordered task plan of a target.

use strata_core::task::TaskNode;
use strata_tasks::graph::TaskGraph;
use strata_tasks::plugins::collect_tasks;

use crate::{ProjectContext, TargetSelection};

/// The plan for the selected target: every task, or only what `requested`
/// needs when it is non-empty.
pub fn plan(
    ctx: &ProjectContext,
    selection: &TargetSelection,
    requested: &[String],
) -> miette::Result<Vec<TaskNode>> {
    let (_, config) = ctx.resolve(selection)?;
    let graph = TaskGraph::new(collect_tasks(&config, &ctx.layout)?)?;
    let ordered = if requested.is_empty() {
        graph.order()?
    } else {
        graph.subplan(requested)?
    };
    Ok(ordered.into_iter().cloned().collect())
}

/// Numbered plan lines: `1. compile (after clean): noop`.
pub fn render(plan: &[TaskNode]) -> String {
    let mut out = String::new();
    for (i, task) in plan.iter().enumerate() {
        let after = if task.after.is_empty() {
            String::new()
        } else {
            format!(" (after {})", task.after.join(", "))
        };
        out.push_str(&format!("{:>3}. {}{after}: {}\n", i + 1, task.name, task.action));
    }
    out
}
