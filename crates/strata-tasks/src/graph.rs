//! Task dependency graph and plan ordering.
//!
//! Edges point from a predecessor to the task that runs after it. Ordering is
//! Kahn's algorithm with ties broken by declaration order, so two runs over
//! the same declarations always yield the same plan.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use strata_core::task::TaskNode;
use strata_util::errors::StrataError;

/// Declared tasks and their predecessor edges.
#[derive(Debug)]
pub struct TaskGraph {
    graph: DiGraph<TaskNode, ()>,
    indices: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    /// Build the graph. A later declaration with an existing name replaces the
    /// earlier one in place. Every predecessor must name a declared task.
    pub fn new(tasks: Vec<TaskNode>) -> Result<Self, StrataError> {
        let mut declared: Vec<TaskNode> = Vec::with_capacity(tasks.len());
        for task in tasks {
            match declared.iter_mut().find(|t| t.name == task.name) {
                Some(existing) => {
                    tracing::debug!("task `{}` redeclared; later declaration wins", task.name);
                    *existing = task;
                }
                None => declared.push(task),
            }
        }

        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();
        for task in declared {
            let name = task.name.clone();
            let idx = graph.add_node(task);
            indices.insert(name, idx);
        }

        let mut edges = Vec::new();
        for idx in graph.node_indices() {
            let task = &graph[idx];
            for pred in &task.after {
                let Some(&from) = indices.get(pred) else {
                    return Err(StrataError::Task {
                        message: format!("task `{}` runs after unknown task `{pred}`", task.name),
                    });
                };
                edges.push((from, idx));
            }
        }
        for (from, to) in edges {
            if !graph.contains_edge(from, to) {
                graph.add_edge(from, to, ());
            }
        }

        Ok(Self { graph, indices })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.indices.get(name).map(|&idx| &self.graph[idx])
    }

    /// Task names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].name.as_str())
            .collect()
    }

    /// Every task in topological order, predecessors first.
    pub fn order(&self) -> Result<Vec<&TaskNode>, StrataError> {
        self.order_within(None)
    }

    /// The tasks needed to run `requested`, in topological order: the
    /// requested tasks and everything they transitively run after.
    pub fn subplan(&self, requested: &[String]) -> Result<Vec<&TaskNode>, StrataError> {
        let mut keep = BTreeSet::new();
        let mut stack = Vec::new();
        for name in requested {
            let idx = self.indices.get(name).ok_or_else(|| StrataError::Task {
                message: format!("no task named `{name}`"),
            })?;
            stack.push(*idx);
        }
        while let Some(idx) = stack.pop() {
            if keep.insert(idx.index()) {
                stack.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
            }
        }
        self.order_within(Some(&keep))
    }

    fn order_within(&self, keep: Option<&BTreeSet<usize>>) -> Result<Vec<&TaskNode>, StrataError> {
        let included = |idx: NodeIndex| keep.map_or(true, |k| k.contains(&idx.index()));

        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
        let mut ready = BinaryHeap::new();
        for idx in self.graph.node_indices().filter(|&i| included(i)) {
            let degree = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .filter(|&p| included(p))
                .count();
            if degree == 0 {
                ready.push(Reverse(idx.index()));
            }
            in_degree.insert(idx, degree);
        }

        let mut ordered = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(i)) = ready.pop() {
            let idx = NodeIndex::new(i);
            ordered.push(&self.graph[idx]);
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(next.index()));
                    }
                }
            }
        }

        if ordered.len() < in_degree.len() {
            return Err(StrataError::CyclicDependency {
                cycle: self.find_cycle(),
            });
        }
        Ok(ordered)
    }

    /// Members of the cycle containing the earliest-declared task that is on
    /// one, in declaration order.
    fn find_cycle(&self) -> Vec<String> {
        let mut cycles: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect();
        for scc in &mut cycles {
            scc.sort();
        }
        cycles.sort();
        cycles
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|idx| self.graph[idx].name.clone())
            .collect()
    }
}

/// Order tasks into a plan. Convenience over [`TaskGraph`].
pub fn order(tasks: Vec<TaskNode>) -> Result<Vec<TaskNode>, StrataError> {
    let graph = TaskGraph::new(tasks)?;
    Ok(graph.order()?.into_iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::task::TaskAction;

    fn task(name: &str, after: &[&str]) -> TaskNode {
        TaskNode::new(name, after, TaskAction::Noop)
    }

    fn names(plan: &[TaskNode]) -> Vec<&str> {
        plan.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn clean_compile_package() {
        let plan = order(vec![
            task("package", &["compile"]),
            task("compile", &["clean"]),
            task("clean", &[]),
        ])
        .unwrap();
        assert_eq!(names(&plan), vec!["clean", "compile", "package"]);
    }

    #[test]
    fn ties_follow_declaration_order() {
        let plan = order(vec![
            task("lint", &[]),
            task("docs", &[]),
            task("compile", &[]),
            task("package", &["compile", "lint"]),
        ])
        .unwrap();
        assert_eq!(names(&plan), vec!["lint", "docs", "compile", "package"]);
    }

    #[test]
    fn cycle_reported_with_members() {
        let err = order(vec![
            task("setup", &[]),
            task("a", &["setup", "b"]),
            task("b", &["a"]),
        ])
        .unwrap_err();
        match err {
            StrataError::CyclicDependency { cycle } => assert_eq!(cycle, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_cycle_detected() {
        let err = order(vec![task("a", &["a"])]).unwrap_err();
        assert!(matches!(err, StrataError::CyclicDependency { ref cycle } if cycle == &["a"]));
    }

    #[test]
    fn unknown_predecessor_rejected() {
        let err = order(vec![task("package", &["compile"])]).unwrap_err();
        assert!(err.to_string().contains("unknown task `compile`"));
    }

    #[test]
    fn redeclaration_replaces_in_place() {
        let plan = order(vec![
            task("compile", &[]),
            task("package", &["compile"]),
            task("compile", &["generate"]),
            task("generate", &[]),
        ])
        .unwrap();
        assert_eq!(names(&plan), vec!["generate", "compile", "package"]);
    }

    #[test]
    fn subplan_keeps_only_ancestors() {
        let graph = TaskGraph::new(vec![
            task("clean", &[]),
            task("compile", &[]),
            task("test", &["compile"]),
            task("package", &["compile"]),
        ])
        .unwrap();
        let plan = graph.subplan(&["package".to_string()]).unwrap();
        let names: Vec<&str> = plan.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["compile", "package"]);
        assert!(graph.subplan(&["deploy".to_string()]).is_err());
    }
}
