//! Per-task execution state.

use serde::Serialize;
use std::fmt;

use strata_util::errors::StrataError;

/// Lifecycle of a task during one run.
///
/// `Pending -> Ready -> Executing -> Completed | Failed`, and any task not
/// yet finished may become `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Ready,
    Executing,
    Completed,
    Failed,
    Skipped,
}

impl TaskState {
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Ready)
                | (Ready, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Pending | Ready | Executing, Skipped)
        )
    }

    pub fn is_finished(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Skipped)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskState::Pending => "pending",
            TaskState::Ready => "ready",
            TaskState::Executing => "executing",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Skipped => "skipped",
        })
    }
}

/// States of every task in a plan, indexed by plan position.
#[derive(Debug, Clone)]
pub struct StateTable {
    names: Vec<String>,
    states: Vec<TaskState>,
}

impl StateTable {
    pub fn new(names: Vec<String>) -> Self {
        let states = vec![TaskState::Pending; names.len()];
        Self { names, states }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, index: usize) -> TaskState {
        self.states[index]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Move one task to `next`, rejecting transitions the lifecycle forbids.
    pub fn transition(&mut self, index: usize, next: TaskState) -> Result<(), StrataError> {
        let current = self.states[index];
        if !current.can_transition_to(next) {
            return Err(StrataError::Task {
                message: format!(
                    "task `{}` cannot move from {current} to {next}",
                    self.names[index]
                ),
            });
        }
        tracing::trace!("{}: {current} -> {next}", self.names[index]);
        self.states[index] = next;
        Ok(())
    }

    /// Skip every task that has not finished. Returns how many were skipped.
    pub fn skip_unfinished(&mut self) -> usize {
        let mut skipped = 0;
        for state in &mut self.states {
            if !state.is_finished() {
                *state = TaskState::Skipped;
                skipped += 1;
            }
        }
        skipped
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TaskState)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.states.iter().copied())
    }
}
