//! Bounded parallel execution of a task plan.
//!
//! A single coordinator owns the state table. Workers run task actions as
//! blocking calls and only hand back their result; a task is dispatched once
//! every predecessor has completed, at most `jobs` at a time. On cancellation
//! running child processes are killed.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use strata_core::task::{TaskAction, TaskNode};
use strata_util::errors::StrataError;
use strata_util::fs::remove_dir_if_exists;
use strata_util::process::CommandBuilder;

use crate::state::{StateTable, TaskState};

/// How often a running child is checked for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Performs the action of one task. Called from a blocking worker thread;
/// long-running actions should stop once `cancel` fires.
pub trait TaskRunner: Send + Sync {
    fn run(&self, task: &TaskNode, cancel: &Cancellation) -> Result<(), StrataError>;
}

/// Runs actions for real: deletes directories and spawns programs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl TaskRunner for ProcessRunner {
    fn run(&self, task: &TaskNode, cancel: &Cancellation) -> Result<(), StrataError> {
        match &task.action {
            TaskAction::Noop => Ok(()),
            TaskAction::Clean { path } => {
                let removed = remove_dir_if_exists(path)?;
                tracing::debug!("{}: removed {} = {removed}", task.name, path.display());
                Ok(())
            }
            TaskAction::Exec { program, args, cwd } => {
                let cmd = CommandBuilder::new(program.clone())
                    .args(args.iter().cloned())
                    .env("STRATA_TASK", &task.name)
                    .cwd(cwd);
                run_child(&task.name, &cmd, cancel)
            }
        }
    }
}

/// Wait for a child to exit, killing it if the build is cancelled first.
fn run_child(task: &str, cmd: &CommandBuilder, cancel: &Cancellation) -> Result<(), StrataError> {
    if cancel.is_cancelled() {
        return Err(cancelled(cmd));
    }
    let mut child = cmd.spawn()?;
    let pipe = child.stderr.take();
    let drain = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    });

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            tracing::debug!("{task}: killing `{}`", cmd.display());
            let _ = child.kill();
            let _ = child.wait();
            // The stderr reader is left to finish on its own; a grandchild
            // may still hold the pipe open.
            return Err(cancelled(cmd));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    if status.success() {
        return Ok(());
    }
    let stderr = drain.join().unwrap_or_default();
    Err(StrataError::Task {
        message: format!("`{}` exited with {}: {}", cmd.display(), status, stderr.trim()),
    })
}

fn cancelled(cmd: &CommandBuilder) -> StrataError {
    StrataError::Task {
        message: format!("`{}` stopped: build cancelled", cmd.display()),
    }
}

/// Requests cancellation of a running build.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Observed by the executor; resolves once cancellation is requested.
#[derive(Debug, Clone)]
pub struct Cancellation(watch::Receiver<bool>);

impl Cancellation {
    pub fn new() -> (CancelHandle, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(Arc::new(tx)), Cancellation(rx))
    }

    /// A cancellation that never fires.
    pub fn never() -> Cancellation {
        Self::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    async fn cancelled(&mut self) {
        while !*self.0.borrow_and_update() {
            if self.0.changed().await.is_err() {
                // Every handle dropped without cancelling.
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Final state of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub name: String,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub elapsed: Option<Duration>,
}

/// What happened to every task of a plan, in plan order.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub tasks: Vec<TaskOutcome>,
    pub cancelled: bool,
}

impl BuildReport {
    pub fn count(&self, state: TaskState) -> usize {
        self.tasks.iter().filter(|t| t.state == state).count()
    }

    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.tasks.iter().find(|t| t.name == name).map(|t| t.state)
    }

    /// True when every task completed.
    pub fn success(&self) -> bool {
        !self.cancelled && self.tasks.iter().all(|t| t.state == TaskState::Completed)
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} failed, {} skipped",
            self.count(TaskState::Completed),
            self.count(TaskState::Failed),
            self.count(TaskState::Skipped)
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Execute `plan`, which must be in topological order and closed under
/// predecessors (as produced by `TaskGraph::order` or `subplan`).
///
/// A failed task skips everything that transitively runs after it; other
/// branches keep going. Cancellation skips every task that has not
/// completed, including the ones in flight.
pub async fn execute(
    plan: &[TaskNode],
    runner: Arc<dyn TaskRunner>,
    jobs: usize,
    cancel: Cancellation,
) -> BuildReport {
    execute_observed(plan, runner, jobs, cancel, |_, _| {}).await
}

/// Like [`execute`], calling `observe` whenever a task completes, fails, or
/// is skipped because a predecessor failed.
pub async fn execute_observed<F>(
    plan: &[TaskNode],
    runner: Arc<dyn TaskRunner>,
    jobs: usize,
    mut cancel: Cancellation,
    mut observe: F,
) -> BuildReport
where
    F: FnMut(&str, TaskState),
{
    let position: HashMap<&str, usize> = plan
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); plan.len()];
    let mut waiting_on: Vec<usize> = vec![0; plan.len()];
    for (i, task) in plan.iter().enumerate() {
        let preds: BTreeSet<usize> = task
            .after
            .iter()
            .filter_map(|p| position.get(p.as_str()).copied())
            .collect();
        waiting_on[i] = preds.len();
        for p in preds {
            dependents[p].push(i);
        }
    }

    let mut table = StateTable::new(plan.iter().map(|t| t.name.clone()).collect());
    let mut errors: Vec<Option<String>> = vec![None; plan.len()];
    let mut elapsed: Vec<Option<Duration>> = vec![None; plan.len()];
    let mut ready: BTreeSet<usize> = BTreeSet::new();
    for i in 0..plan.len() {
        if waiting_on[i] == 0 {
            advance(&mut table, i, TaskState::Ready);
            ready.insert(i);
        }
    }

    let worker_cancel = cancel.clone();
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut join_set: JoinSet<(usize, Result<(), StrataError>, Duration)> = JoinSet::new();
    let mut cancelled = cancel.is_cancelled();

    while !cancelled {
        while let Some(&i) = ready.first() {
            let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                break;
            };
            ready.remove(&i);
            advance(&mut table, i, TaskState::Executing);
            tracing::info!("task `{}` started", plan[i].name);

            let task = plan[i].clone();
            let runner = runner.clone();
            let task_cancel = worker_cancel.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let started = Instant::now();
                let result = tokio::task::spawn_blocking(move || runner.run(&task, &task_cancel))
                    .await
                    .unwrap_or_else(|e| {
                        Err(StrataError::Task {
                            message: format!("worker panicked: {e}"),
                        })
                    });
                (i, result, started.elapsed())
            });
        }

        if join_set.is_empty() {
            break;
        }

        tokio::select! {
            joined = join_set.join_next() => {
                let Some(joined) = joined else { continue };
                let (i, result, took) = match joined {
                    Ok(done) => done,
                    Err(e) => {
                        tracing::warn!("task worker aborted: {e}");
                        continue;
                    }
                };
                elapsed[i] = Some(took);
                match result {
                    Ok(()) => {
                        advance(&mut table, i, TaskState::Completed);
                        tracing::info!("task `{}` completed in {took:.2?}", plan[i].name);
                        observe(&plan[i].name, TaskState::Completed);
                        for &next in &dependents[i] {
                            waiting_on[next] -= 1;
                            if waiting_on[next] == 0 && table.get(next) == TaskState::Pending {
                                advance(&mut table, next, TaskState::Ready);
                                ready.insert(next);
                            }
                        }
                    }
                    Err(e) => {
                        advance(&mut table, i, TaskState::Failed);
                        tracing::info!("task `{}` failed: {e}", plan[i].name);
                        errors[i] = Some(e.to_string());
                        observe(&plan[i].name, TaskState::Failed);
                        for skipped in skip_dependents(&mut table, &dependents, i) {
                            observe(&plan[skipped].name, TaskState::Skipped);
                        }
                    }
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("build cancelled");
                cancelled = true;
            }
        }
    }

    if cancelled {
        join_set.abort_all();
    }
    let skipped = table.skip_unfinished();
    if skipped > 0 {
        tracing::debug!("{skipped} task(s) skipped");
    }

    BuildReport {
        tasks: table
            .iter()
            .enumerate()
            .map(|(i, (name, state))| TaskOutcome {
                name: name.to_string(),
                state,
                error: errors[i].take(),
                elapsed: elapsed[i],
            })
            .collect(),
        cancelled,
    }
}

fn advance(table: &mut StateTable, index: usize, next: TaskState) {
    if let Err(e) = table.transition(index, next) {
        tracing::warn!("{e}");
    }
}

/// Skip everything that transitively runs after `failed`. Returns the
/// skipped plan positions.
fn skip_dependents(table: &mut StateTable, dependents: &[Vec<usize>], failed: usize) -> Vec<usize> {
    let mut skipped = Vec::new();
    let mut stack: Vec<usize> = dependents[failed].clone();
    while let Some(i) = stack.pop() {
        if table.get(i) == TaskState::Pending {
            advance(table, i, TaskState::Skipped);
            tracing::info!("task `{}` skipped", table.name(i));
            skipped.push(i);
            stack.extend(dependents[i].iter().copied());
        }
    }
    skipped.sort_unstable();
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the order tasks ran in and fails the ones it's told to.
    struct FakeRunner {
        fail: Vec<&'static str>,
        ran: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn new(fail: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                fail: fail.to_vec(),
                ran: Mutex::new(Vec::new()),
            })
        }
    }

    impl TaskRunner for FakeRunner {
        fn run(&self, task: &TaskNode, _cancel: &Cancellation) -> Result<(), StrataError> {
            self.ran.lock().unwrap().push(task.name.clone());
            if self.fail.contains(&task.name.as_str()) {
                return Err(StrataError::Task {
                    message: format!("{} broke", task.name),
                });
            }
            Ok(())
        }
    }

    fn task(name: &str, after: &[&str]) -> TaskNode {
        TaskNode::new(name, after, TaskAction::Noop)
    }

    #[tokio::test]
    async fn runs_in_dependency_order() {
        let plan = vec![task("clean", &[]), task("compile", &["clean"]), task("package", &["compile"])];
        let runner = FakeRunner::new(&[]);
        let report = execute(&plan, runner.clone(), 4, Cancellation::never()).await;
        assert!(report.success());
        assert_eq!(*runner.ran.lock().unwrap(), vec!["clean", "compile", "package"]);
        assert_eq!(report.to_string(), "3 completed, 0 failed, 0 skipped");
    }

    #[tokio::test]
    async fn failure_skips_dependents_only() {
        let plan = vec![
            task("clean", &[]),
            task("compile", &[]),
            task("lint", &[]),
            task("package", &["compile"]),
            task("publish", &["package"]),
        ];
        let report = execute(&plan, FakeRunner::new(&["compile"]), 1, Cancellation::never()).await;
        assert!(!report.success());
        assert_eq!(report.state_of("clean"), Some(TaskState::Completed));
        assert_eq!(report.state_of("lint"), Some(TaskState::Completed));
        assert_eq!(report.state_of("compile"), Some(TaskState::Failed));
        assert_eq!(report.state_of("package"), Some(TaskState::Skipped));
        assert_eq!(report.state_of("publish"), Some(TaskState::Skipped));
        assert_eq!(report.tasks[1].error.as_deref(), Some("Task error: compile broke"));
    }

    #[tokio::test]
    async fn observer_sees_every_finished_task() {
        let plan = vec![task("compile", &[]), task("package", &["compile"]), task("lint", &[])];
        let mut seen = Vec::new();
        let report = execute_observed(
            &plan,
            FakeRunner::new(&["compile"]),
            1,
            Cancellation::never(),
            |name, state| seen.push(format!("{name}:{state}")),
        )
        .await;
        assert_eq!(seen, vec!["compile:failed", "package:skipped", "lint:completed"]);
        assert_eq!(report.count(TaskState::Completed), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_skips_everything() {
        let (handle, cancel) = Cancellation::new();
        handle.cancel();
        let plan = vec![task("clean", &[]), task("compile", &["clean"])];
        let runner = FakeRunner::new(&[]);
        let report = execute(&plan, runner.clone(), 2, cancel).await;
        assert!(report.cancelled);
        assert_eq!(report.count(TaskState::Skipped), 2);
        assert!(runner.ran.lock().unwrap().is_empty());
    }

    /// Cancels the build from inside the named task.
    struct CancellingRunner {
        at: &'static str,
        handle: CancelHandle,
    }

    impl TaskRunner for CancellingRunner {
        fn run(&self, task: &TaskNode, _cancel: &Cancellation) -> Result<(), StrataError> {
            if task.name == self.at {
                self.handle.cancel();
                std::thread::sleep(Duration::from_millis(50));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn cancellation_keeps_completed_tasks() {
        let (handle, cancel) = Cancellation::new();
        let plan = vec![task("clean", &[]), task("compile", &["clean"]), task("package", &["compile"])];
        let runner = Arc::new(CancellingRunner { at: "compile", handle });
        let report = execute(&plan, runner, 1, cancel).await;
        assert!(report.cancelled);
        assert_eq!(report.state_of("clean"), Some(TaskState::Completed));
        assert_eq!(report.state_of("compile"), Some(TaskState::Skipped));
        assert_eq!(report.state_of("package"), Some(TaskState::Skipped));
    }

    #[test]
    fn clean_action_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(build.join("app")).unwrap();
        let clean = TaskNode::new("clean", &[], TaskAction::Clean { path: build.clone() });
        ProcessRunner.run(&clean, &Cancellation::never()).unwrap();
        assert!(!build.exists());
        ProcessRunner.run(&clean, &Cancellation::never()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_kills_running_child() {
        let dir = tempfile::tempdir().unwrap();
        let sleeper = TaskNode::new(
            "wait",
            &[],
            TaskAction::Exec {
                program: "sleep".to_string(),
                args: vec!["30".to_string()],
                cwd: dir.path().to_path_buf(),
            },
        );
        let (handle, cancel) = Cancellation::new();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            handle.cancel();
        });

        let started = Instant::now();
        let err = ProcessRunner.run(&sleeper, &cancel).unwrap_err();
        canceller.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn cancelled_before_start_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let touch = TaskNode::new(
            "touch",
            &[],
            TaskAction::Exec {
                program: "touch".to_string(),
                args: vec![marker.display().to_string()],
                cwd: dir.path().to_path_buf(),
            },
        );
        let (handle, cancel) = Cancellation::new();
        handle.cancel();
        assert!(ProcessRunner.run(&touch, &cancel).is_err());
        assert!(!marker.exists());
    }
}
