// Sweep Executor
// Drives every (group, index) task through path resolution and invocation,
// isolating failures so one bad configuration never halts the sweep

use crate::error::{ConfigurationError, InvocationError, PathError};
use crate::execution::events::{EventSender, ProgressSender, SweepEvent};
use crate::execution::results::{RunResult, SweepSummary};
use crate::grid::{IndexRange, RunTask, SweepGrid, SweepGroup};
use crate::paths::{PathResolver, ResolvedPaths};
use crate::runners::{InvocationRequest, Invoker};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for sweep execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum concurrent invocations (1 = sequential)
    pub max_parallel: usize,
    /// Additional attempts after a failed invocation
    pub retries: u32,
    /// Skip tasks whose artifact already exists
    pub only_missing: bool,
    /// Write through a staging file and move it into place on success
    pub atomic_output: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: 1,
            retries: 0,
            only_missing: false,
            atomic_output: true,
        }
    }
}

/// Restricts a sweep to a subset of the grid for targeted re-runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Group directory names to keep (empty = all)
    pub groups: Vec<String>,
    /// Index sub-range to keep (None = all)
    pub indices: Option<IndexRange>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.indices.is_none()
    }

    /// Reject filters that reach outside the declared grid
    pub fn validate(&self, grid: &SweepGrid) -> Result<(), ConfigurationError> {
        for name in &self.groups {
            if grid.group(name).is_none() {
                return Err(ConfigurationError::UnknownGroupFilter(name.clone()));
            }
        }
        if let Some(range) = &self.indices {
            range.validate()?;
            if !grid.indices.covers(range) {
                return Err(ConfigurationError::IndexFilterOutOfRange {
                    start: range.start,
                    end: range.end,
                    declared_start: grid.indices.start,
                    declared_end: grid.indices.end,
                });
            }
        }
        Ok(())
    }

    pub fn matches(&self, task: &RunTask) -> bool {
        let group_ok = self.groups.is_empty() || self.groups.iter().any(|g| *g == task.group.dir);
        let index_ok = self.indices.map_or(true, |r| r.contains(task.index));
        group_ok && index_ok
    }
}

/// A task in scope, with its paths, before anything runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub task: RunTask,
    pub paths: ResolvedPaths,
}

/// Sweep orchestrator
pub struct SweepExecutor {
    /// Sweep name used in events and logs
    name: String,
    /// Path resolver bound to the declared grid
    resolver: PathResolver,
    /// Evaluation program invoker
    invoker: Arc<dyn Invoker>,
    /// Configuration
    config: ExecutorConfig,
    /// Scope restriction
    filter: TaskFilter,
    /// Progress event sender
    event_tx: Option<ProgressSender>,
    /// Raised to stop launching new tasks
    cancel: Option<watch::Receiver<bool>>,
}

impl SweepExecutor {
    /// Create a new executor with default configuration
    pub fn new(name: impl Into<String>, resolver: PathResolver, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            name: name.into(),
            resolver,
            invoker,
            config: ExecutorConfig::default(),
            filter: TaskFilter::default(),
            event_tx: None,
            cancel: None,
        }
    }

    /// Set executor configuration
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Restrict the sweep to a subset of tasks
    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Stop launching tasks once the signal turns true
    pub fn with_cancellation(mut self, rx: watch::Receiver<bool>) -> Self {
        self.cancel = Some(rx);
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.config.max_parallel == 0 {
            return Err(ConfigurationError::ZeroParallelism);
        }
        let grid = self.resolver.grid();
        grid.indices.validate()?;
        self.filter.validate(grid)
    }

    /// Ordered tasks in scope, without running anything
    pub fn plan(&self) -> Result<Vec<PlannedTask>, ConfigurationError> {
        self.validate()?;
        let layout = self.resolver.layout();
        Ok(self
            .resolver
            .grid()
            .tasks()
            .into_iter()
            .filter(|task| self.filter.matches(task))
            .map(|task| {
                let paths = layout.paths(&task.group, task.index);
                PlannedTask { task, paths }
            })
            .collect())
    }

    /// Run every task in scope.
    ///
    /// Only configuration problems return `Err`, and they do so before any
    /// process is launched. Task-level failures are recorded in the summary,
    /// whose results follow enumeration order regardless of completion order.
    pub async fn execute(&self) -> Result<SweepSummary, ConfigurationError> {
        let planned = self.plan()?;
        let start = Instant::now();
        let total = planned.len();
        let groups = groups_in_scope(&planned);

        self.event_tx.send_event(SweepEvent::sweep_started(
            &self.name,
            groups.len(),
            total,
        ));
        info!(sweep = %self.name, groups = groups.len(), tasks = total, "starting sweep");

        let unprepared = self.prepare_groups(&groups);

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel));
        let mut slots: Vec<Option<RunResult>> = vec![None; total];
        let mut handles: Vec<(usize, RunTask, JoinHandle<RunResult>)> = Vec::new();
        let mut cancel_announced = false;

        for (position, PlannedTask { task, .. }) in planned.into_iter().enumerate() {
            if self.is_cancelled() {
                self.announce_cancellation(&mut cancel_announced);
                slots[position] = Some(self.record_cancelled(task, None, position));
                continue;
            }

            if let Some(error) = unprepared.get(&task.group.dir) {
                let result = RunResult::failed(task, None, error.clone());
                slots[position] = Some(self.record_finished(result, position, total));
                continue;
            }

            let paths = match self.resolver.resolve(&task.group, task.index) {
                Ok(paths) => paths,
                Err(error) => {
                    let result = RunResult::failed(task, None, error);
                    slots[position] = Some(self.record_finished(result, position, total));
                    continue;
                }
            };

            if self.config.only_missing && is_file(&paths.output).await {
                debug!(task = %task, "artifact present, skipping");
                self.event_tx.send_event(SweepEvent::task_skipped(
                    task.clone(),
                    position,
                    "artifact already present",
                ));
                slots[position] = Some(RunResult::skipped(task, paths));
                continue;
            }

            // Permits are taken in enumeration order, so launches stay ordered
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                slots[position] = Some(self.record_cancelled(task, Some(paths), position));
                continue;
            };
            if self.is_cancelled() {
                drop(permit);
                self.announce_cancellation(&mut cancel_announced);
                slots[position] = Some(self.record_cancelled(task, Some(paths), position));
                continue;
            }

            info!(task = %task, position = position + 1, total, "launching task");
            self.event_tx
                .send_event(SweepEvent::task_started(task.clone(), position, total, 1));

            let worker = TaskWorker {
                invoker: self.invoker.clone(),
                config: self.config.clone(),
                event_tx: self.event_tx.clone(),
            };
            let worker_task = task.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                worker.run(worker_task, paths, position, total).await
            });
            handles.push((position, task, handle));
        }

        for (position, task, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(task = %task, error = %e, "task worker aborted");
                    self.event_tx
                        .send_event(SweepEvent::error(format!("{} worker aborted: {}", task, e)));
                    let result = RunResult::failed(
                        task,
                        None,
                        InvocationError::Spawn {
                            program: "task worker".to_string(),
                            message: e.to_string(),
                        },
                    );
                    self.record_finished(result, position, total)
                }
            };
            slots[position] = Some(result);
        }

        let summary = SweepSummary {
            sweep_name: self.name.clone(),
            results: slots.into_iter().flatten().collect(),
            duration: start.elapsed(),
        };

        info!(
            sweep = %self.name,
            total = summary.total(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            cancelled = summary.cancelled(),
            "sweep finished"
        );
        self.event_tx.send_event(SweepEvent::sweep_completed(&summary));

        Ok(summary)
    }

    /// Create every output directory before the first invocation.
    ///
    /// Groups whose directory cannot be created are returned with their
    /// error; their tasks fail without running.
    fn prepare_groups(&self, groups: &[SweepGroup]) -> HashMap<String, PathError> {
        let mut unprepared = HashMap::new();

        for group in groups {
            match self.resolver.prepare_group(group) {
                Ok(output_dir) => {
                    debug!(group = %group, dir = %output_dir.display(), "output directory ready");
                    self.event_tx.send_event(SweepEvent::GroupPrepared {
                        group: group.dir.clone(),
                        output_dir,
                    });
                }
                Err(error) => {
                    warn!(group = %group, error = %error, "cannot prepare output directory");
                    self.event_tx.send_event(SweepEvent::GroupFailed {
                        group: group.dir.clone(),
                        error: error.to_string(),
                    });
                    unprepared.insert(group.dir.clone(), error);
                }
            }
        }

        unprepared
    }

    fn announce_cancellation(&self, announced: &mut bool) {
        if !*announced {
            *announced = true;
            info!(sweep = %self.name, "sweep cancelled");
            self.event_tx.send_event(SweepEvent::info(
                "sweep cancelled, remaining tasks will not start",
            ));
        }
    }

    fn record_finished(&self, result: RunResult, position: usize, total: usize) -> RunResult {
        if let Some(error) = &result.error {
            warn!(task = %result.task, error = %error, "task failed");
        }
        self.event_tx
            .send_event(SweepEvent::task_completed(result.clone(), position, total));
        result
    }

    fn record_cancelled(
        &self,
        task: RunTask,
        paths: Option<ResolvedPaths>,
        position: usize,
    ) -> RunResult {
        self.event_tx
            .send_event(SweepEvent::task_skipped(task.clone(), position, "sweep cancelled"));
        RunResult::cancelled(task, paths)
    }
}

/// Distinct groups of the planned tasks, in order of first appearance
fn groups_in_scope(planned: &[PlannedTask]) -> Vec<SweepGroup> {
    let mut groups: Vec<SweepGroup> = Vec::new();
    for planned_task in planned {
        if groups.last() != Some(&planned_task.task.group) {
            groups.push(planned_task.task.group.clone());
        }
    }
    groups
}

/// Runs one task to completion on a worker
struct TaskWorker {
    invoker: Arc<dyn Invoker>,
    config: ExecutorConfig,
    event_tx: Option<ProgressSender>,
}

impl TaskWorker {
    async fn run(
        self,
        task: RunTask,
        paths: ResolvedPaths,
        position: usize,
        total: usize,
    ) -> RunResult {
        let start = Instant::now();
        let max_attempts = self.config.retries + 1;
        let mut attempt = 0;

        let result = loop {
            attempt += 1;
            if attempt > 1 {
                self.event_tx.send_event(SweepEvent::task_started(
                    task.clone(),
                    position,
                    total,
                    attempt,
                ));
            }

            let (outcome, stderr) = self.attempt(&task, &paths).await;
            match outcome {
                Ok(()) => {
                    break RunResult::succeeded(task.clone(), paths.clone()).with_stderr(stderr)
                }
                Err(error) if attempt < max_attempts => {
                    warn!(task = %task, attempt, error = %error, "invocation failed, retrying");
                    self.event_tx.send_event(SweepEvent::warning(format!(
                        "{} attempt {}/{} failed: {}",
                        task, attempt, max_attempts, error
                    )));
                }
                Err(error) => {
                    break RunResult::failed(task.clone(), Some(paths.clone()), error)
                        .with_stderr(stderr)
                }
            }
        };

        let result = result.with_timing(attempt, start.elapsed());
        match &result.error {
            None => info!(task = %task, attempts = attempt, "task succeeded"),
            Some(error) => warn!(task = %task, attempts = attempt, error = %error, "task failed"),
        }
        self.event_tx
            .send_event(SweepEvent::task_completed(result.clone(), position, total));
        result
    }

    /// One invocation, including moving the artifact into place
    async fn attempt(
        &self,
        task: &RunTask,
        paths: &ResolvedPaths,
    ) -> (Result<(), InvocationError>, String) {
        let atomic = self.config.atomic_output;
        let destination = if atomic {
            paths.staging()
        } else {
            paths.output.clone()
        };
        if atomic {
            // Leftover from an interrupted earlier run
            let _ = fs::remove_file(&destination).await;
        }

        let request = InvocationRequest {
            input: paths.input.clone(),
            output: destination.clone(),
            group: task.group.dir.clone(),
            mode: task.group.mode.clone(),
            index: task.index,
        };
        let output = self.invoker.invoke(&request).await;

        if let Some(error) = output.error {
            if atomic {
                let _ = fs::remove_file(&destination).await;
            }
            return (Err(error), output.stderr);
        }

        let finalized = if atomic {
            finalize(&destination, &paths.output).await
        } else if is_file(&paths.output).await {
            Ok(())
        } else {
            Err(InvocationError::MissingOutput(paths.output.clone()))
        };
        (finalized, output.stderr)
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

/// Move a staged artifact over the final path
async fn finalize(staging: &Path, output: &Path) -> Result<(), InvocationError> {
    if !is_file(staging).await {
        return Err(InvocationError::MissingOutput(output.to_path_buf()));
    }
    if let Err(e) = fs::rename(staging, output).await {
        let _ = fs::remove_file(staging).await;
        return Err(InvocationError::Finalize {
            path: output.to_path_buf(),
            message: e.to_string(),
        });
    }
    Ok(())
}
