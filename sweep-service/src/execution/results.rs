// Run Results
// Per-task outcomes and the aggregated sweep summary

use crate::error::TaskError;
use crate::grid::RunTask;
use crate::paths::ResolvedPaths;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Outcome of a single task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The program exited successfully and its artifact is in place
    Succeeded,
    /// Path resolution or invocation failed
    Failed,
    /// The artifact already existed and the task was not re-run
    Skipped,
    /// The sweep was stopped before the task started
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Skipped => write!(f, "skipped"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of one task, with the originating task retained for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub task: RunTask,
    pub status: RunStatus,
    /// Resolved paths (absent when resolution failed)
    pub paths: Option<ResolvedPaths>,
    pub error: Option<TaskError>,
    pub exit_code: Option<i32>,
    /// Invocation attempts made (0 when the program never ran)
    pub attempts: u32,
    pub duration: Duration,
    /// Trailing stderr of the last attempt
    pub stderr: String,
}

impl RunResult {
    fn new(task: RunTask, status: RunStatus, paths: Option<ResolvedPaths>) -> Self {
        Self {
            task,
            status,
            paths,
            error: None,
            exit_code: None,
            attempts: 0,
            duration: Duration::ZERO,
            stderr: String::new(),
        }
    }

    pub fn succeeded(task: RunTask, paths: ResolvedPaths) -> Self {
        let mut result = Self::new(task, RunStatus::Succeeded, Some(paths));
        result.exit_code = Some(0);
        result
    }

    pub fn failed(task: RunTask, paths: Option<ResolvedPaths>, error: impl Into<TaskError>) -> Self {
        let error = error.into();
        let mut result = Self::new(task, RunStatus::Failed, paths);
        if let TaskError::Invocation(e) = &error {
            result.exit_code = e.exit_code();
        }
        result.error = Some(error);
        result
    }

    pub fn skipped(task: RunTask, paths: ResolvedPaths) -> Self {
        Self::new(task, RunStatus::Skipped, Some(paths))
    }

    pub fn cancelled(task: RunTask, paths: Option<ResolvedPaths>) -> Self {
        Self::new(task, RunStatus::Cancelled, paths)
    }

    pub fn with_timing(mut self, attempts: u32, duration: Duration) -> Self {
        self.attempts = attempts;
        self.duration = duration;
        self
    }

    pub fn with_stderr(mut self, stderr: String) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    pub fn is_failure(&self) -> bool {
        self.status == RunStatus::Failed
    }
}

/// All results of a sweep, in enumeration order
#[derive(Debug, Clone)]
pub struct SweepSummary {
    pub sweep_name: String,
    pub results: Vec<RunResult>,
    pub duration: Duration,
}

impl SweepSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(RunStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(RunStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(RunStatus::Skipped)
    }

    pub fn cancelled(&self) -> usize {
        self.count(RunStatus::Cancelled)
    }

    fn count(&self, status: RunStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Failed results, in enumeration order
    pub fn failures(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    /// True when nothing failed and nothing was cancelled
    pub fn success(&self) -> bool {
        self.results
            .iter()
            .all(|r| matches!(r.status, RunStatus::Succeeded | RunStatus::Skipped))
    }
}
