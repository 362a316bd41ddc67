// Sweep Events
// Progress reporting and event types for sweep execution

use crate::execution::results::{RunResult, SweepSummary};
use crate::grid::RunTask;

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for sweep progress events
pub type ProgressSender = mpsc::UnboundedSender<SweepEvent>;

/// Receiver for sweep progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<SweepEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted during a sweep
#[derive(Debug, Clone)]
pub enum SweepEvent {
    /// Sweep started; counts cover the tasks in scope
    SweepStarted {
        sweep_name: String,
        total_groups: usize,
        total_tasks: usize,
    },

    /// A group's output directory is ready
    GroupPrepared { group: String, output_dir: PathBuf },

    /// A group's output directory could not be created
    GroupFailed { group: String, error: String },

    /// An invocation is about to be launched
    TaskStarted {
        task: RunTask,
        position: usize,
        total: usize,
        attempt: u32,
    },

    /// A task finished (any status other than skipped/cancelled)
    TaskCompleted {
        result: Box<RunResult>,
        position: usize,
        total: usize,
    },

    /// A task was not run
    TaskSkipped {
        task: RunTask,
        position: usize,
        reason: String,
    },

    /// Sweep finished
    SweepCompleted {
        sweep_name: String,
        success: bool,
        total: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        cancelled: usize,
        duration: Duration,
    },

    /// Log message (info, warning, error)
    Log { level: LogLevel, message: String },
}

/// Log level for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl SweepEvent {
    /// Create a sweep started event
    pub fn sweep_started(name: impl Into<String>, total_groups: usize, total_tasks: usize) -> Self {
        Self::SweepStarted {
            sweep_name: name.into(),
            total_groups,
            total_tasks,
        }
    }

    /// Create a sweep completed event from the final summary
    pub fn sweep_completed(summary: &SweepSummary) -> Self {
        Self::SweepCompleted {
            sweep_name: summary.sweep_name.clone(),
            success: summary.success(),
            total: summary.total(),
            succeeded: summary.succeeded(),
            failed: summary.failed(),
            skipped: summary.skipped(),
            cancelled: summary.cancelled(),
            duration: summary.duration,
        }
    }

    /// Create a task started event
    pub fn task_started(task: RunTask, position: usize, total: usize, attempt: u32) -> Self {
        Self::TaskStarted {
            task,
            position,
            total,
            attempt,
        }
    }

    /// Create a task completed event
    pub fn task_completed(result: RunResult, position: usize, total: usize) -> Self {
        Self::TaskCompleted {
            result: Box::new(result),
            position,
            total,
        }
    }

    /// Create a task skipped event
    pub fn task_skipped(task: RunTask, position: usize, reason: impl Into<String>) -> Self {
        Self::TaskSkipped {
            task,
            position,
            reason: reason.into(),
        }
    }

    /// Create an info log event
    pub fn info(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    /// Create a warning log event
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Warning,
            message: message.into(),
        }
    }

    /// Create an error log event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Log {
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: SweepEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: SweepEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: SweepEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}
