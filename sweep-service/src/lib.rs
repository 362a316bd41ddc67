// Sweep Service Library
// Core service for declaring, planning and running evaluation sweeps

pub mod error;
pub mod execution;
pub mod grid;
pub mod manifest;
pub mod paths;
pub mod report;
pub mod runners;

// Re-export commonly used types
pub use error::{
    ConfigurationError, InvocationError, PathError, SweepError, SweepResult, TaskError,
};

// Re-export grid types
pub use grid::{
    GridBuilder, GridExpander, IndexRange, RunTask, SweepGrid, SweepGroup, VariantKeyword,
    VariantSpec,
};

// Re-export execution types
pub use execution::{
    progress_channel, EventSender, ExecutorConfig, LogLevel, PlannedTask, ProgressReceiver,
    ProgressSender, RunResult, RunStatus, SweepEvent, SweepExecutor, SweepSummary, TaskFilter,
};

// Re-export manifest and path types
pub use manifest::{ManifestParser, SweepManifest};
pub use paths::{PathResolver, ResolvedPaths, SweepLayout};

// Re-export runner types
pub use runners::{InvocationOutput, InvocationRequest, Invoker, ProcessInvoker, ProgramSpec};

// Re-export reporting types
pub use report::{ReportFormat, SweepReporter};
