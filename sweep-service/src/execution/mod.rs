// Execution Engine Module
// Handles sweep orchestration, progress events, and run results

pub mod events;
pub mod executor;
pub mod results;

// Re-export key types
pub use events::{progress_channel, EventSender, LogLevel, ProgressReceiver, ProgressSender, SweepEvent};
pub use executor::{ExecutorConfig, PlannedTask, SweepExecutor, TaskFilter};
pub use results::{RunResult, RunStatus, SweepSummary};
