// Error Types
// Task-level and startup-level error families for sweep execution

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the service
pub type SweepResult<T> = Result<T, SweepError>;

/// Top-level error for operations that abort a sweep
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("IO error reading manifest: {0}")]
    Io(#[from] io::Error),

    #[error("YAML parse error in manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The declared sweep grid or run settings are malformed.
///
/// Raised before any external process is launched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("index range [{start}, {end}] is empty")]
    EmptyIndexRange { start: u32, end: u32 },

    #[error("index range must start at 1 or above, got {0}")]
    IndexStartsAtZero(u32),

    #[error("no evaluation modes declared")]
    NoModes,

    #[error("no variants selected")]
    NoVariants,

    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("{count} toggles declared, at most {max} may be combined")]
    TooManyToggles { count: usize, max: usize },

    #[error("variant references undeclared toggle '{0}'")]
    UnknownToggle(String),

    #[error("groups map to the same directory '{0}'")]
    DuplicateGroupDir(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("evaluation program '{0}' could not be found")]
    ProgramNotFound(String),

    #[error("unknown group '{0}' in filter")]
    UnknownGroupFilter(String),

    #[error("index filter {start}..{end} is outside the declared range [{declared_start}, {declared_end}]")]
    IndexFilterOutOfRange {
        start: u32,
        end: u32,
        declared_start: u32,
        declared_end: u32,
    },

    #[error("invalid index range '{0}', expected START..END or a single index")]
    InvalidIndexSyntax(String),

    #[error("max_parallel must be at least 1")]
    ZeroParallelism,

    #[error("cannot make {} absolute: {message}", .path.display())]
    UnresolvableRoot { path: PathBuf, message: String },
}

/// A task's paths could not be resolved or prepared
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("group '{0}' is not declared in this sweep")]
    UnknownGroup(String),

    #[error("index {index} is outside [{start}, {end}]")]
    IndexOutOfRange { index: u32, start: u32, end: u32 },

    #[error("failed to create directory {}: {message}", .path.display())]
    CreateDir { path: PathBuf, message: String },
}

/// One invocation of the evaluation program failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("failed to launch '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("exited with status {0}")]
    ExitStatus(i32),

    #[error("terminated by signal")]
    Signaled,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("program succeeded but wrote no output at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("failed to move output into place at {}: {message}", .path.display())]
    Finalize { path: PathBuf, message: String },
}

impl InvocationError {
    /// Exit code carried by the error, if the process exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            InvocationError::ExitStatus(code) => Some(*code),
            _ => None,
        }
    }
}

/// Error attached to a failed run result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}
