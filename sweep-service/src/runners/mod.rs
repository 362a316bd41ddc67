// Runners Module
// Invocation of the external evaluation program

pub mod process;

// Re-export key types
pub use process::{ProcessConfig, ProcessInvoker, ProgramSpec};

use crate::error::InvocationError;

use std::path::PathBuf;

/// Everything an invoker needs for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Configuration file the program reads
    pub input: PathBuf,
    /// Destination the program writes
    pub output: PathBuf,
    /// Group directory name
    pub group: String,
    /// Evaluation mode of the group
    pub mode: String,
    /// Sweep index
    pub index: u32,
}

/// Output collected from one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOutput {
    /// Exit code (if the process exited normally)
    pub exit_code: Option<i32>,
    /// Trailing standard output
    pub stdout: String,
    /// Trailing standard error
    pub stderr: String,
    /// Set when the invocation failed
    pub error: Option<InvocationError>,
}

impl InvocationOutput {
    /// A successful, silent invocation
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn failed(error: InvocationError) -> Self {
        Self {
            exit_code: error.exit_code(),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Trait for evaluation program invokers.
///
/// Failures are returned as data in [`InvocationOutput::error`]; an invoker
/// never panics or aborts the sweep, and never retries.
#[async_trait::async_trait]
pub trait Invoker: Send + Sync {
    /// Run the program once for the given input/output pair
    async fn invoke(&self, request: &InvocationRequest) -> InvocationOutput;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_constructors() {
        let ok = InvocationOutput::success();
        assert!(ok.succeeded());
        assert_eq!(ok.exit_code, Some(0));

        let failed = InvocationOutput::failed(InvocationError::ExitStatus(2));
        assert!(!failed.succeeded());
        assert_eq!(failed.exit_code, Some(2));
    }
}
