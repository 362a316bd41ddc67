// Process Invoker
// Launches the evaluation program once per task and observes its exit status

use crate::error::{ConfigurationError, InvocationError};
use crate::runners::{InvocationOutput, InvocationRequest, Invoker};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Number of trailing output lines kept for reporting
pub const DEFAULT_TAIL_LINES: usize = 20;

/// How the evaluation program is launched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSpec {
    /// Executable name (looked up on PATH) or path
    pub command: String,
    /// Argument template; `{input}`, `{output}`, `{group}`, `{mode}` and
    /// `{index}` are substituted per task
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the program
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ProgramSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the template places the paths itself
    fn has_path_placeholders(&self) -> bool {
        self.args
            .iter()
            .any(|a| a.contains("{input}") || a.contains("{output}"))
    }

    /// Concrete argument list for one request.
    ///
    /// Without `{input}`/`{output}` placeholders the input and output paths
    /// are appended as the last two arguments.
    pub fn render_args(&self, request: &InvocationRequest) -> Vec<String> {
        let input = request.input.to_string_lossy();
        let output = request.output.to_string_lossy();
        let index = request.index.to_string();

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{group}", &request.group)
                    .replace("{mode}", &request.mode)
                    .replace("{index}", &index)
            })
            .collect();

        if !self.has_path_placeholders() {
            args.push(input.into_owned());
            args.push(output.into_owned());
        }

        args
    }

    /// Locate the executable, failing before any task runs if it is missing
    pub fn resolve_executable(&self) -> Result<PathBuf, ConfigurationError> {
        let not_found = || ConfigurationError::ProgramNotFound(self.command.clone());
        if self.command.trim().is_empty() {
            return Err(ConfigurationError::Missing("program command"));
        }

        let path = Path::new(&self.command);
        if path.components().count() > 1 {
            let candidate = match &self.working_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.to_path_buf(),
            };
            return if candidate.is_file() {
                Ok(candidate)
            } else {
                Err(not_found())
            };
        }

        which::which(&self.command).map_err(|_| not_found())
    }
}

/// Configuration for process execution
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Timeout per invocation (None = no timeout)
    pub timeout: Option<Duration>,
    /// Trailing stdout/stderr lines kept per invocation
    pub tail_lines: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }
}

/// Invoker that runs the evaluation program as a subprocess
pub struct ProcessInvoker {
    program: ProgramSpec,
    config: ProcessConfig,
}

impl ProcessInvoker {
    pub fn new(program: ProgramSpec) -> Self {
        Self {
            program,
            config: ProcessConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProcessConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn program(&self) -> &ProgramSpec {
        &self.program
    }

    fn build_command(&self, request: &InvocationRequest) -> Command {
        let mut cmd = Command::new(&self.program.command);
        cmd.args(self.program.render_args(request));
        if let Some(dir) = &self.program.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.program.env);
        cmd.env("SWEEP_GROUP", &request.group);
        cmd.env("SWEEP_MODE", &request.mode);
        cmd.env("SWEEP_INDEX", request.index.to_string());
        cmd.env("SWEEP_INPUT", &request.input);
        cmd.env("SWEEP_OUTPUT", &request.output);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Children must not outlive a cancelled sweep
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait::async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(&self, request: &InvocationRequest) -> InvocationOutput {
        let mut cmd = self.build_command(request);
        debug!(
            program = %self.program.command,
            group = %request.group,
            index = request.index,
            "launching evaluation program"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return InvocationOutput::failed(InvocationError::Spawn {
                    program: self.program.command.clone(),
                    message: e.to_string(),
                });
            }
        };

        let tail_lines = self.config.tail_lines;
        let mut stdout_handle = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(collect_tail(stdout, tail_lines)));
        let mut stderr_handle = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_tail(stderr, tail_lines)));

        // Exit and pipe draining share one deadline: a grandchild holding the
        // pipes open must not outlast the timeout
        let completed = async {
            let status = child.wait().await;
            let stdout = join_tail(stdout_handle.as_mut()).await;
            let stderr = join_tail(stderr_handle.as_mut()).await;
            (status, stdout, stderr)
        };

        let finished = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, completed).await.ok(),
            None => Some(completed.await),
        };

        let Some((wait_result, stdout, stderr)) = finished else {
            let _ = child.kill().await;
            for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
                handle.abort();
            }
            return InvocationOutput::failed(InvocationError::Timeout(
                self.config.timeout.unwrap_or_default(),
            ));
        };

        let (exit_code, error) = match wait_result {
            Ok(status) => match status.code() {
                Some(0) => (Some(0), None),
                Some(code) => (Some(code), Some(InvocationError::ExitStatus(code))),
                None => (None, Some(InvocationError::Signaled)),
            },
            Err(e) => (
                None,
                Some(InvocationError::Spawn {
                    program: self.program.command.clone(),
                    message: e.to_string(),
                }),
            ),
        };

        InvocationOutput {
            exit_code,
            stdout,
            stderr,
            error,
        }
    }
}

/// Drain a stream, keeping only the last `limit` lines
async fn collect_tail<R>(stream: R, limit: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut tail = VecDeque::with_capacity(limit);
    while let Ok(Some(line)) = lines.next_line().await {
        trace!(target: "sweep::program", "{}", line);
        if limit == 0 {
            continue;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

async fn join_tail(handle: Option<&mut JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}
