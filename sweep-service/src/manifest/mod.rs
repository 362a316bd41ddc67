// Sweep Manifest
// YAML declaration of a sweep: program, roots, grid and run settings

pub mod parser;

pub use parser::{ManifestParser, DEFAULT_MANIFEST_NAMES};

use crate::error::ConfigurationError;
use crate::execution::{ExecutorConfig, SweepExecutor};
use crate::grid::{models::validate_name, GridExpander, IndexRange, SweepGrid, VariantSpec};
use crate::paths::{
    absolute_root, PathResolver, SweepLayout, DEFAULT_INPUT_EXTENSION, DEFAULT_OUTPUT_EXTENSION,
};
use crate::runners::{Invoker, ProcessConfig, ProcessInvoker, ProgramSpec};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A parsed sweep manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepManifest {
    /// Sweep name used in reports
    #[serde(default = "default_name")]
    pub name: String,

    /// Evaluation program
    pub program: ProgramSpec,

    /// Root of the input configuration tree (may come from the command line)
    #[serde(default)]
    pub runs_root: Option<PathBuf>,

    /// Root of the output statistics tree (may come from the command line)
    #[serde(default)]
    pub stats_root: Option<PathBuf>,

    pub modes: Vec<String>,

    #[serde(default)]
    pub toggles: Vec<String>,

    #[serde(default)]
    pub variants: VariantSpec,

    pub indices: IndexRange,

    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Per-invocation timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    #[serde(default)]
    pub retries: u32,

    #[serde(default = "default_atomic_output")]
    pub atomic_output: bool,
}

fn default_name() -> String {
    "sweep".to_string()
}

fn default_input_extension() -> String {
    DEFAULT_INPUT_EXTENSION.to_string()
}

fn default_output_extension() -> String {
    DEFAULT_OUTPUT_EXTENSION.to_string()
}

fn default_max_parallel() -> usize {
    1
}

fn default_atomic_output() -> bool {
    true
}

impl SweepManifest {
    /// Expand the declared modes, toggles and variants into groups
    pub fn grid(&self) -> Result<SweepGrid, ConfigurationError> {
        GridExpander::expand(&self.modes, &self.toggles, &self.variants, self.indices)
    }

    /// Directory layout with absolute roots; both roots must be set by now.
    ///
    /// Relative roots (from the command line, or a manifest parsed from a
    /// string) are taken relative to the current directory.
    pub fn layout(&self) -> Result<SweepLayout, ConfigurationError> {
        let runs_root = self
            .runs_root
            .as_deref()
            .ok_or(ConfigurationError::Missing("runs root"))?;
        let stats_root = self
            .stats_root
            .as_deref()
            .ok_or(ConfigurationError::Missing("stats root"))?;

        validate_name("input extension", &self.input_extension)?;
        validate_name("output extension", &self.output_extension)?;

        Ok(SweepLayout::new(absolute_root(runs_root)?, absolute_root(stats_root)?)
            .with_extensions(&self.input_extension, &self.output_extension))
    }

    pub fn resolver(&self) -> Result<PathResolver, ConfigurationError> {
        Ok(PathResolver::new(self.grid()?, self.layout()?))
    }

    pub fn process_config(&self) -> ProcessConfig {
        ProcessConfig {
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..Default::default()
        }
    }

    pub fn executor_config(&self) -> Result<ExecutorConfig, ConfigurationError> {
        if self.max_parallel == 0 {
            return Err(ConfigurationError::ZeroParallelism);
        }
        Ok(ExecutorConfig {
            max_parallel: self.max_parallel,
            retries: self.retries,
            only_missing: false,
            atomic_output: self.atomic_output,
        })
    }

    /// Subprocess invoker for the declared program, without checking that
    /// the program exists
    pub fn invoker(&self) -> ProcessInvoker {
        ProcessInvoker::new(self.program.clone()).with_config(self.process_config())
    }

    /// Every startup check that does not need the program on disk
    pub fn validate(&self) -> Result<SweepGrid, ConfigurationError> {
        let grid = self.grid()?;
        self.layout()?;
        self.executor_config()?;
        if self.program.command.trim().is_empty() {
            return Err(ConfigurationError::Missing("program command"));
        }
        Ok(grid)
    }

    /// Executor driving the given invoker over this manifest's grid
    pub fn executor_with(
        &self,
        invoker: Arc<dyn Invoker>,
    ) -> Result<SweepExecutor, ConfigurationError> {
        let resolver = self.resolver()?;
        let config = self.executor_config()?;
        Ok(SweepExecutor::new(&self.name, resolver, invoker).with_config(config))
    }

    /// Executor for a real sweep; fails if the program cannot be found
    pub fn executor(&self) -> Result<SweepExecutor, ConfigurationError> {
        self.validate()?;
        self.program.resolve_executable()?;
        self.executor_with(Arc::new(self.invoker()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> SweepManifest {
        ManifestParser::parse(
            r#"
name: density
program:
  command: sh
  args: ["-c", "cp \"$1\" \"$2\"", "evaluate"]
runs_root: runs
stats_root: stats
modes: [density]
toggles: [noise-correction]
indices: { start: 1, end: 3 }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let manifest = manifest();
        assert_eq!(manifest.variants, VariantSpec::default());
        assert_eq!(manifest.input_extension, "config");
        assert_eq!(manifest.output_extension, "stats");
        assert_eq!(manifest.max_parallel, 1);
        assert_eq!(manifest.retries, 0);
        assert!(manifest.atomic_output);
        assert_eq!(manifest.process_config().timeout, None);
    }

    #[test]
    fn test_grid_and_layout() {
        let manifest = manifest();
        let grid = manifest.validate().unwrap();
        assert_eq!(grid.groups.len(), 2);
        assert_eq!(grid.task_count(), 6);

        let cwd = std::env::current_dir().unwrap();
        let layout = manifest.layout().unwrap();
        assert_eq!(layout.runs_root, cwd.join("runs"));
        assert_eq!(layout.stats_root, cwd.join("stats"));
    }

    #[test]
    fn test_missing_roots() {
        let mut manifest = manifest();
        manifest.stats_root = None;
        assert_eq!(
            manifest.validate(),
            Err(ConfigurationError::Missing("stats root"))
        );

        manifest.runs_root = None;
        assert_eq!(
            manifest.layout(),
            Err(ConfigurationError::Missing("runs root"))
        );
    }

    #[test]
    fn test_zero_parallelism() {
        let mut manifest = manifest();
        manifest.max_parallel = 0;
        assert_eq!(
            manifest.executor_config().unwrap_err(),
            ConfigurationError::ZeroParallelism
        );
    }

    #[test]
    fn test_run_settings() {
        let mut manifest = manifest();
        manifest.timeout_secs = Some(90);
        manifest.retries = 2;
        manifest.atomic_output = false;

        assert_eq!(
            manifest.process_config().timeout,
            Some(Duration::from_secs(90))
        );
        let config = manifest.executor_config().unwrap();
        assert_eq!(config.retries, 2);
        assert!(!config.atomic_output);
        assert!(!config.only_missing);
    }

    #[test]
    fn test_unresolvable_program() {
        let mut manifest = manifest();
        manifest.program.command = "definitely-not-an-evaluation-program".to_string();
        assert!(matches!(
            manifest.executor(),
            Err(ConfigurationError::ProgramNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_end_to_end_with_real_program() {
        let temp = tempfile::tempdir().unwrap();
        let mut manifest = manifest();
        manifest.runs_root = Some(temp.path().join("runs"));
        manifest.stats_root = Some(temp.path().join("stats"));

        // Inputs for every task except (density_noise-correction, 2)
        for (dir, index) in [
            ("density", 1),
            ("density", 2),
            ("density", 3),
            ("density_noise-correction", 1),
            ("density_noise-correction", 3),
        ] {
            let input = temp.path().join("runs").join(dir);
            std::fs::create_dir_all(&input).unwrap();
            std::fs::write(input.join(format!("{}.config", index)), format!("{dir}/{index}"))
                .unwrap();
        }

        let summary = manifest.executor().unwrap().execute().await.unwrap();

        assert_eq!(summary.succeeded(), 5);
        assert_eq!(summary.failed(), 1);
        let failure = summary.failures().next().unwrap();
        assert_eq!(failure.task.to_string(), "(density_noise-correction, 2)");
        assert!(!failure.stderr.is_empty());

        let copied = std::fs::read_to_string(
            temp.path()
                .join("stats")
                .join("density_noise-correction")
                .join("3.stats"),
        )
        .unwrap();
        assert_eq!(copied, "density_noise-correction/3");
        assert!(!temp
            .path()
            .join("stats")
            .join("density_noise-correction")
            .join("2.stats")
            .exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_manifest_with_working_dir() {
        let temp = tempfile::tempdir().unwrap();
        let demos = temp.path().join("demos");
        std::fs::create_dir_all(demos.join("runs").join("density")).unwrap();
        std::fs::create_dir_all(temp.path().join("experiments")).unwrap();
        std::fs::write(demos.join("runs").join("density").join("1.config"), "patch 1").unwrap();
        std::fs::write(
            demos.join("sweep.yml"),
            r#"
program:
  command: sh
  args: ["-c", "cp \"$1\" \"$2\"", "evaluate"]
  working_dir: ../experiments
runs_root: runs
stats_root: stats
modes: [density]
indices: { start: 1, end: 1 }
"#,
        )
        .unwrap();

        // The program runs in experiments/, so it only finds its files if
        // the paths it receives are absolute
        let manifest =
            ManifestParser::parse_file_from(temp.path(), std::path::Path::new("demos/sweep.yml"))
                .unwrap();
        let summary = manifest.executor().unwrap().execute().await.unwrap();

        assert_eq!(summary.succeeded(), 1, "{:?}", summary.results);
        assert_eq!(
            std::fs::read_to_string(demos.join("stats").join("density").join("1.stats")).unwrap(),
            "patch 1"
        );
        assert!(!temp.path().join("experiments").join("stats").exists());
    }
}
