// Path Resolution
// Maps (group, index) pairs onto the runs and stats trees

use crate::error::{ConfigurationError, PathError};
use crate::grid::{SweepGrid, SweepGroup};

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default extension of input configuration files
pub const DEFAULT_INPUT_EXTENSION: &str = "config";

/// Default extension of output statistics files
pub const DEFAULT_OUTPUT_EXTENSION: &str = "stats";

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Expand `~` and anchor a relative path at `base`
pub fn anchor_at(base: &Path, path: &Path) -> PathBuf {
    let path = expand_home(path);
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}

/// Expand `~` and anchor a relative path at the current directory.
///
/// The program may run in another working directory, so every path handed
/// to it must be absolute.
pub fn absolute_root(path: &Path) -> Result<PathBuf, ConfigurationError> {
    std::path::absolute(expand_home(path)).map_err(|e| ConfigurationError::UnresolvableRoot {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Root directories and file extensions of a sweep family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepLayout {
    /// Root of the input ("runs") tree
    pub runs_root: PathBuf,
    /// Root of the output ("stats") tree
    pub stats_root: PathBuf,
    pub input_extension: String,
    pub output_extension: String,
}

impl SweepLayout {
    pub fn new(runs_root: impl Into<PathBuf>, stats_root: impl Into<PathBuf>) -> Self {
        Self {
            runs_root: runs_root.into(),
            stats_root: stats_root.into(),
            input_extension: DEFAULT_INPUT_EXTENSION.to_string(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
        }
    }

    pub fn with_extensions(
        mut self,
        input_extension: impl Into<String>,
        output_extension: impl Into<String>,
    ) -> Self {
        self.input_extension = input_extension.into();
        self.output_extension = output_extension.into();
        self
    }

    /// Output directory of a group
    pub fn group_output_dir(&self, group: &SweepGroup) -> PathBuf {
        self.stats_root.join(&group.dir)
    }

    pub fn input_path(&self, group: &SweepGroup, index: u32) -> PathBuf {
        self.runs_root
            .join(&group.dir)
            .join(format!("{}.{}", index, self.input_extension))
    }

    pub fn output_path(&self, group: &SweepGroup, index: u32) -> PathBuf {
        self.group_output_dir(group)
            .join(format!("{}.{}", index, self.output_extension))
    }

    /// Both paths of a pair, without bounds checks
    pub fn paths(&self, group: &SweepGroup, index: u32) -> ResolvedPaths {
        ResolvedPaths {
            input: self.input_path(group, index),
            output: self.output_path(group, index),
        }
    }
}

/// Input and output locations of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ResolvedPaths {
    /// Hidden sibling of the output that the program writes to before the
    /// result is moved into place
    pub fn staging(&self) -> PathBuf {
        let file_name = self
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output.with_file_name(format!(".{}.partial", file_name))
    }
}

/// Resolves task paths against a declared grid
#[derive(Debug, Clone)]
pub struct PathResolver {
    grid: SweepGrid,
    layout: SweepLayout,
}

impl PathResolver {
    pub fn new(grid: SweepGrid, layout: SweepLayout) -> Self {
        Self { grid, layout }
    }

    pub fn layout(&self) -> &SweepLayout {
        &self.layout
    }

    pub fn grid(&self) -> &SweepGrid {
        &self.grid
    }

    /// Check that a pair belongs to the declared grid
    pub fn check(&self, group: &SweepGroup, index: u32) -> Result<(), PathError> {
        if !self.grid.contains_group(group) {
            return Err(PathError::UnknownGroup(group.dir.clone()));
        }
        let range = self.grid.indices;
        if !range.contains(index) {
            return Err(PathError::IndexOutOfRange {
                index,
                start: range.start,
                end: range.end,
            });
        }
        Ok(())
    }

    /// Paths of a task without touching the filesystem
    pub fn paths(&self, group: &SweepGroup, index: u32) -> Result<ResolvedPaths, PathError> {
        self.check(group, index)?;
        Ok(self.layout.paths(group, index))
    }

    /// Resolve a task's paths and make sure the output directory exists
    pub fn resolve(&self, group: &SweepGroup, index: u32) -> Result<ResolvedPaths, PathError> {
        let paths = self.paths(group, index)?;
        if let Some(parent) = paths.output.parent() {
            ensure_dir(parent)?;
        }
        Ok(paths)
    }

    /// Create a group's output directory ahead of its first task
    pub fn prepare_group(&self, group: &SweepGroup) -> Result<PathBuf, PathError> {
        if !self.grid.contains_group(group) {
            return Err(PathError::UnknownGroup(group.dir.clone()));
        }
        let dir = self.layout.group_output_dir(group);
        ensure_dir(&dir)?;
        Ok(dir)
    }
}

/// Idempotent, concurrency-safe directory creation
fn ensure_dir(dir: &Path) -> Result<(), PathError> {
    fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })
}
