pub mod plan;
pub mod run;
pub mod validate;

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;

use sweep_service::{IndexRange, ManifestParser, SweepManifest, TaskFilter};

/// Manifest location and per-invocation root overrides
#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Path to the sweep manifest (default: sweep.yml in the current directory)
    pub manifest: Option<PathBuf>,

    /// Root of the input configuration tree (overrides the manifest)
    #[arg(long, value_name = "DIR")]
    pub runs_root: Option<PathBuf>,

    /// Root of the output statistics tree (overrides the manifest)
    #[arg(long, value_name = "DIR")]
    pub stats_root: Option<PathBuf>,
}

impl ManifestArgs {
    pub fn manifest_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.manifest {
            return Ok(path.clone());
        }
        let cwd = std::env::current_dir()?;
        match ManifestParser::discover(&cwd) {
            Some(path) => Ok(path),
            None => bail!("No sweep.yml found in {}", cwd.display()),
        }
    }

    /// Parse the manifest and apply command line overrides
    pub fn load(&self) -> Result<(PathBuf, SweepManifest)> {
        let path = self.manifest_path()?;
        let mut manifest = ManifestParser::parse_file(&path)
            .wrap_err_with(|| format!("Failed to load {}", path.display()))?;
        self.apply(&mut manifest);
        Ok((path, manifest))
    }

    /// Command line roots take precedence over the manifest's
    pub fn apply(&self, manifest: &mut SweepManifest) {
        if let Some(root) = &self.runs_root {
            manifest.runs_root = Some(root.clone());
        }
        if let Some(root) = &self.stats_root {
            manifest.stats_root = Some(root.clone());
        }
    }
}

/// Restrict a command to part of the grid
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Only this group directory (can be repeated)
    #[arg(long = "group", value_name = "NAME")]
    pub groups: Vec<String>,

    /// Only these indices, e.g. `3..5` or `7`
    #[arg(long, value_name = "A..B")]
    pub indices: Option<IndexRange>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> TaskFilter {
        TaskFilter {
            groups: self.groups.clone(),
            indices: self.indices,
        }
    }
}
