// Manifest Parser
// Loads and validates sweep manifest files

use crate::error::{SweepError, SweepResult};
use crate::manifest::SweepManifest;
use crate::paths::anchor_at;

use std::fs;
use std::path::{Path, PathBuf};

/// File names looked up when no manifest is given
pub const DEFAULT_MANIFEST_NAMES: &[&str] = &["sweep.yml", "sweep.yaml"];

/// Parser for sweep manifest files
pub struct ManifestParser;

impl ManifestParser {
    /// Parse a manifest from a YAML string.
    ///
    /// The grid is expanded once to reject malformed declarations early.
    /// Roots are not required here since the command line may supply them.
    pub fn parse(content: &str) -> SweepResult<SweepManifest> {
        let manifest: SweepManifest = serde_yaml::from_str(content)?;
        manifest.grid()?;
        Ok(manifest)
    }

    /// Parse a manifest file, resolving its relative paths against the
    /// directory that contains it
    pub fn parse_file(path: &Path) -> SweepResult<SweepManifest> {
        let cwd = std::env::current_dir()?;
        Self::parse_file_from(&cwd, path)
    }

    /// Parse a manifest file whose path is relative to `cwd`.
    ///
    /// Roots and the program's working directory come back absolute.
    pub fn parse_file_from(cwd: &Path, path: &Path) -> SweepResult<SweepManifest> {
        let path = cwd.join(path);
        if !path.exists() {
            return Err(SweepError::ManifestNotFound(path));
        }

        let content = fs::read_to_string(&path)?;
        let mut manifest = Self::parse(&content)?;

        let base_dir = path.parent().unwrap_or(cwd).to_path_buf();
        let anchor = |p: &Path| anchor_at(&base_dir, p);

        manifest.runs_root = manifest.runs_root.as_deref().map(anchor);
        manifest.stats_root = manifest.stats_root.as_deref().map(anchor);
        manifest.program.working_dir = manifest.program.working_dir.as_deref().map(anchor);

        Ok(manifest)
    }

    /// Find the default manifest in a directory
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_MANIFEST_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}
