// Grid Models
// Sweep groups, index ranges and run tasks

use crate::error::ConfigurationError;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Check that a mode or toggle name can be used as a single path segment
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), ConfigurationError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name == "." || name == ".." {
        Some("must not be a relative path component")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else if name.starts_with('.') {
        Some("must not start with '.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigurationError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Directory name for a mode with a set of active toggles
pub fn group_dir_name(mode: &str, toggles: &[String]) -> String {
    let mut dir = mode.to_string();
    for toggle in toggles {
        dir.push('_');
        dir.push_str(toggle);
    }
    dir
}

/// One evaluation mode crossed with one set of active toggles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SweepGroup {
    /// Evaluation mode identifier
    pub mode: String,
    /// Active toggles, in declaration order
    pub toggles: Vec<String>,
    /// Directory name shared by the runs and stats trees
    pub dir: String,
}

impl SweepGroup {
    pub fn new(mode: impl Into<String>, toggles: Vec<String>) -> Self {
        let mode = mode.into();
        let dir = group_dir_name(&mode, &toggles);
        Self { mode, toggles, dir }
    }

    /// Whether a toggle is active in this group
    pub fn has_toggle(&self, toggle: &str) -> bool {
        self.toggles.iter().any(|t| t == toggle)
    }
}

impl fmt::Display for SweepGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir)
    }
}

/// Contiguous closed interval of sweep indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: u32,
    pub end: u32,
}

impl IndexRange {
    /// Create a validated range `[start, end]`
    pub fn new(start: u32, end: u32) -> Result<Self, ConfigurationError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// The reference range `[1, n]`
    pub fn up_to(n: u32) -> Result<Self, ConfigurationError> {
        Self::new(1, n)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.start == 0 {
            return Err(ConfigurationError::IndexStartsAtZero(self.start));
        }
        if self.start > self.end {
            return Err(ConfigurationError::EmptyIndexRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, index: u32) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// Whether `other` lies entirely inside this range
    pub fn covers(&self, other: &IndexRange) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl FromStr for IndexRange {
    type Err = ConfigurationError;

    /// Accepts `A..B`, `A..=B` (both inclusive) or a single index `A`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidIndexSyntax(s.to_string());
        let s = s.trim();

        let (start, end) = match s.split_once("..") {
            Some((start, end)) => {
                let end = end.strip_prefix('=').unwrap_or(end);
                (
                    start.trim().parse::<u32>().map_err(|_| invalid())?,
                    end.trim().parse::<u32>().map_err(|_| invalid())?,
                )
            }
            None => {
                let index = s.parse::<u32>().map_err(|_| invalid())?;
                (index, index)
            }
        };

        Self::new(start, end)
    }
}

/// How configuration variants are selected from the declared toggles
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum VariantSpec {
    /// A named selection (`all` or `baseline`)
    Keyword(VariantKeyword),
    /// Explicit list of toggle sets
    List(Vec<Vec<String>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKeyword {
    /// Every combination of the declared toggles
    All,
    /// Only the variant with no toggles active
    Baseline,
}

impl Default for VariantSpec {
    fn default() -> Self {
        VariantSpec::Keyword(VariantKeyword::All)
    }
}

/// One unit of work: a (group, index) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RunTask {
    pub group: SweepGroup,
    pub index: u32,
}

impl RunTask {
    pub fn new(group: SweepGroup, index: u32) -> Self {
        Self { group, index }
    }
}

impl fmt::Display for RunTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.group.dir, self.index)
    }
}

/// The fully expanded sweep grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepGrid {
    /// Declared evaluation modes
    pub modes: Vec<String>,
    /// Declared toggles
    pub toggles: Vec<String>,
    /// Groups in declaration order
    pub groups: Vec<SweepGroup>,
    /// Index range shared by every group
    pub indices: IndexRange,
}

impl SweepGrid {
    /// Look up a group by its directory name
    pub fn group(&self, dir: &str) -> Option<&SweepGroup> {
        self.groups.iter().find(|g| g.dir == dir)
    }

    pub fn contains_group(&self, group: &SweepGroup) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Every task, groups in declaration order and indices ascending
    pub fn tasks(&self) -> Vec<RunTask> {
        self.groups
            .iter()
            .flat_map(|group| {
                self.indices
                    .iter()
                    .map(move |index| RunTask::new(group.clone(), index))
            })
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.groups.len() * self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_dir_name() {
        assert_eq!(group_dir_name("density", &[]), "density");
        assert_eq!(
            group_dir_name(
                "density",
                &["noise-correction".to_string(), "reweight".to_string()]
            ),
            "density_noise-correction_reweight"
        );
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("mode", "sample_based_density").is_ok());
        assert!(validate_name("toggle", "noise-correction").is_ok());

        for bad in ["", ".", "..", "a/b", "a\\b", "with space", ".hidden"] {
            assert!(
                matches!(
                    validate_name("mode", bad),
                    Err(ConfigurationError::InvalidName { .. })
                ),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_index_range_validation() {
        assert!(IndexRange::new(1, 10).is_ok());
        assert!(IndexRange::new(3, 3).is_ok());
        assert_eq!(
            IndexRange::new(4, 2),
            Err(ConfigurationError::EmptyIndexRange { start: 4, end: 2 })
        );
        assert_eq!(
            IndexRange::new(0, 2),
            Err(ConfigurationError::IndexStartsAtZero(0))
        );
    }

    #[test]
    fn test_index_range_iteration() {
        let range = IndexRange::up_to(4).unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(range.len(), 4);
        assert!(range.contains(1));
        assert!(range.contains(4));
        assert!(!range.contains(5));
        assert!(range.covers(&IndexRange::new(2, 3).unwrap()));
        assert!(!range.covers(&IndexRange::new(2, 5).unwrap()));
    }

    #[test]
    fn test_index_range_from_str() {
        assert_eq!("2..5".parse::<IndexRange>().unwrap(), IndexRange { start: 2, end: 5 });
        assert_eq!("2..=5".parse::<IndexRange>().unwrap(), IndexRange { start: 2, end: 5 });
        assert_eq!("7".parse::<IndexRange>().unwrap(), IndexRange { start: 7, end: 7 });
        assert!(matches!(
            "x..3".parse::<IndexRange>(),
            Err(ConfigurationError::InvalidIndexSyntax(_))
        ));
        assert!(matches!(
            "5..2".parse::<IndexRange>(),
            Err(ConfigurationError::EmptyIndexRange { .. })
        ));
    }

    #[test]
    fn test_variant_spec_yaml() {
        let spec: VariantSpec = serde_yaml::from_str("all").unwrap();
        assert_eq!(spec, VariantSpec::Keyword(VariantKeyword::All));

        let spec: VariantSpec = serde_yaml::from_str("baseline").unwrap();
        assert_eq!(spec, VariantSpec::Keyword(VariantKeyword::Baseline));

        let spec: VariantSpec = serde_yaml::from_str("- []\n- [noise-correction]\n").unwrap();
        assert_eq!(
            spec,
            VariantSpec::List(vec![vec![], vec!["noise-correction".to_string()]])
        );
    }

    #[test]
    fn test_grid_tasks_order() {
        let grid = SweepGrid {
            modes: vec!["density".to_string()],
            toggles: vec!["noise-correction".to_string()],
            groups: vec![
                SweepGroup::new("density", vec![]),
                SweepGroup::new("density", vec!["noise-correction".to_string()]),
            ],
            indices: IndexRange::up_to(2).unwrap(),
        };

        let labels: Vec<_> = grid.tasks().iter().map(|t| t.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "(density, 1)",
                "(density, 2)",
                "(density_noise-correction, 1)",
                "(density_noise-correction, 2)",
            ]
        );
        assert_eq!(grid.task_count(), 4);
        assert!(grid.group("density_noise-correction").is_some());
        assert!(grid.group("baseline").is_none());
    }
}
