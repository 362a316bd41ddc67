// Grid Expansion
// Expands declared modes and toggles into concrete sweep groups

use crate::error::ConfigurationError;
use crate::grid::models::{
    validate_name, IndexRange, SweepGrid, SweepGroup, VariantKeyword, VariantSpec,
};

use std::collections::HashSet;

/// Upper bound on toggles combined by `variants: all`
pub const MAX_COMBINED_TOGGLES: usize = 16;

/// Grid expander for sweep declarations
pub struct GridExpander;

impl GridExpander {
    /// Expand modes, toggles and a variant selection into a validated grid.
    ///
    /// Groups are ordered by mode first, then by variant, both in declaration
    /// order, so the same declarations always produce the same enumeration.
    pub fn expand(
        modes: &[String],
        toggles: &[String],
        variants: &VariantSpec,
        indices: IndexRange,
    ) -> Result<SweepGrid, ConfigurationError> {
        indices.validate()?;

        if modes.is_empty() {
            return Err(ConfigurationError::NoModes);
        }
        Self::check_names("mode", modes)?;
        Self::check_names("toggle", toggles)?;

        let variant_sets = match variants {
            VariantSpec::Keyword(VariantKeyword::All) => Self::expand_all(toggles)?,
            VariantSpec::Keyword(VariantKeyword::Baseline) => vec![Vec::new()],
            VariantSpec::List(list) => Self::expand_list(toggles, list)?,
        };

        if variant_sets.is_empty() {
            return Err(ConfigurationError::NoVariants);
        }

        let mut groups = Vec::with_capacity(modes.len() * variant_sets.len());
        let mut dirs = HashSet::new();

        for mode in modes {
            for variant in &variant_sets {
                let group = SweepGroup::new(mode.clone(), variant.clone());
                // "a_b" + ["c"] and "a" + ["b_c"] collide on disk
                if !dirs.insert(group.dir.clone()) {
                    return Err(ConfigurationError::DuplicateGroupDir(group.dir));
                }
                groups.push(group);
            }
        }

        Ok(SweepGrid {
            modes: modes.to_vec(),
            toggles: toggles.to_vec(),
            groups,
            indices,
        })
    }

    /// Every subset of the toggles, ordered by bitmask
    fn expand_all(toggles: &[String]) -> Result<Vec<Vec<String>>, ConfigurationError> {
        if toggles.len() > MAX_COMBINED_TOGGLES {
            return Err(ConfigurationError::TooManyToggles {
                count: toggles.len(),
                max: MAX_COMBINED_TOGGLES,
            });
        }

        let combinations = 1usize << toggles.len();
        Ok((0..combinations)
            .map(|mask| {
                toggles
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| mask & (1 << bit) != 0)
                    .map(|(_, toggle)| toggle.clone())
                    .collect()
            })
            .collect())
    }

    /// Explicit variants, with toggles reordered to declaration order
    fn expand_list(
        toggles: &[String],
        list: &[Vec<String>],
    ) -> Result<Vec<Vec<String>>, ConfigurationError> {
        let mut variants = Vec::with_capacity(list.len());

        for requested in list {
            for name in requested {
                if !toggles.contains(name) {
                    return Err(ConfigurationError::UnknownToggle(name.clone()));
                }
            }

            let normalized: Vec<String> = toggles
                .iter()
                .filter(|t| requested.contains(t))
                .cloned()
                .collect();

            if variants.contains(&normalized) {
                return Err(ConfigurationError::Duplicate {
                    kind: "variant",
                    name: if normalized.is_empty() {
                        "baseline".to_string()
                    } else {
                        normalized.join("+")
                    },
                });
            }
            variants.push(normalized);
        }

        Ok(variants)
    }

    fn check_names(kind: &'static str, names: &[String]) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for name in names {
            validate_name(kind, name)?;
            if !seen.insert(name.as_str()) {
                return Err(ConfigurationError::Duplicate {
                    kind,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for declaring a grid programmatically
pub struct GridBuilder {
    modes: Vec<String>,
    toggles: Vec<String>,
    variants: VariantSpec,
    indices: IndexRange,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self {
            modes: Vec::new(),
            toggles: Vec::new(),
            variants: VariantSpec::default(),
            indices: IndexRange { start: 1, end: 1 },
        }
    }

    /// Add an evaluation mode
    pub fn mode(mut self, name: impl Into<String>) -> Self {
        self.modes.push(name.into());
        self
    }

    /// Add a toggle
    pub fn toggle(mut self, name: impl Into<String>) -> Self {
        self.toggles.push(name.into());
        self
    }

    /// Select an explicit list of variants instead of every combination
    pub fn variant<I, S>(mut self, toggles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variant = toggles.into_iter().map(Into::into).collect();
        match &mut self.variants {
            VariantSpec::List(list) => list.push(variant),
            VariantSpec::Keyword(_) => self.variants = VariantSpec::List(vec![variant]),
        }
        self
    }

    /// Set the variant selection wholesale
    pub fn variants(mut self, variants: VariantSpec) -> Self {
        self.variants = variants;
        self
    }

    /// Set the closed index range
    pub fn indices(mut self, start: u32, end: u32) -> Self {
        self.indices = IndexRange { start, end };
        self
    }

    /// Validate and expand into a grid
    pub fn build(self) -> Result<SweepGrid, ConfigurationError> {
        GridExpander::expand(&self.modes, &self.toggles, &self.variants, self.indices)
    }
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expand_all_combinations() {
        let grid = GridExpander::expand(
            &names(&["sample_based_density", "baseline_density"]),
            &names(&["noise-correction", "reweight-off-diagonal"]),
            &VariantSpec::default(),
            IndexRange::up_to(10).unwrap(),
        )
        .unwrap();

        let dirs: Vec<_> = grid.groups.iter().map(|g| g.dir.as_str()).collect();
        assert_eq!(
            dirs,
            vec![
                "sample_based_density",
                "sample_based_density_noise-correction",
                "sample_based_density_reweight-off-diagonal",
                "sample_based_density_noise-correction_reweight-off-diagonal",
                "baseline_density",
                "baseline_density_noise-correction",
                "baseline_density_reweight-off-diagonal",
                "baseline_density_noise-correction_reweight-off-diagonal",
            ]
        );
        assert_eq!(grid.task_count(), 80);
    }

    #[test]
    fn test_expand_without_toggles() {
        let grid = GridExpander::expand(
            &names(&["density"]),
            &[],
            &VariantSpec::default(),
            IndexRange::up_to(3).unwrap(),
        )
        .unwrap();

        assert_eq!(grid.groups.len(), 1);
        assert_eq!(grid.groups[0].dir, "density");
        assert!(grid.groups[0].toggles.is_empty());
    }

    #[test]
    fn test_expand_baseline_only() {
        let grid = GridBuilder::new()
            .mode("density")
            .toggle("noise-correction")
            .variants(VariantSpec::Keyword(VariantKeyword::Baseline))
            .indices(1, 2)
            .build()
            .unwrap();

        assert_eq!(grid.groups.len(), 1);
        assert_eq!(grid.groups[0].dir, "density");
    }

    #[test]
    fn test_explicit_variants_follow_declaration_order() {
        let grid = GridBuilder::new()
            .mode("density")
            .toggle("noise-correction")
            .toggle("reweight")
            .variant(["reweight", "noise-correction"])
            .variant(Vec::<String>::new())
            .indices(1, 10)
            .build()
            .unwrap();

        let dirs: Vec<_> = grid.groups.iter().map(|g| g.dir.as_str()).collect();
        assert_eq!(dirs, vec!["density_noise-correction_reweight", "density"]);
        assert!(grid.groups[0].has_toggle("reweight"));
    }

    #[test]
    fn test_unknown_toggle_in_variant() {
        let result = GridBuilder::new()
            .mode("density")
            .toggle("noise-correction")
            .variant(["reweight"])
            .indices(1, 3)
            .build();

        assert_eq!(
            result,
            Err(ConfigurationError::UnknownToggle("reweight".to_string()))
        );
    }

    #[test]
    fn test_duplicate_variant() {
        let result = GridBuilder::new()
            .mode("density")
            .toggle("a")
            .toggle("b")
            .variant(["a", "b"])
            .variant(["b", "a"])
            .indices(1, 3)
            .build();

        assert!(matches!(
            result,
            Err(ConfigurationError::Duplicate { kind: "variant", .. })
        ));
    }

    #[test]
    fn test_colliding_directories_rejected() {
        let result = GridBuilder::new()
            .mode("a_b")
            .mode("a")
            .toggle("b")
            .toggle("c")
            .build();

        // "a" + {b} yields "a_b", the baseline directory of mode "a_b"
        assert!(matches!(
            result,
            Err(ConfigurationError::DuplicateGroupDir(dir)) if dir == "a_b"
        ));
    }

    #[test]
    fn test_rejects_malformed_declarations() {
        assert_eq!(
            GridBuilder::new().indices(1, 3).build(),
            Err(ConfigurationError::NoModes)
        );
        assert!(matches!(
            GridBuilder::new().mode("density").mode("density").build(),
            Err(ConfigurationError::Duplicate { kind: "mode", .. })
        ));
        assert!(matches!(
            GridBuilder::new().mode("density").indices(5, 1).build(),
            Err(ConfigurationError::EmptyIndexRange { .. })
        ));
        assert_eq!(
            GridBuilder::new()
                .mode("density")
                .variants(VariantSpec::List(Vec::new()))
                .build(),
            Err(ConfigurationError::NoVariants)
        );
    }

    #[test]
    fn test_too_many_toggles() {
        let toggles: Vec<String> = (0..=MAX_COMBINED_TOGGLES).map(|i| format!("t{}", i)).collect();
        let result = GridExpander::expand(
            &names(&["density"]),
            &toggles,
            &VariantSpec::default(),
            IndexRange::up_to(1).unwrap(),
        );

        assert!(matches!(
            result,
            Err(ConfigurationError::TooManyToggles { .. })
        ));
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let build = || {
            GridBuilder::new()
                .mode("m1")
                .mode("m2")
                .toggle("x")
                .toggle("y")
                .toggle("z")
                .indices(1, 4)
                .build()
                .unwrap()
                .tasks()
        };

        assert_eq!(build(), build());
    }
}
