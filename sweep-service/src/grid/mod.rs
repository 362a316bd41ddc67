// Sweep Grid Module
// Declarative grid model and its deterministic expansion into tasks

pub mod expander;
pub mod models;

// Re-export key types
pub use expander::{GridBuilder, GridExpander};
pub use models::{
    group_dir_name, IndexRange, RunTask, SweepGrid, SweepGroup, VariantKeyword, VariantSpec,
};
