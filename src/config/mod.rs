//! Pruning configuration module
//!
//! Provides the run configuration and the mode enumerations it selects
//! between. Configurations load from YAML.

mod modes;
mod pruning_config;

#[cfg(test)]
mod tests;

pub use modes::{AttnMode, HeadReduction, HeadSelection, OffsetMode};
pub use pruning_config::PruningConfig;
