//! Activation statistics collected from a dataset
//!
//! A collaborator model runs text through the network and reports, for each
//! unit group, aggregate statistics keyed by a normalization name ("mean",
//! "orig", ...). When peak offsets are requested it also hands back raw
//! attention samples so a center can be estimated per unit.

mod stats;
mod summary;


pub use stats::{ActivationStats, StatsAccumulator};
pub use summary::{ActivationSummary, GroupActivations, RawAttention, UnitGroup};
