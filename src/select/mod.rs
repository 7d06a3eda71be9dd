//! Removal selection
//!
//! Turns a score tensor and a target fraction into a boolean removal mask.

pub mod heads;
mod top_frac;

#[cfg(test)]
mod proptests;

pub use heads::{expand_heads, head_scores, select_heads};
pub use top_frac::{selection_count, top_fraction, top_fraction_per_layer, Selection};
