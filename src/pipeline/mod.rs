//! Pruning pipeline
//!
//! Drives a live model through pruning iterations:
//! 1. Collect: activation statistics on the focus and cripple datasets
//! 2. Score: one score per unit from the focus/cripple statistics
//! 3. Select: global or per-head removal masks under a target fraction
//! 4. Delete: push masks (and offsets) into the model
//! 5. Evaluate: merge metrics into a history row

mod offsets;
mod orchestrator;
mod random;
mod runner;
mod stage;

pub use offsets::{apply_attn_offsets, attn_offsets};
pub use orchestrator::{prune_and_evaluate, score_and_prune, Precomputed};
pub use random::{
    draw_random_units, prune_random, prune_random_and_evaluate, RandomPruneState, RandomStep,
};
pub use runner::{run_pruning, IterationStrategy, PruningRun};
pub use stage::PruningStage;
