//! Random-baseline pruning.
//!
//! Removes uniformly random units as a control condition. Removals
//! accumulate across steps: each step draws only from units that are still
//! present, so successive draws are disjoint.

use ndarray::{Array2, Axis, Zip};
use rand::seq::index;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::PruningConfig;
use crate::error::{PruneError, Result};
use crate::history::RunDataItem;
use crate::model::{ModelDims, PrunableModel};
use crate::select::selection_count;

use super::orchestrator::evaluate;

/// Cumulative removal masks for the random baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomPruneState {
    /// `(n_layers, d_mlp)`, `true` = removed.
    pub ff: Array2<bool>,
    /// `(n_layers, n_heads * d_head)`, `true` = removed.
    pub attn: Array2<bool>,
    pub ff_exhausted: bool,
    pub attn_exhausted: bool,
}

impl RandomPruneState {
    pub fn new(dims: ModelDims) -> Self {
        Self {
            ff: Array2::from_elem((dims.n_layers, dims.d_mlp), false),
            attn: Array2::from_elem((dims.n_layers, dims.attn_units()), false),
            ff_exhausted: false,
            attn_exhausted: false,
        }
    }
}

/// Units removed by one random step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomStep {
    pub ff_removed: usize,
    pub attn_removed: usize,
}

/// Draw `floor(frac * units_per_layer)` fresh units per layer from the
/// unpruned entries of `pruned`.
///
/// Returns only the newly drawn units. Every layer is checked before any
/// drawing, so on [`PruneError::InsufficientCandidates`] nothing was drawn.
pub fn draw_random_units<R>(pruned: &Array2<bool>, frac: f32, rng: &mut R) -> Result<Array2<bool>>
where
    R: Rng + ?Sized,
{
    let (n_layers, n_units) = pruned.dim();
    let requested = selection_count(frac, n_units);

    let candidates: Vec<Vec<usize>> = pruned
        .axis_iter(Axis(0))
        .map(|row| row.iter().enumerate().filter_map(|(u, &p)| (!p).then_some(u)).collect())
        .collect();
    if let Some((layer, available)) = candidates
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, available)| available < requested)
    {
        return Err(PruneError::InsufficientCandidates { layer, requested, available });
    }

    let mut drawn = Array2::from_elem((n_layers, n_units), false);
    for (layer, free) in candidates.iter().enumerate() {
        for i in index::sample(rng, free.len(), requested) {
            drawn[[layer, free[i]]] = true;
        }
    }
    Ok(drawn)
}

/// Apply one random step to `model`, updating `state`.
///
/// A group that runs out of candidates is marked exhausted and skipped from
/// then on; this is logged, not returned as an error.
pub fn prune_random<M>(
    model: &mut M,
    config: &PruningConfig,
    state: &mut RandomPruneState,
    rng: &mut dyn RngCore,
) -> Result<RandomStep>
where
    M: PrunableModel + ?Sized,
{
    let mut step = RandomStep::default();

    if config.does_ff() && !state.ff_exhausted {
        if let Some(n) = extend(&mut state.ff, &mut state.ff_exhausted, config.ff_frac(), "ff", rng)? {
            model
                .delete_ff(&state.ff, None)
                .map_err(PruneError::model("delete_ff"))?;
            step.ff_removed = n;
        }
    }

    if config.does_attn() && !state.attn_exhausted {
        if let Some(n) = extend(&mut state.attn, &mut state.attn_exhausted, config.attn_frac(), "attn", rng)? {
            model
                .delete_attn(config.attn_mode(), &state.attn, None)
                .map_err(PruneError::model("delete_attn"))?;
            step.attn_removed = n;
        }
    }

    tracing::info!(
        ff_removed = step.ff_removed,
        attn_removed = step.attn_removed,
        ff_exhausted = state.ff_exhausted,
        attn_exhausted = state.attn_exhausted,
        "random pruning step"
    );
    Ok(step)
}

/// Draw into `mask`; `None` when the group just ran out of candidates.
fn extend(
    mask: &mut Array2<bool>,
    exhausted: &mut bool,
    frac: f32,
    group: &'static str,
    rng: &mut dyn RngCore,
) -> Result<Option<usize>> {
    match draw_random_units(mask, frac, rng) {
        Ok(drawn) => {
            let n = drawn.iter().filter(|&&d| d).count();
            Zip::from(&mut *mask).and(&drawn).for_each(|m, &d| *m |= d);
            Ok(Some(n))
        }
        Err(PruneError::InsufficientCandidates { layer, requested, available }) => {
            tracing::warn!(
                group,
                layer,
                requested,
                available,
                "random baseline exhausted, no further pruning of this group"
            );
            *exhausted = true;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Random step followed by evaluation.
pub fn prune_random_and_evaluate<M>(
    model: &mut M,
    config: &PruningConfig,
    state: &mut RandomPruneState,
    rng: &mut dyn RngCore,
) -> Result<RunDataItem>
where
    M: PrunableModel + ?Sized,
{
    let step = prune_random(model, config, state, rng)?;

    let mut item = RunDataItem::new();
    item.record_random(step.ff_removed, step.attn_removed, &state.ff, &state.attn);
    item.ff_exhausted = state.ff_exhausted;
    item.attn_exhausted = state.attn_exhausted;
    item.merge_metrics(evaluate(model, config)?);
    Ok(item)
}
