//! Head-granularity attention selection.
//!
//! Attention units are laid out head-major, `n_heads * d_head` per layer.
//! Scores are reduced to one value per head, heads are selected, and the
//! head decision is broadcast back to every unit of the head.

use ndarray::{Array2, ArrayView2};

use super::top_frac::{top_fraction, top_fraction_per_layer, Selection};
use crate::config::{HeadReduction, HeadSelection};
use crate::error::{PruneError, Result};
use crate::scoring::RankOrder;

/// Reduce `(n_layers, n_heads * d_head)` unit scores to `(n_layers, n_heads)`.
pub fn head_scores(
    scores: ArrayView2<'_, f32>,
    n_heads: usize,
    d_head: usize,
    reduction: HeadReduction,
) -> Result<Array2<f32>> {
    let (n_layers, n_units) = scores.dim();
    if n_units != n_heads * d_head || d_head == 0 {
        return Err(PruneError::ShapeMismatch {
            context: "attention head scores",
            expected: vec![n_layers, n_heads * d_head],
            got: vec![n_layers, n_units],
        });
    }

    Ok(Array2::from_shape_fn((n_layers, n_heads), |(layer, head)| {
        let start = head * d_head;
        let mut values: Vec<f32> = (start..start + d_head).map(|u| scores[[layer, u]]).collect();
        reduce(&mut values, reduction)
    }))
}

fn reduce(values: &mut [f32], reduction: HeadReduction) -> f32 {
    match reduction {
        HeadReduction::Mean => {
            // f64 so saturated scores average to f32::MAX instead of inf
            let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
            mean.clamp(f64::from(f32::MIN), f64::from(f32::MAX)) as f32
        }
        HeadReduction::Max => values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        HeadReduction::Min => values.iter().copied().fold(f32::INFINITY, f32::min),
        HeadReduction::Median => {
            // lower median for even sizes
            values.sort_by(f32::total_cmp);
            values[(values.len() - 1) / 2]
        }
    }
}

/// Broadcast `(n_layers, n_heads)` head criteria to `(n_layers, n_heads * d_head)`.
pub fn expand_heads(head_criteria: ArrayView2<'_, bool>, d_head: usize) -> Array2<bool> {
    let (n_layers, n_heads) = head_criteria.dim();
    Array2::from_shape_fn((n_layers, n_heads * d_head), |(layer, unit)| {
        head_criteria[[layer, unit / d_head]]
    })
}

/// Reduce, select and expand in one step.
///
/// `frac` is a fraction of heads. The returned threshold is on the reduced
/// head scores; the criteria are at unit granularity.
pub fn select_heads(
    scores: ArrayView2<'_, f32>,
    n_heads: usize,
    d_head: usize,
    reduction: HeadReduction,
    selection: HeadSelection,
    frac: f32,
    order: RankOrder,
) -> Result<Selection> {
    let per_head = head_scores(scores, n_heads, d_head, reduction)?;
    let heads = match selection {
        HeadSelection::Global => top_fraction(per_head.view(), frac, order)?,
        HeadSelection::PerLayer => top_fraction_per_layer(per_head.view(), frac, order)?,
    };

    tracing::debug!(
        heads_removed = heads.count(),
        ?selection,
        ?reduction,
        "selected attention heads"
    );

    Ok(Selection {
        criteria: expand_heads(heads.criteria.view(), d_head),
        threshold: heads.threshold,
    })
}
