//! Fraction-based removal masks.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PruneError, Result};
use crate::scoring::{ensure_finite, RankOrder};

/// Guards `frac * n` against representation error, e.g. `0.3 * 10 = 2.9999998`.
const COUNT_EPSILON: f64 = 1e-6;

/// A removal mask and the score at which it was cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// `true` = remove.
    pub criteria: Array2<bool>,
    /// Score of the last unit selected, 0 when nothing is selected.
    pub threshold: f32,
}

impl Selection {
    pub fn empty(dim: (usize, usize)) -> Self {
        Self { criteria: Array2::from_elem(dim, false), threshold: 0.0 }
    }

    /// Total number of units removed.
    pub fn count(&self) -> usize {
        self.criteria.iter().filter(|&&c| c).count()
    }

    /// Units removed in each layer.
    pub fn per_layer(&self) -> Vec<usize> {
        self.criteria
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|&&c| c).count())
            .collect()
    }
}

/// Number of units selected for `frac` of `n`.
pub fn selection_count(frac: f32, n: usize) -> usize {
    if frac <= 0.0 {
        return 0;
    }
    if frac >= 1.0 {
        return n;
    }
    ((f64::from(frac) * n as f64 + COUNT_EPSILON).floor() as usize).min(n)
}

fn check_fraction(frac: f32) -> Result<()> {
    if frac.is_nan() || !(0.0..=1.0).contains(&frac) {
        return Err(PruneError::InvalidFraction { value: frac });
    }
    Ok(())
}

/// Indices of `scores` in removal order; ties keep index order.
fn removal_order(scores: &[f32], order: RankOrder) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..scores.len()).collect();
    match order {
        RankOrder::Ascending => idx.sort_by(|&a, &b| scores[a].total_cmp(&scores[b])),
        RankOrder::Descending => idx.sort_by(|&a, &b| scores[b].total_cmp(&scores[a])),
    }
    idx
}

/// Select `frac` of all units across every layer.
///
/// Ranking is global, so layers can lose different numbers of units. Ties
/// are broken by row-major position, so the mask for a larger fraction is
/// always a superset of the mask for a smaller one.
pub fn top_fraction(scores: ArrayView2<'_, f32>, frac: f32, order: RankOrder) -> Result<Selection> {
    check_fraction(frac)?;
    ensure_finite(&scores)?;

    let dim = scores.dim();
    let n = selection_count(frac, scores.len());
    if n == 0 {
        return Ok(Selection::empty(dim));
    }

    // row-major regardless of memory layout
    let flat: Vec<f32> = scores.iter().copied().collect();
    let ranked = removal_order(&flat, order);

    let mut criteria = Array2::from_elem(dim, false);
    for &i in &ranked[..n] {
        criteria[[i / dim.1, i % dim.1]] = true;
    }
    let threshold = flat[ranked[n - 1]];
    Ok(Selection { criteria, threshold })
}

/// Select `frac` of the units of each layer independently.
///
/// Every layer loses exactly `floor(frac * n_units)` units. The threshold is
/// the most extreme per-layer cut, i.e. the largest for ascending order.
pub fn top_fraction_per_layer(
    scores: ArrayView2<'_, f32>,
    frac: f32,
    order: RankOrder,
) -> Result<Selection> {
    check_fraction(frac)?;
    ensure_finite(&scores)?;

    let dim = scores.dim();
    let n = selection_count(frac, dim.1);
    if n == 0 {
        return Ok(Selection::empty(dim));
    }

    let mut criteria = Array2::from_elem(dim, false);
    let mut threshold: Option<f32> = None;
    for (layer, row) in scores.axis_iter(Axis(0)).enumerate() {
        let row = row.to_vec();
        let ranked = removal_order(&row, order);
        for &u in &ranked[..n] {
            criteria[[layer, u]] = true;
        }
        let cut = row[ranked[n - 1]];
        threshold = Some(match (threshold, order) {
            (None, _) => cut,
            (Some(t), RankOrder::Ascending) => t.max(cut),
            (Some(t), RankOrder::Descending) => t.min(cut),
        });
    }
    Ok(Selection { criteria, threshold: threshold.unwrap_or(0.0) })
}
