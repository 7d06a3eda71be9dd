//! Unit scoring
//!
//! Combines focus and cripple activation statistics into one score per unit.
//! Scores are `(n_layers, n_units)` and must be finite; each scoring function
//! says which end of the ranking is pruned first.

mod method;


use ndarray::{Array2, ArrayBase, Data, Ix2};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::activations::ActivationStats;
use crate::error::{PruneError, Result};

pub use method::{ratio, ScoringMethod, SILENT_SCORE};

/// Which end of a score ranking is removed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Lowest scores are removed first.
    #[default]
    Ascending,
    /// Highest scores are removed first.
    Descending,
}

/// A scoring rule over focus/cripple statistics.
pub trait ScoringFunction {
    fn name(&self) -> &'static str;

    fn rank_order(&self) -> RankOrder;

    /// Score every unit. Output has the same shape as the inputs.
    fn score(
        &self,
        focus: &ActivationStats,
        cripple: &ActivationStats,
        eps: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Array2<f32>>;
}

/// Score units with `scorer`, checking shapes and finiteness.
pub fn score_units<S>(
    scorer: &S,
    focus: &ActivationStats,
    cripple: &ActivationStats,
    eps: f32,
    rng: &mut dyn RngCore,
) -> Result<Array2<f32>>
where
    S: ScoringFunction + ?Sized,
{
    if focus.dim() != cripple.dim() {
        let (fl, fu) = focus.dim();
        let (cl, cu) = cripple.dim();
        return Err(PruneError::ShapeMismatch {
            context: "focus/cripple activations",
            expected: vec![fl, fu],
            got: vec![cl, cu],
        });
    }

    let scores = scorer.score(focus, cripple, eps, rng)?;
    if scores.dim() != focus.dim() {
        let (l, u) = focus.dim();
        let (sl, su) = scores.dim();
        return Err(PruneError::ShapeMismatch {
            context: "scores",
            expected: vec![l, u],
            got: vec![sl, su],
        });
    }
    ensure_finite(&scores)?;

    tracing::debug!(
        scorer = scorer.name(),
        n_layers = scores.nrows(),
        n_units = scores.ncols(),
        "scored units"
    );
    Ok(scores)
}

/// Fail on the first NaN or infinite score.
pub fn ensure_finite<S: Data<Elem = f32>>(scores: &ArrayBase<S, Ix2>) -> Result<()> {
    match scores.indexed_iter().find(|(_, s)| !s.is_finite()) {
        Some(((layer, unit), _)) => Err(PruneError::NonFiniteScores { layer, unit }),
        None => Ok(()),
    }
}
