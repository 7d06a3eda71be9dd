//! Soft-mask initialization.
//!
//! For models with continuous (trainable) masks, unit scores are turned into
//! starting logits: units important to the focus data start high, units
//! important to the cripple data start low.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::ActivationSummary;
use crate::config::PruningConfig;
use crate::error::{PruneError, Result};
use crate::model::{MaskTarget, PrunableModel};
use crate::scoring::score_units;

/// Z-score every layer independently. Layers with zero variance map to 0.
///
/// Moments are taken in `f64`, so saturated scores (silent units) still
/// normalize to finite values.
pub fn normalize_scores(scores: &Array2<f32>) -> Array2<f32> {
    let mut out = scores.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let n = row.len() as f64;
        if n == 0.0 {
            continue;
        }
        let mean = row.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
        let var = row.iter().map(|&x| (f64::from(x) - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        if std > 0.0 && std.is_finite() {
            row.mapv_inplace(|x| ((f64::from(x) - mean) / std) as f32);
        } else {
            row.fill(0.0);
        }
    }
    out
}

/// Starting logits: `sigmoid_offset - z` where `z` are the per-layer
/// normalized scores.
pub fn initial_mask_logits(scores: &Array2<f32>, sigmoid_offset: f32) -> Array2<f32> {
    normalize_scores(scores).mapv(|z| sigmoid_offset - z)
}

/// Score both groups and push initial logits into the model, one layer at a
/// time. Returns the feed-forward and attention logits that were set.
pub fn initialize_soft_masks<M>(
    model: &mut M,
    config: &PruningConfig,
    focus: &ActivationSummary,
    cripple: &ActivationSummary,
    sigmoid_offset: f32,
) -> Result<(Array2<f32>, Array2<f32>)>
where
    M: PrunableModel + ?Sized,
{
    let key = config.scoring_normalization();
    let mut rng = StdRng::seed_from_u64(config.seed());

    let ff_scores = score_units(
        &config.ff_scoring(),
        focus.ff.get(key)?,
        cripple.ff.get(key)?,
        config.ff_eps(),
        &mut rng,
    )?;
    let attn_scores = score_units(
        &config.attn_scoring(),
        focus.attn.get(key)?,
        cripple.attn.get(key)?,
        config.attn_eps(),
        &mut rng,
    )?;

    // high scores mean keep, so negate before `sigmoid_offset - z`
    let ff_logits = initial_mask_logits(&ff_scores.mapv(|s| -s), sigmoid_offset);
    let attn_logits = initial_mask_logits(&attn_scores.mapv(|s| -s), sigmoid_offset);

    for (target, logits) in [(MaskTarget::MlpPreOut, &ff_logits), (MaskTarget::AttnPreOut, &attn_logits)] {
        for (layer, row) in logits.axis_iter(Axis(0)).enumerate() {
            model
                .set_soft_mask(target, layer, &row.to_owned())
                .map_err(PruneError::model("set_soft_mask"))?;
        }
    }

    tracing::info!(sigmoid_offset, "initialized soft masks");
    Ok((ff_logits, attn_logits))
}
