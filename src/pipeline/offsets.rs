//! Attention mask offsets.
//!
//! Removed attention units are pinned to a per-unit baseline instead of zero.
//! The baseline is computed once per run from the focus dataset.

use ndarray::Array2;

use crate::activations::ActivationSummary;
use crate::config::{OffsetMode, PruningConfig};
use crate::error::{PruneError, Result};
use crate::model::{MaskTarget, ModelDims, PrunableModel};
use crate::peaks::estimate_peaks;

/// Compute attention offsets `(n_layers, n_heads * d_head)` for `mode`.
///
/// `zero` yields `None`. `mean` uses the focus attention mean view. `peak`
/// runs the configured peak estimator over the raw focus attention samples.
pub fn attn_offsets(
    config: &PruningConfig,
    dims: ModelDims,
    focus: &ActivationSummary,
) -> Result<Option<Array2<f32>>> {
    let offsets = match config.attn_offset_mode() {
        OffsetMode::Zero => return Ok(None),
        OffsetMode::Mean => focus.attn_mean()?.clone(),
        OffsetMode::Peak => {
            let raw = focus
                .raw_attn
                .as_ref()
                .ok_or_else(|| PruneError::MissingRawActivations("peak".to_string()))?;
            estimate_peaks(raw.by_unit().view(), config.peak_mode())?
        }
    };

    let expected = (dims.n_layers, dims.attn_units());
    if offsets.dim() != expected {
        return Err(PruneError::ShapeMismatch {
            context: "attention offsets",
            expected: vec![expected.0, expected.1],
            got: offsets.shape().to_vec(),
        });
    }

    tracing::info!(
        mode = ?config.attn_offset_mode(),
        peak_mode = config.peak_mode().name(),
        "computed attention offsets"
    );
    Ok(Some(offsets))
}

/// Compute offsets and push them into the model's attention offset store.
pub fn apply_attn_offsets<M>(model: &mut M, config: &PruningConfig, focus: &ActivationSummary) -> Result<()>
where
    M: PrunableModel + ?Sized,
{
    if let Some(offsets) = attn_offsets(config, model.dims(), focus)? {
        model
            .update_mask_offset(MaskTarget::AttnPreOut, &offsets)
            .map_err(PruneError::model("update_mask_offset"))?;
    }
    Ok(())
}
