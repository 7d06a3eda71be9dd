//! The model capability the pruning pipeline drives.
//!
//! Loading weights, tokenizing, running forward passes and storing masks are
//! all owned by the implementor. The pipeline only needs the handful of
//! operations below and mutates the model in place through `&mut self`.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::activations::ActivationSummary;
use crate::config::AttnMode;
use crate::error::ModelError;

/// Evaluation results keyed by metric name, e.g. `"pile.loss"`.
pub type EvalMetrics = BTreeMap<String, f64>;

/// Shape of the prunable parts of a transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDims {
    pub n_layers: usize,
    pub d_model: usize,
    pub d_mlp: usize,
    pub n_heads: usize,
    pub d_head: usize,
}

impl ModelDims {
    /// Attention units per layer, `n_heads * d_head`.
    pub fn attn_units(&self) -> usize {
        self.n_heads * self.d_head
    }
}

/// Mask-offset stores a model exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskTarget {
    /// Attention neurons before the output projection.
    AttnPreOut,
    /// Feed-forward neurons before the down projection.
    MlpPreOut,
}

/// Operations the pruning pipeline needs from a live model.
///
/// Criteria tensors are `(n_layers, n_units)` with `true` meaning "remove".
/// Removal is cumulative: a unit deleted once stays deleted.
pub trait PrunableModel {
    fn dims(&self) -> ModelDims;

    /// Run `sample_size` tokens of `dataset` through the model and summarize
    /// the activations. Raw attention samples are included only when
    /// `collect_raw_attention` is set.
    fn collect_activations(
        &mut self,
        dataset: &str,
        sample_size: usize,
        attn_mode: AttnMode,
        collect_raw_attention: bool,
    ) -> Result<ActivationSummary, ModelError>;

    /// Mask feed-forward neurons. Removed neurons output `offsets` when
    /// given, zero otherwise.
    fn delete_ff(
        &mut self,
        criteria: &Array2<bool>,
        offsets: Option<&Array2<f32>>,
    ) -> Result<(), ModelError>;

    /// Mask attention units of the given kind.
    fn delete_attn(
        &mut self,
        attn_mode: AttnMode,
        criteria: &Array2<bool>,
        offsets: Option<&Array2<f32>>,
    ) -> Result<(), ModelError>;

    /// Replace the baseline values of a mask-offset store.
    fn update_mask_offset(
        &mut self,
        target: MaskTarget,
        offsets: &Array2<f32>,
    ) -> Result<(), ModelError>;

    /// Evaluate on each dataset, skipping the first `tokens_to_skip` tokens
    /// of every sequence.
    fn evaluate(
        &mut self,
        sample_size: usize,
        datasets: &[String],
        tokens_to_skip: usize,
    ) -> Result<EvalMetrics, ModelError>;

    /// Set continuous mask logits for one layer.
    ///
    /// Only models with trainable soft masks support this.
    fn set_soft_mask(
        &mut self,
        target: MaskTarget,
        layer: usize,
        values: &Array1<f32>,
    ) -> Result<(), ModelError> {
        let _ = (layer, values);
        Err(format!("soft masks are not supported for {target:?}").into())
    }
}
