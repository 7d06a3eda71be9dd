//! One row of pruning history.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::model::EvalMetrics;
use crate::select::Selection;

/// Thresholds and total removal counts for one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deletions {
    pub ff_threshold: f32,
    pub attn_threshold: f32,
    pub ff_del: f64,
    pub attn_del: f64,
}

/// Units removed in each layer; empty when a group was not pruned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionsPerLayer {
    pub ff: Vec<usize>,
    pub attn: Vec<usize>,
}

/// Scores and criteria kept for later analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTensors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ff_scores: Option<Array2<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attn_scores: Option<Array2<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ff_criteria: Option<Array2<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attn_criteria: Option<Array2<bool>>,
}

impl RawTensors {
    pub fn is_empty(&self) -> bool {
        self.ff_scores.is_none()
            && self.attn_scores.is_none()
            && self.ff_criteria.is_none()
            && self.attn_criteria.is_none()
    }
}

/// Result of one pruning iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDataItem {
    pub deletions: Deletions,
    pub deletions_per_layer: DeletionsPerLayer,
    #[serde(default, skip_serializing_if = "RawTensors::is_empty")]
    pub raw: RawTensors,
    pub metrics: EvalMetrics,
    /// Random baseline only: no unpruned feed-forward units were left.
    #[serde(default)]
    pub ff_exhausted: bool,
    #[serde(default)]
    pub attn_exhausted: bool,
}

impl RunDataItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the feed-forward selection and the scores it was made from.
    pub fn record_ff(&mut self, scores: Option<Array2<f32>>, selection: &Selection) {
        self.deletions.ff_threshold = selection.threshold;
        self.deletions.ff_del = selection.count() as f64;
        self.deletions_per_layer.ff = selection.per_layer();
        self.raw.ff_scores = scores;
        self.raw.ff_criteria = Some(selection.criteria.clone());
    }

    /// Record the attention selection and the scores it was made from.
    pub fn record_attn(&mut self, scores: Option<Array2<f32>>, selection: &Selection) {
        self.deletions.attn_threshold = selection.threshold;
        self.deletions.attn_del = selection.count() as f64;
        self.deletions_per_layer.attn = selection.per_layer();
        self.raw.attn_scores = scores;
        self.raw.attn_criteria = Some(selection.criteria.clone());
    }

    /// Record one random-baseline step: `ff_del`/`attn_del` count the units
    /// removed by this step, per-layer counts are cumulative.
    pub fn record_random(
        &mut self,
        ff_new: usize,
        attn_new: usize,
        ff_total: &Array2<bool>,
        attn_total: &Array2<bool>,
    ) {
        self.deletions.ff_del = ff_new as f64;
        self.deletions.attn_del = attn_new as f64;
        self.deletions_per_layer.ff = per_layer(ff_total);
        self.deletions_per_layer.attn = per_layer(attn_total);
    }

    /// Merge evaluation metrics into the row, replacing existing keys.
    pub fn merge_metrics(&mut self, metrics: EvalMetrics) {
        self.metrics.extend(metrics);
    }
}

fn per_layer(mask: &Array2<bool>) -> Vec<usize> {
    mask.axis_iter(Axis(0))
        .map(|row| row.iter().filter(|&&m| m).count())
        .collect()
}
