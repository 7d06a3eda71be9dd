//! Activation summaries for one dataset.

use std::collections::BTreeMap;

use ndarray::{Array2, Array3, Array4};
use serde::{Deserialize, Serialize};

use super::stats::ActivationStats;
use crate::error::{PruneError, Result};

/// Which family of units a tensor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitGroup {
    /// Feed-forward (MLP) neurons.
    Ff,
    /// Attention pre-output neurons, `n_heads * d_head` per layer.
    Attn,
}

impl UnitGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitGroup::Ff => "ff",
            UnitGroup::Attn => "attn",
        }
    }
}

impl std::fmt::Display for UnitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalization-keyed statistics for one unit group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupActivations {
    group: UnitGroup,
    views: BTreeMap<String, ActivationStats>,
}

impl GroupActivations {
    pub fn new(group: UnitGroup) -> Self {
        Self { group, views: BTreeMap::new() }
    }

    /// Add or replace the view stored under `key`.
    pub fn with_view(mut self, key: impl Into<String>, stats: ActivationStats) -> Self {
        self.insert(key, stats);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, stats: ActivationStats) {
        self.views.insert(key.into(), stats);
    }

    /// Look up the view for a normalization key.
    pub fn get(&self, key: &str) -> Result<&ActivationStats> {
        self.views.get(key).ok_or_else(|| PruneError::MissingNormalization {
            group: self.group.as_str(),
            key: key.to_string(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    pub fn group(&self) -> UnitGroup {
        self.group
    }
}

/// Raw attention samples in head-major layout `(n_obs, n_layers, n_heads, d_head)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAttention {
    samples: Array4<f32>,
}

impl RawAttention {
    pub fn new(samples: Array4<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &Array4<f32> {
        &self.samples
    }

    pub fn n_obs(&self) -> usize {
        self.samples.dim().0
    }

    /// Flatten heads into units and move observations last:
    /// `(n_layers, n_heads * d_head, n_obs)`.
    pub fn by_unit(&self) -> Array3<f32> {
        let (n_obs, n_layers, n_heads, d_head) = self.samples.dim();
        Array3::from_shape_fn((n_layers, n_heads * d_head, n_obs), |(l, u, k)| {
            self.samples[[k, l, u / d_head, u % d_head]]
        })
    }
}

/// Everything collected from one dataset: feed-forward and attention
/// statistics, plus raw attention samples when requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationSummary {
    pub ff: GroupActivations,
    pub attn: GroupActivations,
    pub raw_attn: Option<RawAttention>,
}

impl ActivationSummary {
    pub fn new(ff: GroupActivations, attn: GroupActivations) -> Self {
        Self { ff, attn, raw_attn: None }
    }

    pub fn with_raw_attn(mut self, raw: RawAttention) -> Self {
        self.raw_attn = Some(raw);
        self
    }

    /// Mean attention activations, `(n_layers, n_units)`, from the `"orig"`
    /// view when present and the `"mean"` view otherwise.
    pub fn attn_mean(&self) -> Result<&Array2<f32>> {
        self.attn.get("orig").or_else(|_| self.attn.get("mean")).map(ActivationStats::mean)
    }
}
