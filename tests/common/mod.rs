//! Shared toy model for integration tests.

#![allow(dead_code)]

use ndarray::{Array1, Array2, Array4, Zip};
use podar::activations::{
    ActivationSummary, GroupActivations, RawAttention, StatsAccumulator, UnitGroup,
};
use podar::{AttnMode, EvalMetrics, MaskTarget, ModelDims, ModelError, PrunableModel};

pub const DIMS: ModelDims = ModelDims { n_layers: 2, d_model: 8, d_mlp: 8, n_heads: 2, d_head: 4 };

pub const FOCUS: &str = "pile";
pub const CRIPPLE: &str = "code";

/// Deterministic two-layer model whose activations are synthesized from
/// per-dataset unit profiles.
///
/// Feed-forward unit `u` is `u + 1` times busier on the focus data than on
/// the cripple data, identically in every layer. Attention head 0 is equally
/// busy on both datasets, head 1 is three times busier on the focus data.
#[derive(Debug, Clone)]
pub struct ToyModel {
    pub ff_mask: Array2<bool>,
    pub attn_mask: Array2<bool>,
    pub attn_offsets: Array2<f32>,
    pub soft_masks: Vec<(MaskTarget, usize, Array1<f32>)>,
    pub mutations: usize,
    pub collections: Vec<(String, bool)>,
    pub eval_datasets: Vec<Vec<String>>,
}

impl Default for ToyModel {
    fn default() -> Self {
        Self {
            ff_mask: Array2::from_elem((DIMS.n_layers, DIMS.d_mlp), false),
            attn_mask: Array2::from_elem((DIMS.n_layers, DIMS.attn_units()), false),
            attn_offsets: Array2::zeros((DIMS.n_layers, DIMS.attn_units())),
            soft_masks: Vec::new(),
            mutations: 0,
            collections: Vec::new(),
            eval_datasets: Vec::new(),
        }
    }
}

impl ToyModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn ff_profile(dataset: &str, unit: usize) -> f32 {
        if dataset == FOCUS {
            (unit + 1) as f32
        } else {
            1.0
        }
    }

    fn attn_profile(dataset: &str, unit: usize) -> f32 {
        let head = unit / DIMS.d_head;
        if dataset == FOCUS && head == 1 {
            3.0
        } else {
            1.0
        }
    }

    /// Token-dependent gain in `[0.5, 1.5]`.
    fn wave(token: usize) -> f32 {
        1.0 + 0.5 * (token as f32 * 0.7).sin()
    }

    pub fn ff_removed(&self) -> usize {
        self.ff_mask.iter().filter(|&&m| m).count()
    }

    fn mutate(&mut self) {
        self.mutations += 1;
    }
}

impl PrunableModel for ToyModel {
    fn dims(&self) -> ModelDims {
        DIMS
    }

    fn collect_activations(
        &mut self,
        dataset: &str,
        sample_size: usize,
        _attn_mode: AttnMode,
        collect_raw_attention: bool,
    ) -> Result<ActivationSummary, ModelError> {
        self.collections.push((dataset.to_string(), collect_raw_attention));
        let (n_layers, d_mlp, n_attn) = (DIMS.n_layers, DIMS.d_mlp, DIMS.attn_units());

        let mut ff_acc = StatsAccumulator::new(n_layers, d_mlp);
        let mut attn_acc = StatsAccumulator::new(n_layers, n_attn);
        let mut raw = collect_raw_attention
            .then(|| Array4::<f32>::zeros((sample_size, n_layers, DIMS.n_heads, DIMS.d_head)));

        for token in 0..sample_size {
            let gain = Self::wave(token);
            let ff = Array2::from_shape_fn((n_layers, d_mlp), |(l, u)| {
                if self.ff_mask[[l, u]] {
                    0.0
                } else {
                    Self::ff_profile(dataset, u) * gain
                }
            });
            let attn = Array2::from_shape_fn((n_layers, n_attn), |(l, u)| {
                if self.attn_mask[[l, u]] {
                    self.attn_offsets[[l, u]]
                } else {
                    Self::attn_profile(dataset, u) * gain
                }
            });
            ff_acc.record(ff.view())?;
            attn_acc.record(attn.view())?;
            if let Some(raw) = raw.as_mut() {
                for ((l, u), &v) in attn.indexed_iter() {
                    raw[[token, l, u / DIMS.d_head, u % DIMS.d_head]] = v;
                }
            }
        }

        let ff_stats = ff_acc.finish()?;
        let attn_stats = attn_acc.finish()?;
        let mut summary = ActivationSummary::new(
            GroupActivations::new(UnitGroup::Ff).with_view("mean", ff_stats),
            GroupActivations::new(UnitGroup::Attn)
                .with_view("mean", attn_stats.clone())
                .with_view("orig", attn_stats),
        );
        if let Some(raw) = raw {
            summary = summary.with_raw_attn(RawAttention::new(raw));
        }
        Ok(summary)
    }

    fn delete_ff(&mut self, criteria: &Array2<bool>, _offsets: Option<&Array2<f32>>) -> Result<(), ModelError> {
        if criteria.dim() != self.ff_mask.dim() {
            return Err(format!("ff criteria shape {:?}", criteria.dim()).into());
        }
        self.mutate();
        Zip::from(&mut self.ff_mask).and(criteria).for_each(|m, &c| *m |= c);
        Ok(())
    }

    fn delete_attn(
        &mut self,
        _attn_mode: AttnMode,
        criteria: &Array2<bool>,
        offsets: Option<&Array2<f32>>,
    ) -> Result<(), ModelError> {
        if criteria.dim() != self.attn_mask.dim() {
            return Err(format!("attn criteria shape {:?}", criteria.dim()).into());
        }
        self.mutate();
        Zip::from(&mut self.attn_mask).and(criteria).for_each(|m, &c| *m |= c);
        if let Some(offsets) = offsets {
            self.attn_offsets.assign(offsets);
        }
        Ok(())
    }

    fn update_mask_offset(&mut self, target: MaskTarget, offsets: &Array2<f32>) -> Result<(), ModelError> {
        if target != MaskTarget::AttnPreOut {
            return Err(format!("no offset store for {target:?}").into());
        }
        self.mutate();
        self.attn_offsets.assign(offsets);
        Ok(())
    }

    fn evaluate(
        &mut self,
        _sample_size: usize,
        datasets: &[String],
        _tokens_to_skip: usize,
    ) -> Result<EvalMetrics, ModelError> {
        self.eval_datasets.push(datasets.to_vec());
        let mut metrics = EvalMetrics::new();
        for ds in datasets {
            let lost: f32 = self
                .ff_mask
                .indexed_iter()
                .filter(|(_, &m)| m)
                .map(|((_, u), _)| Self::ff_profile(ds, u))
                .sum();
            metrics.insert(format!("{ds}.loss"), 2.0 + f64::from(lost) / 10.0);
        }
        Ok(metrics)
    }

    fn set_soft_mask(&mut self, target: MaskTarget, layer: usize, values: &Array1<f32>) -> Result<(), ModelError> {
        self.soft_masks.push((target, layer, values.clone()));
        Ok(())
    }
}
