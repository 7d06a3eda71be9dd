//! Peak estimation on histogram edges shared across the whole tensor.
//!
//! Pass 1 computes the global min/max over every layer and unit. Pass 2
//! builds a histogram per layer and per unit on those shared edges, so bins
//! line up across units and layers. Each unit's own peak is returned; the
//! layer histograms are kept for callers that want to compare against them.

use ndarray::{Array2, ArrayView3, Axis};
use num_traits::Float;
use rayon::prelude::*;

use super::histogram::{min_max, Histogram};
use super::{cast_back, per_unit};

/// Output of [`estimate`].
#[derive(Debug, Clone)]
pub struct LayerPriorPeaks<T> {
    /// Per-unit peak centers, `(n_layers, n_units)`.
    pub peaks: Array2<T>,
    /// One histogram per layer over all of that layer's observations.
    pub layer_histograms: Vec<Histogram>,
    pub global_min: f64,
    pub global_max: f64,
}

/// Run both passes over a `(n_layers, n_units, n_obs)` tensor.
pub fn estimate<T>(samples: ArrayView3<'_, T>, bins: usize) -> LayerPriorPeaks<T>
where
    T: Float + Send + Sync,
{
    let (n_layers, n_units, _) = samples.dim();

    // pass 1
    let (global_min, global_max) = samples.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), x| {
            let x = x.to_f64().unwrap_or(f64::NAN);
            (lo.min(x), hi.max(x))
        },
    );

    if global_min == global_max {
        return LayerPriorPeaks {
            peaks: Array2::from_elem((n_layers, n_units), cast_back(global_min)),
            layer_histograms: (0..n_layers)
                .map(|_| Histogram::from_counts(vec![0.0; bins], global_min, global_max))
                .collect(),
            global_min,
            global_max,
        };
    }

    // pass 2
    let layer_histograms: Vec<Histogram> = (0..n_layers)
        .into_par_iter()
        .map(|layer| {
            let values: Vec<f64> = samples
                .index_axis(Axis(0), layer)
                .iter()
                .map(|x| x.to_f64().unwrap_or(f64::NAN))
                .collect();
            Histogram::build(&values, bins, global_min, global_max)
        })
        .collect();

    // a constant unit keeps its own value, not the center of its shared bin
    let peaks = per_unit(samples, |values| match min_max(values) {
        (lo, hi) if lo == hi => lo,
        _ => Histogram::build(values, bins, global_min, global_max).peak_center(),
    });

    LayerPriorPeaks {
        peaks,
        layer_histograms,
        global_min,
        global_max,
    }
}
