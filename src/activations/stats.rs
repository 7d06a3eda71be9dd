//! Per-unit activation statistics.

use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PruneError, Result};

/// Aggregate statistics for one unit group, `(n_layers, n_units)` each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationStats {
    mean: Array2<f32>,
    std: Array2<f32>,
    abs_mean: Array2<f32>,
    sqrt_mean: Array2<f32>,
    rms: Array2<f32>,
    pos_frac: Array2<f32>,
}

impl ActivationStats {
    /// Compute statistics from raw samples `(n_layers, n_units, n_obs)`.
    pub fn from_samples(samples: ArrayView3<'_, f32>) -> Result<Self> {
        let (n_layers, n_units, n_obs) = samples.dim();
        if n_obs == 0 {
            return Err(PruneError::EmptySamples);
        }
        let mut acc = StatsAccumulator::new(n_layers, n_units);
        for obs in samples.axis_iter(Axis(2)) {
            acc.record(obs)?;
        }
        acc.finish()
    }

    /// Statistics where only the mean is known; the other views are derived
    /// from it as if every observation equalled the mean.
    pub fn from_mean(mean: Array2<f32>) -> Self {
        let abs_mean = mean.mapv(f32::abs);
        Self {
            std: Array2::zeros(mean.raw_dim()),
            sqrt_mean: abs_mean.mapv(f32::sqrt),
            rms: abs_mean.clone(),
            pos_frac: mean.mapv(|m| if m > 0.0 { 1.0 } else { 0.0 }),
            abs_mean,
            mean,
        }
    }

    pub fn mean(&self) -> &Array2<f32> {
        &self.mean
    }

    /// Population standard deviation.
    pub fn std(&self) -> &Array2<f32> {
        &self.std
    }

    /// Mean of `|x|`.
    pub fn abs_mean(&self) -> &Array2<f32> {
        &self.abs_mean
    }

    /// Mean of `sqrt(|x|)`.
    pub fn sqrt_mean(&self) -> &Array2<f32> {
        &self.sqrt_mean
    }

    /// Root mean square.
    pub fn rms(&self) -> &Array2<f32> {
        &self.rms
    }

    /// Fraction of observations strictly above zero.
    pub fn pos_frac(&self) -> &Array2<f32> {
        &self.pos_frac
    }

    /// `(n_layers, n_units)`.
    pub fn dim(&self) -> (usize, usize) {
        self.mean.dim()
    }
}

/// Streaming accumulator for [`ActivationStats`].
///
/// Collaborators feed one `(n_layers, n_units)` activation slice per token
/// and call [`finish`](Self::finish) once the sample budget is spent.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    sum: Array2<f64>,
    sq_sum: Array2<f64>,
    abs_sum: Array2<f64>,
    sqrt_sum: Array2<f64>,
    pos_count: Array2<f64>,
    count: usize,
}

impl StatsAccumulator {
    pub fn new(n_layers: usize, n_units: usize) -> Self {
        let zeros = Array2::<f64>::zeros((n_layers, n_units));
        Self {
            sum: zeros.clone(),
            sq_sum: zeros.clone(),
            abs_sum: zeros.clone(),
            sqrt_sum: zeros.clone(),
            pos_count: zeros,
            count: 0,
        }
    }

    /// Record one observation per unit.
    pub fn record(&mut self, activations: ArrayView2<'_, f32>) -> Result<()> {
        if activations.dim() != self.sum.dim() {
            let (l, u) = self.sum.dim();
            let (gl, gu) = activations.dim();
            return Err(PruneError::ShapeMismatch {
                context: "activation record",
                expected: vec![l, u],
                got: vec![gl, gu],
            });
        }

        ndarray::Zip::from(&mut self.sum)
            .and(&mut self.sq_sum)
            .and(&mut self.abs_sum)
            .and(&mut self.sqrt_sum)
            .and(&mut self.pos_count)
            .and(&activations)
            .for_each(|sum, sq, abs, sqrt, pos, &x| {
                let x = f64::from(x);
                *sum += x;
                *sq += x * x;
                *abs += x.abs();
                *sqrt += x.abs().sqrt();
                if x > 0.0 {
                    *pos += 1.0;
                }
            });
        self.count += 1;
        Ok(())
    }

    /// Number of observations recorded.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Finalize into statistics. Fails if nothing was recorded.
    pub fn finish(&self) -> Result<ActivationStats> {
        if self.count == 0 {
            return Err(PruneError::EmptySamples);
        }
        let n = self.count as f64;
        let mean = self.sum.mapv(|s| s / n);
        let mean_sq = self.sq_sum.mapv(|s| s / n);
        let var = (&mean_sq - &mean.mapv(|m| m * m)).mapv(|v| v.max(0.0));

        Ok(ActivationStats {
            mean: mean.mapv(|v| v as f32),
            std: var.mapv(|v| v.sqrt() as f32),
            abs_mean: self.abs_sum.mapv(|s| (s / n) as f32),
            sqrt_mean: self.sqrt_sum.mapv(|s| (s / n) as f32),
            rms: mean_sq.mapv(|v| v.sqrt() as f32),
            pos_frac: self.pos_count.mapv(|c| (c / n) as f32),
        })
    }

    /// Clear all recorded observations.
    pub fn reset(&mut self) {
        self.sum.fill(0.0);
        self.sq_sum.fill(0.0);
        self.abs_sum.fill(0.0);
        self.sqrt_sum.fill(0.0);
        self.pos_count.fill(0.0);
        self.count = 0;
    }
}
