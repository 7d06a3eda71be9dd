//! Per-unit peak and offset estimation
//!
//! Maps a sample tensor `(n_layers, n_units, n_obs)` to one representative
//! "center" per unit, `(n_layers, n_units)`. The centers are used as the
//! baseline that removed units are pinned to, so that masking a unit moves
//! it to a realistic value instead of exactly zero.
//!
//! Every estimator works in `f64` internally and casts the result back to the
//! input element type, so `f32`, `f64` and `half::f16` samples are all
//! accepted. A unit whose observations are all equal returns that value.
//! Units are independent and are processed in parallel with rayon.
//!
//! # Example
//!
//! ```
//! use ndarray::Array3;
//! use podar::peaks::{estimate_peaks, PeakMode};
//!
//! let samples = Array3::from_shape_vec((1, 1, 5), vec![1.0f32, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! let offsets = estimate_peaks(samples.view(), &PeakMode::Mean).unwrap();
//! assert_eq!(offsets[[0, 0]], 3.0);
//! ```

mod histogram;
mod kde;
pub mod layer_prior;
mod smoothing;

#[cfg(test)]
mod tests;

use ndarray::{s, Array2, ArrayView3};
use num_traits::Float;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PruneError, Result};

pub use histogram::Histogram;
pub use kde::KDE_GRID_POINTS;
pub use layer_prior::LayerPriorPeaks;
pub use smoothing::{gaussian_kernel, smooth};

/// Peak estimation strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeakMode {
    /// Arithmetic mean of the observations.
    Mean,

    /// Most frequent value; ties resolve to the smallest value.
    #[default]
    Mode,

    /// Center of the tallest bin of one histogram over the unit's range.
    Histogram { bins: usize },

    /// Coarse histogram to find the peak bin, fine histogram inside it.
    DualHistogram { coarse_bins: usize, fine_bins: usize },

    /// Fine histogram averaged with a coarse histogram upsampled to the fine
    /// resolution.
    AveragedHistogram { coarse_bins: usize, fine_bins: usize },

    /// Histogram convolved with a Gaussian kernel before taking the peak.
    SmoothedHistogram {
        bins: usize,
        kernel_size: usize,
        sigma: f64,
    },

    /// Histograms on bin edges shared by every layer and unit.
    LayerPrior { bins: usize },

    /// Gaussian kernel density maximum.
    Kde { bandwidth: f64 },
}

impl PeakMode {
    pub fn histogram() -> Self {
        PeakMode::Histogram { bins: 100 }
    }

    pub fn dual_histogram() -> Self {
        PeakMode::DualHistogram { coarse_bins: 100, fine_bins: 100 }
    }

    pub fn averaged_histogram() -> Self {
        PeakMode::AveragedHistogram { coarse_bins: 1000, fine_bins: 10_000 }
    }

    pub fn smoothed_histogram() -> Self {
        PeakMode::SmoothedHistogram { bins: 100, kernel_size: 5, sigma: 1.0 }
    }

    pub fn layer_prior() -> Self {
        PeakMode::LayerPrior { bins: 1000 }
    }

    pub fn kde() -> Self {
        PeakMode::Kde { bandwidth: 0.1 }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            PeakMode::Mean => "mean",
            PeakMode::Mode => "mode",
            PeakMode::Histogram { .. } => "histogram",
            PeakMode::DualHistogram { .. } => "dual_histogram",
            PeakMode::AveragedHistogram { .. } => "averaged_histogram",
            PeakMode::SmoothedHistogram { .. } => "smoothed_histogram",
            PeakMode::LayerPrior { .. } => "layer_prior",
            PeakMode::Kde { .. } => "kde",
        }
    }

    /// Check parameters are usable.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PruneError::InvalidConfig(msg));
        match *self {
            PeakMode::Mean | PeakMode::Mode => Ok(()),
            PeakMode::Histogram { bins } | PeakMode::LayerPrior { bins } if bins == 0 => {
                invalid(format!("{} needs at least one bin", self.name()))
            }
            PeakMode::DualHistogram { coarse_bins, fine_bins }
            | PeakMode::AveragedHistogram { coarse_bins, fine_bins }
                if coarse_bins == 0 || fine_bins == 0 =>
            {
                invalid(format!(
                    "{} needs non-zero bins (coarse={coarse_bins}, fine={fine_bins})",
                    self.name()
                ))
            }
            PeakMode::SmoothedHistogram { bins, kernel_size, sigma }
                if bins == 0 || kernel_size == 0 || sigma.is_nan() || sigma <= 0.0 =>
            {
                invalid(format!(
                    "smoothed_histogram needs bins > 0, kernel_size > 0 and sigma > 0 \
                     (bins={bins}, kernel_size={kernel_size}, sigma={sigma})"
                ))
            }
            PeakMode::Kde { bandwidth } if bandwidth.is_nan() || bandwidth <= 0.0 => {
                invalid(format!("kde bandwidth must be positive, got {bandwidth}"))
            }
            _ => Ok(()),
        }
    }
}

/// Estimate one center per unit from `(n_layers, n_units, n_obs)` samples.
pub fn estimate_peaks<T>(samples: ArrayView3<'_, T>, mode: &PeakMode) -> Result<Array2<T>>
where
    T: Float + Send + Sync,
{
    if samples.dim().2 == 0 {
        return Err(PruneError::EmptySamples);
    }
    mode.validate()?;

    tracing::debug!(
        mode = mode.name(),
        n_layers = samples.dim().0,
        n_units = samples.dim().1,
        n_obs = samples.dim().2,
        "estimating peaks"
    );

    let peaks = match *mode {
        PeakMode::Mean => per_unit(samples, mean),
        PeakMode::Mode => per_unit(samples, mode_value),
        PeakMode::Histogram { bins } => per_unit(samples, |v| histogram::single_peak(v, bins)),
        PeakMode::DualHistogram { coarse_bins, fine_bins } => {
            per_unit(samples, |v| histogram::dual_peak(v, coarse_bins, fine_bins))
        }
        PeakMode::AveragedHistogram { coarse_bins, fine_bins } => {
            per_unit(samples, |v| histogram::averaged_peak(v, coarse_bins, fine_bins))
        }
        PeakMode::SmoothedHistogram { bins, kernel_size, sigma } => {
            per_unit(samples, |v| smoothing::smoothed_peak(v, bins, kernel_size, sigma))
        }
        PeakMode::LayerPrior { bins } => layer_prior::estimate(samples, bins).peaks,
        PeakMode::Kde { bandwidth } => per_unit(samples, |v| kde::kde_peak(v, bandwidth)),
    };
    Ok(peaks)
}

/// Mean offsets: arithmetic mean over the observation axis.
pub fn mean_offsets<T>(samples: ArrayView3<'_, T>) -> Result<Array2<T>>
where
    T: Float + Send + Sync,
{
    estimate_peaks(samples, &PeakMode::Mean)
}

/// Mode offsets: most frequent value over the observation axis.
pub fn mode_offsets<T>(samples: ArrayView3<'_, T>) -> Result<Array2<T>>
where
    T: Float + Send + Sync,
{
    estimate_peaks(samples, &PeakMode::Mode)
}

/// Apply `f` to every unit's observations in parallel.
pub(crate) fn per_unit<T, F>(samples: ArrayView3<'_, T>, f: F) -> Array2<T>
where
    T: Float + Send + Sync,
    F: Fn(&[f64]) -> f64 + Sync + Send,
{
    let (n_layers, n_units, _) = samples.dim();
    let centers: Vec<T> = (0..n_layers * n_units)
        .into_par_iter()
        .map(|idx| cast_back(f(&lane_to_f64(&samples, idx / n_units, idx % n_units))))
        .collect();
    Array2::from_shape_fn((n_layers, n_units), |(l, u)| centers[l * n_units + u])
}

pub(crate) fn lane_to_f64<T: Float>(samples: &ArrayView3<'_, T>, layer: usize, unit: usize) -> Vec<f64> {
    samples
        .slice(s![layer, unit, ..])
        .iter()
        .map(|x| x.to_f64().unwrap_or(f64::NAN))
        .collect()
}

pub(crate) fn cast_back<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::nan)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mode_value(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut best = sorted[0];
    let mut best_count = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}
