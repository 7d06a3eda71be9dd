//! Gaussian kernel density peak.
//!
//! The bandwidth factor scales the sample standard deviation (ddof = 1),
//! so `bandwidth = 0.1` gives a kernel width of a tenth of the spread. The
//! density is evaluated on a fixed grid spanning the unit's observed range.
//! Cost is `grid_points * n_obs` per unit, so this estimator is meant for
//! one-off precomputation rather than per-iteration use.

use super::histogram::{argmax, min_max};

/// Number of evaluation points between the unit's min and max.
pub const KDE_GRID_POINTS: usize = 1000;

/// Grid point of maximum kernel density.
pub(crate) fn kde_peak(values: &[f64], bandwidth: f64) -> f64 {
    let (lo, hi) = min_max(values);
    if lo == hi {
        return lo;
    }

    let h = bandwidth * sample_std(values);
    if h <= 0.0 || !h.is_finite() {
        return lo;
    }

    let step = (hi - lo) / (KDE_GRID_POINTS - 1) as f64;
    let density: Vec<f64> = (0..KDE_GRID_POINTS)
        .map(|g| {
            let x = lo + step * g as f64;
            values
                .iter()
                .map(|&v| {
                    let z = (x - v) / h;
                    (-0.5 * z * z).exp()
                })
                .sum()
        })
        .collect();

    lo + step * argmax(&density) as f64
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}
