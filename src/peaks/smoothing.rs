//! Gaussian smoothing of histogram counts.

use super::histogram::{argmax, min_max, Histogram};

/// Normalized 1-D Gaussian kernel. Even sizes are bumped to the next odd size
/// so the kernel has a center tap.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let size = if size % 2 == 0 { size + 1 } else { size };
    let half = (size / 2) as f64;
    let mut kernel: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - half;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Convolve `values` with `kernel` using edge-replicated padding. The output
/// has the same length as the input.
pub fn smooth(values: &[f64], kernel: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let pad = kernel.len() / 2;
    let last = values.len() - 1;
    (0..values.len())
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    // position i + k - pad, clamped to the edges
                    let pos = (i + k).saturating_sub(pad).min(last);
                    w * values[pos]
                })
                .sum()
        })
        .collect()
}

/// Peak of a Gaussian-smoothed histogram over the unit's own range.
pub(crate) fn smoothed_peak(values: &[f64], bins: usize, kernel_size: usize, sigma: f64) -> f64 {
    let (lo, hi) = min_max(values);
    if lo == hi {
        return lo;
    }
    let hist = Histogram::build(values, bins, lo, hi);
    let smoothed = smooth(hist.counts(), &gaussian_kernel(kernel_size, sigma));
    hist.bin_center(argmax(&smoothed))
}
