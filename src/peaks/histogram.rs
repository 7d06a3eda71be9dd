//! Fixed-width histograms and the histogram-based peak estimators.

/// Fixed-width histogram over a closed range `[lo, hi]`.
///
/// A value lands in bin `floor((x - lo) / (hi - lo) * bins)`; `x == hi`
/// lands in the last bin and values outside the range are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    counts: Vec<f64>,
    lo: f64,
    hi: f64,
}

impl Histogram {
    /// Build a histogram of `values` with `bins` bins over `[lo, hi]`.
    pub fn build(values: &[f64], bins: usize, lo: f64, hi: f64) -> Self {
        let mut counts = vec![0.0; bins];
        let width = hi - lo;
        if bins > 0 && width > 0.0 {
            for &x in values {
                if x < lo || x > hi {
                    continue;
                }
                let idx = (((x - lo) / width) * bins as f64) as usize;
                counts[idx.min(bins - 1)] += 1.0;
            }
        }
        Self { counts, lo, hi }
    }

    /// Wrap precomputed counts.
    pub fn from_counts(counts: Vec<f64>, lo: f64, hi: f64) -> Self {
        Self { counts, lo, hi }
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len().max(1) as f64
    }

    /// Lower edge of bin `bin`.
    pub fn bin_start(&self, bin: usize) -> f64 {
        self.lo + self.bin_width() * bin as f64
    }

    /// Center of bin `bin`.
    pub fn bin_center(&self, bin: usize) -> f64 {
        self.lo + self.bin_width() * (bin as f64 + 0.5)
    }

    /// Index of the highest-count bin; ties go to the lowest index.
    pub fn peak_bin(&self) -> usize {
        argmax(&self.counts)
    }

    /// Center of the highest-count bin.
    pub fn peak_center(&self) -> f64 {
        self.bin_center(self.peak_bin())
    }
}

/// Index of the first maximum.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

pub(crate) fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

/// Peak of a single histogram over the unit's own range.
pub(crate) fn single_peak(values: &[f64], bins: usize) -> f64 {
    let (lo, hi) = min_max(values);
    if lo == hi {
        return lo;
    }
    Histogram::build(values, bins, lo, hi).peak_center()
}

/// Coarse histogram locates the peak bin, a fine histogram inside that bin
/// refines it.
pub(crate) fn dual_peak(values: &[f64], coarse_bins: usize, fine_bins: usize) -> f64 {
    let (lo, hi) = min_max(values);
    if lo == hi {
        return lo;
    }
    let coarse = Histogram::build(values, coarse_bins, lo, hi);
    let peak = coarse.peak_bin();
    let region_lo = coarse.bin_start(peak);
    let region_hi = region_lo + coarse.bin_width();

    let fine = Histogram::build(values, fine_bins, region_lo, region_hi);
    fine.peak_center()
}

/// Average of a fine histogram with a coarse one upsampled by repetition.
pub(crate) fn averaged_peak(values: &[f64], coarse_bins: usize, fine_bins: usize) -> f64 {
    let (lo, hi) = min_max(values);
    if lo == hi {
        return lo;
    }
    let coarse = Histogram::build(values, coarse_bins, lo, hi);
    let fine = Histogram::build(values, fine_bins, lo, hi);

    let upsampled = upsample_repeat(coarse.counts(), fine_bins);
    let averaged: Vec<f64> =
        upsampled.iter().zip(fine.counts()).map(|(c, f)| (c + f) / 2.0).collect();

    Histogram::from_counts(averaged, lo, hi).peak_center()
}

/// Repeat each count `target / counts.len()` times, then truncate or pad with
/// the last value to exactly `target` entries.
pub(crate) fn upsample_repeat(counts: &[f64], target: usize) -> Vec<f64> {
    if counts.is_empty() {
        return vec![0.0; target];
    }
    let factor = (target / counts.len()).max(1);
    let mut out: Vec<f64> =
        counts.iter().flat_map(|&c| std::iter::repeat(c).take(factor)).take(target).collect();
    let last = counts[counts.len() - 1];
    out.resize(target, last);
    out
}
