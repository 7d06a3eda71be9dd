//! Tests for peak estimation.

use super::*;
use approx::assert_abs_diff_eq;
use ndarray::Array3;

fn all_modes() -> Vec<PeakMode> {
    vec![
        PeakMode::Mean,
        PeakMode::Mode,
        PeakMode::histogram(),
        PeakMode::dual_histogram(),
        PeakMode::averaged_histogram(),
        PeakMode::smoothed_histogram(),
        PeakMode::layer_prior(),
        PeakMode::kde(),
    ]
}

/// 900 observations near 0.0 and 100 near 5.0.
fn bimodal() -> Vec<f32> {
    let mut values = Vec::with_capacity(1000);
    for i in 0..900 {
        values.push((i % 9) as f32 * 0.001 - 0.004);
    }
    for i in 0..100 {
        values.push(5.0 + (i % 5) as f32 * 0.01);
    }
    values
}

// =============================================================================
// Degenerate units
// =============================================================================

#[test]
fn test_constant_unit_returns_constant() {
    // TEST_ID: PK-001
    let samples = Array3::from_elem((2, 3, 7), 0.75f32);
    for mode in all_modes() {
        let peaks = estimate_peaks(samples.view(), &mode).unwrap();
        assert_eq!(peaks.dim(), (2, 3));
        for &p in peaks.iter() {
            assert!(p.is_finite(), "PK-001 FALSIFIED: {} produced non-finite", mode.name());
            assert_abs_diff_eq!(p, 0.75, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_constant_unit_among_varying_units() {
    // TEST_ID: PK-002
    let mut samples = Array3::from_shape_fn((1, 2, 50), |(_, _, k)| k as f32 * 0.1);
    samples.slice_mut(s![0, 1, ..]).fill(-2.0);
    for mode in all_modes() {
        let peaks = estimate_peaks(samples.view(), &mode).unwrap();
        assert_eq!(
            peaks[[0, 1]],
            -2.0,
            "PK-002 FALSIFIED: {} moved a constant unit off its value",
            mode.name()
        );
    }
}

#[test]
fn test_empty_observations_rejected() {
    // TEST_ID: PK-003
    let samples = Array3::<f32>::zeros((2, 2, 0));
    let err = estimate_peaks(samples.view(), &PeakMode::Mean).unwrap_err();
    assert!(matches!(err, PruneError::EmptySamples));
}

// =============================================================================
// Mean and mode
// =============================================================================

#[test]
fn test_mean_offset_known_values() {
    // TEST_ID: PK-010
    let samples = Array3::from_shape_vec((1, 1, 5), vec![1.0f32, 2.0, 3.0, 4.0, 5.0]).unwrap();
    let offsets = mean_offsets(samples.view()).unwrap();
    assert_abs_diff_eq!(offsets[[0, 0]], 3.0, epsilon = 1e-6);
}

#[test]
fn test_mode_picks_most_frequent() {
    // TEST_ID: PK-011
    let samples =
        Array3::from_shape_vec((1, 1, 7), vec![0.5f32, 2.0, 2.0, -1.0, 2.0, 0.5, 9.0]).unwrap();
    let offsets = mode_offsets(samples.view()).unwrap();
    assert_eq!(offsets[[0, 0]], 2.0);
}

#[test]
fn test_mode_tie_resolves_to_smallest() {
    // TEST_ID: PK-012
    let samples = Array3::from_shape_vec((1, 1, 4), vec![3.0f64, 1.0, 3.0, 1.0]).unwrap();
    let offsets = mode_offsets(samples.view()).unwrap();
    assert_eq!(offsets[[0, 0]], 1.0);
}

// =============================================================================
// Histogram estimators
// =============================================================================

#[test]
fn test_histogram_peak_finds_majority_mode() {
    // TEST_ID: PK-020
    let values = bimodal();
    let n = values.len();
    let samples = Array3::from_shape_vec((1, 1, n), values).unwrap();
    for bins in [10usize, 100] {
        let peaks = estimate_peaks(samples.view(), &PeakMode::Histogram { bins }).unwrap();
        let width = (5.04 + 0.004) / bins as f32;
        assert!(
            peaks[[0, 0]].abs() <= width,
            "PK-020 FALSIFIED: bins={bins} peak {} not within one bin of 0",
            peaks[[0, 0]]
        );
    }
}

#[test]
fn test_every_estimator_prefers_majority_cluster() {
    // TEST_ID: PK-021
    let values = bimodal();
    let n = values.len();
    let samples = Array3::from_shape_vec((1, 1, n), values).unwrap();
    for mode in all_modes() {
        if mode == PeakMode::Mean {
            continue;
        }
        let peak = estimate_peaks(samples.view(), &mode).unwrap()[[0, 0]];
        assert!(peak < 1.0, "PK-021 FALSIFIED: {} picked minority cluster ({peak})", mode.name());
    }
}

#[test]
fn test_histogram_last_edge_lands_in_last_bin() {
    // TEST_ID: PK-022
    let hist = Histogram::build(&[0.0, 1.0, 1.0, 0.5], 4, 0.0, 1.0);
    assert_eq!(hist.counts(), &[1.0, 0.0, 1.0, 2.0]);
    assert_eq!(hist.peak_bin(), 3);
    assert_abs_diff_eq!(hist.peak_center(), 0.875);
}

#[test]
fn test_histogram_ignores_out_of_range() {
    // TEST_ID: PK-023
    let hist = Histogram::build(&[-1.0, 0.25, 2.0], 2, 0.0, 1.0);
    assert_eq!(hist.counts(), &[1.0, 0.0]);
}

#[test]
fn test_dual_histogram_refines_within_peak_bin() {
    // TEST_ID: PK-024
    // Dense cluster at 0.303, spread elsewhere over [0, 10].
    let mut values: Vec<f32> = (0..100).map(|i| i as f32 * 0.1).collect();
    values.extend(std::iter::repeat(0.303).take(50));
    let n = values.len();
    let samples = Array3::from_shape_vec((1, 1, n), values).unwrap();

    let coarse = estimate_peaks(samples.view(), &PeakMode::histogram()).unwrap()[[0, 0]];
    let dual = estimate_peaks(samples.view(), &PeakMode::dual_histogram()).unwrap()[[0, 0]];
    assert!((dual - 0.303).abs() < (coarse - 0.303).abs() + 1e-6);
    assert!((dual - 0.303).abs() < 0.001, "PK-024 FALSIFIED: dual peak {dual}");
}

#[test]
fn test_upsample_repeat_truncates_and_pads() {
    // TEST_ID: PK-025
    assert_eq!(histogram::upsample_repeat(&[1.0, 2.0], 4), vec![1.0, 1.0, 2.0, 2.0]);
    // 3 coarse into 7 fine: factor 2, padded with the last count
    assert_eq!(
        histogram::upsample_repeat(&[1.0, 2.0, 3.0], 7),
        vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0]
    );
    // more coarse than fine bins: factor clamps to 1, then truncates
    assert_eq!(histogram::upsample_repeat(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
}

// =============================================================================
// Smoothing
// =============================================================================

#[test]
fn test_gaussian_kernel_is_odd_symmetric_normalized() {
    // TEST_ID: PK-030
    let kernel = gaussian_kernel(4, 1.0);
    assert_eq!(kernel.len(), 5, "PK-030 FALSIFIED: even size must be bumped to odd");
    assert_abs_diff_eq!(kernel.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(kernel[0], kernel[4], epsilon = 1e-12);
    assert_abs_diff_eq!(kernel[1], kernel[3], epsilon = 1e-12);
    assert!(kernel[2] > kernel[1]);
}

#[test]
fn test_smooth_preserves_length_and_constants() {
    // TEST_ID: PK-031
    let values = vec![4.0; 9];
    let smoothed = smooth(&values, &gaussian_kernel(5, 1.0));
    assert_eq!(smoothed.len(), values.len());
    for v in smoothed {
        assert_abs_diff_eq!(v, 4.0, epsilon = 1e-12);
    }
}

#[test]
fn test_smoothing_suppresses_isolated_spike() {
    // TEST_ID: PK-032
    // A single-bin spike of 5 next to a broad hump of 4s.
    let counts = vec![0.0, 5.0, 0.0, 0.0, 4.0, 4.0, 4.0, 4.0, 0.0];
    let smoothed = smooth(&counts, &gaussian_kernel(5, 1.0));
    assert_eq!(histogram::argmax(&counts), 1);
    let peak = histogram::argmax(&smoothed);
    assert!((4..=7).contains(&peak), "PK-032 FALSIFIED: smoothed peak at {peak}");
}

// =============================================================================
// Layer prior
// =============================================================================

#[test]
fn test_layer_prior_uses_shared_edges() {
    // TEST_ID: PK-040
    let samples = Array3::from_shape_fn((2, 2, 20), |(l, u, k)| {
        (l * 10 + u) as f32 + if k < 15 { 0.0 } else { 0.5 }
    });
    let out = layer_prior::estimate(samples.view(), 1000);
    assert_abs_diff_eq!(out.global_min, 0.0);
    assert_abs_diff_eq!(out.global_max, 11.5);
    assert_eq!(out.layer_histograms.len(), 2);
    for h in &out.layer_histograms {
        assert_eq!(h.bins(), 1000);
        assert_abs_diff_eq!(h.bin_width(), 11.5 / 1000.0, epsilon = 1e-12);
    }
    // each layer histogram holds all of its layer's observations
    assert_abs_diff_eq!(out.layer_histograms[0].counts().iter().sum::<f64>(), 40.0);

    let width = 11.5 / 1000.0;
    for l in 0..2 {
        for u in 0..2 {
            let expected = (l * 10 + u) as f32;
            assert!((out.peaks[[l, u]] - expected).abs() <= width as f32);
        }
    }
}

// =============================================================================
// KDE
// =============================================================================

#[test]
fn test_kde_peak_near_dense_region() {
    // TEST_ID: PK-050
    let mut values: Vec<f64> = (0..200).map(|i| 2.0 + (i % 7) as f64 * 0.01).collect();
    values.extend((0..20).map(|i| -3.0 + i as f64 * 0.3));
    let n = values.len();
    let samples = Array3::from_shape_vec((1, 1, n), values).unwrap();
    let peak = estimate_peaks(samples.view(), &PeakMode::kde()).unwrap()[[0, 0]];
    assert!((peak - 2.03).abs() < 0.1, "PK-050 FALSIFIED: kde peak {peak}");
}

// =============================================================================
// Precision handling
// =============================================================================

#[test]
fn test_half_precision_round_trips_through_f64() {
    // TEST_ID: PK-060
    use half::f16;
    let values: Vec<f16> = [1.0f32, 2.0, 3.0, 4.0, 5.0].iter().map(|&v| f16::from_f32(v)).collect();
    let samples = Array3::from_shape_vec((1, 1, 5), values).unwrap();
    let mean = estimate_peaks(samples.view(), &PeakMode::Mean).unwrap();
    assert_eq!(mean[[0, 0]], f16::from_f32(3.0));
    let mode = estimate_peaks(samples.view(), &PeakMode::histogram()).unwrap();
    assert!(mode[[0, 0]].to_f32().is_finite());
}

#[test]
fn test_peak_mode_validation() {
    // TEST_ID: PK-070
    assert!(PeakMode::Histogram { bins: 0 }.validate().is_err());
    assert!(PeakMode::Kde { bandwidth: 0.0 }.validate().is_err());
    assert!(PeakMode::SmoothedHistogram { bins: 10, kernel_size: 3, sigma: f64::NAN }
        .validate()
        .is_err());
    assert!(PeakMode::DualHistogram { coarse_bins: 10, fine_bins: 0 }.validate().is_err());
    for mode in all_modes() {
        assert!(mode.validate().is_ok(), "PK-070 FALSIFIED: default {} rejected", mode.name());
    }
}

#[test]
fn test_peak_mode_yaml_tagged() {
    // TEST_ID: PK-071
    let mode: PeakMode = serde_yaml::from_str("type: smoothed_histogram\nbins: 50\nkernel_size: 7\nsigma: 2.0\n").unwrap();
    assert_eq!(mode, PeakMode::SmoothedHistogram { bins: 50, kernel_size: 7, sigma: 2.0 });
    let mode: PeakMode = serde_yaml::from_str("type: mode\n").unwrap();
    assert_eq!(mode, PeakMode::Mode);
}
