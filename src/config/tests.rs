//! Tests for pruning configuration.

use super::*;
use crate::error::PruneError;
use crate::peaks::PeakMode;
use crate::scoring::ScoringMethod;

// =============================================================================
// Defaults and builders
// =============================================================================

#[test]
fn test_defaults() {
    // TEST_ID: CF-001
    let config = PruningConfig::default();
    assert_eq!(config.model_size(), "facebook/opt-125m");
    assert_eq!(config.ff_frac(), 0.1);
    assert_eq!(config.attn_frac(), 0.0);
    assert_eq!(config.ff_scoring(), ScoringMethod::Abs);
    assert_eq!(config.scoring_normalization(), "mean");
    assert_eq!(config.focus(), "pile");
    assert_eq!(config.cripple(), "code");
    assert_eq!(config.n_steps(), 1);
    assert!(config.recalculate_activations());
    assert_eq!(config.attn_mode(), AttnMode::PreOut);
    assert_eq!(config.attn_offset_mode(), OffsetMode::Peak);
    assert_eq!(config.peak_mode(), &PeakMode::Mode);
    assert!(!config.attn_prune_heads());
    assert_eq!(config.seed(), 42);
    assert!(config.save_raw_dir().is_none());
    assert!(config.validate().is_ok(), "CF-001 FALSIFIED: defaults must validate");
}

#[test]
fn test_builder_chain() {
    // TEST_ID: CF-002
    let config = PruningConfig::new()
        .with_ff_frac(0.02)
        .with_attn_frac(0.05)
        .with_scoring(ScoringMethod::Rms)
        .with_attn_prune_heads(true, HeadReduction::Median)
        .with_head_selection(HeadSelection::PerLayer)
        .with_attn_mode(AttnMode::Value)
        .with_seed(7);

    assert_eq!(config.attn_scoring(), ScoringMethod::Rms);
    assert_eq!(config.ff_scoring(), ScoringMethod::Rms);
    assert!(config.attn_prune_heads());
    assert_eq!(config.attn_prune_heads_mode(), HeadReduction::Median);
    assert_eq!(config.head_selection(), HeadSelection::PerLayer);
    assert!(config.does_ff() && config.does_attn());
    assert_eq!(config.seed(), 7);
}

#[test]
fn test_datasets_deduplicated() {
    // TEST_ID: CF-003
    let config = PruningConfig::new()
        .with_focus("pile")
        .with_cripple("code")
        .with_additional_datasets(vec!["code".into(), "wiki".into(), "pile".into()]);
    assert_eq!(config.datasets(), vec!["pile", "code", "wiki"]);
}

#[test]
fn test_random_baseline_needs_both_random() {
    // TEST_ID: CF-004
    assert!(!PruningConfig::new().with_ff_scoring(ScoringMethod::Random).is_random_baseline());
    assert!(PruningConfig::new().with_scoring(ScoringMethod::Random).is_random_baseline());
}

#[test]
fn test_scaled_for_iteration() {
    // TEST_ID: CF-005
    let config = PruningConfig::new().with_ff_frac(0.1).with_attn_frac(0.4);
    let scaled = config.scaled_for_iteration(2);
    approx::assert_abs_diff_eq!(scaled.ff_frac(), 0.3, epsilon = 1e-6);
    assert_eq!(scaled.attn_frac(), 1.0, "CF-005 FALSIFIED: ramp must saturate at 1");
    assert_eq!(scaled.focus(), config.focus());
    // iteration 0 keeps the base fractions
    assert_eq!(config.scaled_for_iteration(0), config);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_nothing_to_prune() {
    // TEST_ID: CF-010
    let config = PruningConfig::new().with_ff_frac(0.0).with_attn_frac(0.0);
    assert!(matches!(config.validate(), Err(PruneError::NothingToPrune { .. })));
}

#[test]
fn test_invalid_fractions() {
    // TEST_ID: CF-011
    for frac in [-0.5f32, 1.01, f32::NAN] {
        let config = PruningConfig::new().with_ff_frac(frac);
        assert!(
            matches!(config.validate(), Err(PruneError::InvalidFraction { .. })),
            "CF-011 FALSIFIED: ff_frac {frac} accepted"
        );
    }
}

#[test]
fn test_invalid_numbers() {
    // TEST_ID: CF-012
    assert!(PruningConfig::new().with_n_steps(0).validate().is_err());
    assert!(PruningConfig::new().with_ff_eps(-1.0).validate().is_err());
    assert!(PruningConfig::new().with_scoring_normalization("").validate().is_err());
    let bad_peak = PruningConfig::new().with_peak_mode(PeakMode::Histogram { bins: 0 });
    assert!(matches!(bad_peak.validate(), Err(PruneError::InvalidConfig(_))));
}

// =============================================================================
// Modes
// =============================================================================

#[test]
fn test_attn_mode_parsing() {
    // TEST_ID: CF-020
    assert_eq!("pre-out".parse::<AttnMode>().unwrap(), AttnMode::PreOut);
    assert_eq!("value".parse::<AttnMode>().unwrap(), AttnMode::Value);
    assert!(matches!("keys".parse::<AttnMode>(), Err(PruneError::InvalidAttnMode(_))));
    assert_eq!(AttnMode::PreOut.to_string(), "pre-out");
}

#[test]
fn test_offset_mode_raw_requirement() {
    // TEST_ID: CF-021
    assert!(OffsetMode::Peak.needs_raw_attention());
    assert!(!OffsetMode::Mean.needs_raw_attention());
    assert!(!OffsetMode::Zero.needs_raw_attention());
}

// =============================================================================
// YAML
// =============================================================================

#[test]
fn test_yaml_partial_config_uses_defaults() {
    // TEST_ID: CF-030
    let yaml = r#"
ff_frac: 0.05
attn_frac: 0.02
attn_mode: value
attn_offset_mode: mean
ff_scoring: freq
peak_mode:
  type: smoothed_histogram
  bins: 50
  kernel_size: 4
  sigma: 2.0
n_steps: 3
"#;
    let config = PruningConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.attn_mode(), AttnMode::Value);
    assert_eq!(config.attn_offset_mode(), OffsetMode::Mean);
    assert_eq!(config.ff_scoring(), ScoringMethod::Freq);
    assert_eq!(config.attn_scoring(), ScoringMethod::Abs);
    assert_eq!(config.n_steps(), 3);
    assert_eq!(config.focus(), "pile");
    assert!(matches!(config.peak_mode(), PeakMode::SmoothedHistogram { bins: 50, .. }));
}

#[test]
fn test_yaml_rejects_unknown_attn_mode() {
    // TEST_ID: CF-031
    let err = PruningConfig::from_yaml_str("attn_mode: keys\n").unwrap_err();
    assert!(matches!(err, PruneError::ConfigParse(_)));
    assert!(
        err.to_string().contains("attn_mode must be 'pre-out' or 'value'"),
        "CF-031 FALSIFIED: got {err}"
    );
    assert!(err.is_config_error());
}

#[test]
fn test_yaml_validates_after_parse() {
    // TEST_ID: CF-032
    let err = PruningConfig::from_yaml_str("ff_frac: 0.0\n").unwrap_err();
    assert!(matches!(err, PruneError::NothingToPrune { .. }));
}

#[test]
fn test_yaml_file_round_trip() {
    // TEST_ID: CF-033
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prune.yaml");
    let config = PruningConfig::new()
        .with_attn_frac(0.1)
        .with_peak_mode(PeakMode::kde())
        .with_save_raw_dir("/tmp/raw");
    std::fs::write(&path, config.to_yaml().unwrap()).unwrap();

    let loaded = PruningConfig::from_yaml_file(&path).unwrap();
    assert_eq!(loaded, config);
}
