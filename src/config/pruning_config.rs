//! Main pruning configuration struct.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AttnMode, HeadReduction, HeadSelection, OffsetMode};
use crate::error::{PruneError, Result};
use crate::peaks::PeakMode;
use crate::scoring::ScoringMethod;

/// Configuration for one pruning run.
///
/// Constructed once by the caller; iteration-scaled copies are derived with
/// [`PruningConfig::scaled_for_iteration`].
///
/// # Example
///
/// ```
/// use podar::config::{AttnMode, PruningConfig};
/// use podar::scoring::ScoringMethod;
///
/// let config = PruningConfig::new()
///     .with_focus("pile")
///     .with_cripple("code")
///     .with_ff_frac(0.05)
///     .with_attn_frac(0.02)
///     .with_ff_scoring(ScoringMethod::Freq)
///     .with_attn_mode(AttnMode::PreOut)
///     .with_n_steps(4);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.datasets(), vec!["pile".to_string(), "code".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    /// Model identifier, informational only.
    model_size: String,

    /// Fraction of feed-forward neurons to remove per step.
    ff_frac: f32,
    /// Fraction of attention units to remove per step.
    attn_frac: f32,
    /// Epsilon passed to the feed-forward scoring function.
    ff_eps: f32,
    /// Epsilon passed to the attention scoring function.
    attn_eps: f32,
    /// Feed-forward scoring method.
    ff_scoring: ScoringMethod,
    /// Attention scoring method.
    attn_scoring: ScoringMethod,
    /// Normalization key used to look up activation views.
    scoring_normalization: String,

    /// Dataset whose behaviour should be kept.
    focus: String,
    /// Dataset whose behaviour should be removed.
    cripple: String,
    /// Extra datasets to evaluate on.
    additional_datasets: Vec<String>,
    /// Tokens of each dataset used to collect activations.
    collection_sample_size: usize,
    /// Tokens of each dataset used for evaluation.
    eval_sample_size: usize,

    /// Number of pruning iterations.
    n_steps: usize,
    /// Recollect activations before every iteration.
    recalculate_activations: bool,

    attn_mode: AttnMode,
    attn_offset_mode: OffsetMode,
    /// Estimator used when `attn_offset_mode` is `peak`.
    peak_mode: PeakMode,
    /// Prune whole attention heads instead of single neurons.
    attn_prune_heads: bool,
    attn_prune_heads_mode: HeadReduction,
    head_selection: HeadSelection,
    /// Bias removed attention units by the focus mean.
    do_attn_mean_offset: bool,

    /// Evaluate once before any pruning.
    run_pre_test: bool,
    /// Seed for random scoring and the random baseline.
    seed: u64,
    /// Directory for timestamped raw score/criteria dumps.
    save_raw_dir: Option<PathBuf>,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            model_size: "facebook/opt-125m".to_string(),
            ff_frac: 0.1,
            attn_frac: 0.0,
            ff_eps: 1e-3,
            attn_eps: 1e-4,
            ff_scoring: ScoringMethod::Abs,
            attn_scoring: ScoringMethod::Abs,
            scoring_normalization: "mean".to_string(),
            focus: "pile".to_string(),
            cripple: "code".to_string(),
            additional_datasets: Vec::new(),
            collection_sample_size: 100_000,
            eval_sample_size: 100_000,
            n_steps: 1,
            recalculate_activations: true,
            attn_mode: AttnMode::PreOut,
            attn_offset_mode: OffsetMode::Peak,
            peak_mode: PeakMode::Mode,
            attn_prune_heads: false,
            attn_prune_heads_mode: HeadReduction::Mean,
            head_selection: HeadSelection::Global,
            do_attn_mean_offset: false,
            run_pre_test: false,
            seed: 42,
            save_raw_dir: None,
        }
    }
}

impl PruningConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PruningConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&yaml)
    }

    /// Serialize the configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn with_model_size(mut self, model_size: impl Into<String>) -> Self {
        self.model_size = model_size.into();
        self
    }

    /// Set the feed-forward pruning fraction.
    pub fn with_ff_frac(mut self, frac: f32) -> Self {
        self.ff_frac = frac;
        self
    }

    /// Set the attention pruning fraction.
    pub fn with_attn_frac(mut self, frac: f32) -> Self {
        self.attn_frac = frac;
        self
    }

    pub fn with_ff_eps(mut self, eps: f32) -> Self {
        self.ff_eps = eps;
        self
    }

    pub fn with_attn_eps(mut self, eps: f32) -> Self {
        self.attn_eps = eps;
        self
    }

    pub fn with_ff_scoring(mut self, method: ScoringMethod) -> Self {
        self.ff_scoring = method;
        self
    }

    pub fn with_attn_scoring(mut self, method: ScoringMethod) -> Self {
        self.attn_scoring = method;
        self
    }

    /// Set both scoring methods at once.
    pub fn with_scoring(self, method: ScoringMethod) -> Self {
        self.with_ff_scoring(method).with_attn_scoring(method)
    }

    pub fn with_scoring_normalization(mut self, key: impl Into<String>) -> Self {
        self.scoring_normalization = key.into();
        self
    }

    pub fn with_focus(mut self, dataset: impl Into<String>) -> Self {
        self.focus = dataset.into();
        self
    }

    pub fn with_cripple(mut self, dataset: impl Into<String>) -> Self {
        self.cripple = dataset.into();
        self
    }

    pub fn with_additional_datasets(mut self, datasets: Vec<String>) -> Self {
        self.additional_datasets = datasets;
        self
    }

    pub fn with_collection_sample_size(mut self, n: usize) -> Self {
        self.collection_sample_size = n;
        self
    }

    pub fn with_eval_sample_size(mut self, n: usize) -> Self {
        self.eval_sample_size = n;
        self
    }

    /// Set the number of pruning iterations.
    pub fn with_n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    pub fn with_recalculate_activations(mut self, enabled: bool) -> Self {
        self.recalculate_activations = enabled;
        self
    }

    pub fn with_attn_mode(mut self, mode: AttnMode) -> Self {
        self.attn_mode = mode;
        self
    }

    pub fn with_attn_offset_mode(mut self, mode: OffsetMode) -> Self {
        self.attn_offset_mode = mode;
        self
    }

    pub fn with_peak_mode(mut self, mode: PeakMode) -> Self {
        self.peak_mode = mode;
        self
    }

    /// Prune whole heads, reducing neuron scores per head with `reduction`.
    pub fn with_attn_prune_heads(mut self, enabled: bool, reduction: HeadReduction) -> Self {
        self.attn_prune_heads = enabled;
        self.attn_prune_heads_mode = reduction;
        self
    }

    pub fn with_head_selection(mut self, selection: HeadSelection) -> Self {
        self.head_selection = selection;
        self
    }

    pub fn with_attn_mean_offset(mut self, enabled: bool) -> Self {
        self.do_attn_mean_offset = enabled;
        self
    }

    pub fn with_pre_test(mut self, enabled: bool) -> Self {
        self.run_pre_test = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_save_raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_raw_dir = Some(dir.into());
        self
    }

    pub fn model_size(&self) -> &str {
        &self.model_size
    }

    pub fn ff_frac(&self) -> f32 {
        self.ff_frac
    }

    pub fn attn_frac(&self) -> f32 {
        self.attn_frac
    }

    pub fn ff_eps(&self) -> f32 {
        self.ff_eps
    }

    pub fn attn_eps(&self) -> f32 {
        self.attn_eps
    }

    pub fn ff_scoring(&self) -> ScoringMethod {
        self.ff_scoring
    }

    pub fn attn_scoring(&self) -> ScoringMethod {
        self.attn_scoring
    }

    pub fn scoring_normalization(&self) -> &str {
        &self.scoring_normalization
    }

    pub fn focus(&self) -> &str {
        &self.focus
    }

    pub fn cripple(&self) -> &str {
        &self.cripple
    }

    pub fn collection_sample_size(&self) -> usize {
        self.collection_sample_size
    }

    pub fn eval_sample_size(&self) -> usize {
        self.eval_sample_size
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn recalculate_activations(&self) -> bool {
        self.recalculate_activations
    }

    pub fn attn_mode(&self) -> AttnMode {
        self.attn_mode
    }

    pub fn attn_offset_mode(&self) -> OffsetMode {
        self.attn_offset_mode
    }

    pub fn peak_mode(&self) -> &PeakMode {
        &self.peak_mode
    }

    pub fn attn_prune_heads(&self) -> bool {
        self.attn_prune_heads
    }

    pub fn attn_prune_heads_mode(&self) -> HeadReduction {
        self.attn_prune_heads_mode
    }

    pub fn head_selection(&self) -> HeadSelection {
        self.head_selection
    }

    pub fn do_attn_mean_offset(&self) -> bool {
        self.do_attn_mean_offset
    }

    pub fn run_pre_test(&self) -> bool {
        self.run_pre_test
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn save_raw_dir(&self) -> Option<&Path> {
        self.save_raw_dir.as_deref()
    }

    /// Whether feed-forward neurons are pruned at all.
    pub fn does_ff(&self) -> bool {
        self.ff_frac > 0.0
    }

    /// Whether attention units are pruned at all.
    pub fn does_attn(&self) -> bool {
        self.attn_frac > 0.0
    }

    /// Whether both groups are scored randomly (the random baseline).
    pub fn is_random_baseline(&self) -> bool {
        self.ff_scoring == ScoringMethod::Random && self.attn_scoring == ScoringMethod::Random
    }

    /// Datasets to evaluate on: focus, cripple, then any extras, without repeats.
    pub fn datasets(&self) -> Vec<String> {
        let mut datasets: Vec<String> = Vec::with_capacity(2 + self.additional_datasets.len());
        for name in [&self.focus, &self.cripple].into_iter().chain(&self.additional_datasets) {
            if !datasets.contains(name) {
                datasets.push(name.clone());
            }
        }
        datasets
    }

    /// Copy of this configuration with fractions ramped for a fixed-activation
    /// iteration: `min(1, frac * (iteration + 1))`.
    pub fn scaled_for_iteration(&self, iteration: usize) -> Self {
        let scale = (iteration + 1) as f32;
        Self {
            ff_frac: (self.ff_frac * scale).min(1.0),
            attn_frac: (self.attn_frac * scale).min(1.0),
            ..self.clone()
        }
    }

    /// Fail if there is nothing to prune. Checked before any model mutation.
    pub fn ensure_prunable(&self) -> Result<()> {
        if !self.does_ff() && !self.does_attn() {
            return Err(PruneError::NothingToPrune {
                ff_frac: self.ff_frac,
                attn_frac: self.attn_frac,
            });
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        for frac in [self.ff_frac, self.attn_frac] {
            if !(0.0..=1.0).contains(&frac) {
                return Err(PruneError::InvalidFraction { value: frac });
            }
        }

        if self.ff_eps < 0.0 || self.attn_eps < 0.0 {
            return Err(PruneError::InvalidConfig(format!(
                "epsilons must be non-negative (ff_eps={}, attn_eps={})",
                self.ff_eps, self.attn_eps
            )));
        }

        if self.n_steps == 0 {
            return Err(PruneError::InvalidConfig("n_steps must be at least 1".to_string()));
        }

        if self.scoring_normalization.is_empty() {
            return Err(PruneError::InvalidConfig(
                "scoring_normalization cannot be empty".to_string(),
            ));
        }

        self.peak_mode.validate()?;
        self.ensure_prunable()
    }
}
