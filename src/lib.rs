//! # Podar
//!
//! Activation-guided pruning for transformer language models.
//!
//! Podar (Spanish: "to prune") removes feed-forward neurons and attention
//! units or heads from a live model. Units are ranked by how much more they
//! fire on a **focus** dataset (behaviour to keep) than on a **cripple**
//! dataset (behaviour to remove), and the lowest-ranked fraction is masked.
//! Removed attention units can be pinned to a per-unit baseline estimated
//! from the focus activations instead of zero.
//!
//! ## Modules
//!
//! - [`peaks`]: per-unit center estimators (mean, mode, histogram family, KDE)
//! - [`scoring`]: focus/cripple scoring methods
//! - [`select`]: global, per-layer and per-head removal masks
//! - [`pipeline`]: one iteration ([`score_and_prune`]) and whole runs ([`run_pruning`])
//! - [`history`]: result rows, CSV/JSON export, raw tensor dumps
//! - [`soft_mask`]: logits for models with continuous masks
//!
//! The model itself is reached only through [`PrunableModel`].
//!
//! ## Example
//!
//! ```rust
//! use ndarray::array;
//! use podar::scoring::RankOrder;
//! use podar::select::top_fraction;
//!
//! let scores = array![[0.9f32, 0.1, 0.5], [0.3, 0.8, 0.2]];
//! let selection = top_fraction(scores.view(), 0.5, RankOrder::Ascending).unwrap();
//!
//! assert_eq!(selection.count(), 3);
//! assert_eq!(selection.per_layer(), vec![1, 2]);
//! assert_eq!(selection.threshold, 0.3);
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod activations;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod peaks;
pub mod pipeline;
pub mod scoring;
pub mod select;
pub mod soft_mask;

pub use activations::{ActivationStats, ActivationSummary, GroupActivations, RawAttention, UnitGroup};
pub use config::{AttnMode, HeadReduction, HeadSelection, OffsetMode, PruningConfig};
pub use error::{ModelError, PruneError, Result};
pub use history::{RunDataHistory, RunDataItem};
pub use model::{EvalMetrics, MaskTarget, ModelDims, PrunableModel};
pub use peaks::{estimate_peaks, PeakMode};
pub use pipeline::{
    prune_and_evaluate, run_pruning, score_and_prune, IterationStrategy, PruningRun, PruningStage,
};
pub use scoring::{RankOrder, ScoringFunction, ScoringMethod};
pub use select::Selection;
