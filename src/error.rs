//! Pruning error types

use thiserror::Error;

/// Error returned by collaborator implementations of
/// [`PrunableModel`](crate::model::PrunableModel).
pub type ModelError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pruning errors
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("Must prune at least one of FF or attention (ff_frac={ff_frac}, attn_frac={attn_frac})")]
    NothingToPrune { ff_frac: f32, attn_frac: f32 },

    #[error("attn_mode must be 'pre-out' or 'value', got '{0}'")]
    InvalidAttnMode(String),

    #[error("Unknown {kind} '{name}'")]
    UnknownStrategy { kind: &'static str, name: String },

    #[error("Must provide focus and cripple activations and an iteration index when activations are not recalculated")]
    MissingActivations,

    #[error("Invalid fraction {value}: must be within [0, 1]")]
    InvalidFraction { value: f32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("No activation view for normalization '{key}' in group '{group}'")]
    MissingNormalization { group: &'static str, key: String },

    #[error("Raw attention activations required for '{0}' offsets but were not collected")]
    MissingRawActivations(String),

    #[error("Shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Non-finite score at layer {layer}, unit {unit}")]
    NonFiniteScores { layer: usize, unit: usize },

    #[error("Cannot estimate peaks from an empty observation axis")]
    EmptySamples,

    #[error("Layer {layer}: requested {requested} units but only {available} remain unpruned")]
    InsufficientCandidates {
        layer: usize,
        requested: usize,
        available: usize,
    },

    #[error("Model operation '{operation}' failed: {source}")]
    Model {
        operation: &'static str,
        #[source]
        source: ModelError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PruneError {
    /// Wrap a collaborator failure with the name of the operation that produced it.
    pub fn model(operation: &'static str) -> impl FnOnce(ModelError) -> Self {
        move |source| PruneError::Model { operation, source }
    }

    /// Whether this error leaves the model untouched (raised before mutation).
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PruneError::NothingToPrune { .. }
                | PruneError::InvalidAttnMode(_)
                | PruneError::UnknownStrategy { .. }
                | PruneError::MissingActivations
                | PruneError::InvalidFraction { .. }
                | PruneError::InvalidConfig(_)
                | PruneError::ConfigParse(_)
        )
    }
}

/// Result type for pruning operations
pub type Result<T> = std::result::Result<T, PruneError>;
