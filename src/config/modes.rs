//! Attention and offset mode enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PruneError;

/// Which attention activations are collected and pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum AttnMode {
    /// Neurons feeding the attention output projection.
    #[default]
    PreOut,
    /// Value-vector neurons.
    Value,
}

impl AttnMode {
    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttnMode::PreOut => "pre-out",
            AttnMode::Value => "value",
        }
    }
}

impl FromStr for AttnMode {
    type Err = PruneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-out" => Ok(AttnMode::PreOut),
            "value" => Ok(AttnMode::Value),
            other => Err(PruneError::InvalidAttnMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for AttnMode {
    type Error = PruneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttnMode> for String {
    fn from(mode: AttnMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for AttnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baseline that removed attention units settle at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OffsetMode {
    /// Removed units output exactly zero.
    Zero,
    /// Mean of the focus dataset attention activations.
    Mean,
    /// Peak of the raw focus attention activations, per `peak_mode`.
    #[default]
    Peak,
}

impl OffsetMode {
    /// Whether raw attention samples must be collected for this mode.
    pub fn needs_raw_attention(&self) -> bool {
        matches!(self, OffsetMode::Peak)
    }
}

/// How per-neuron attention scores are reduced to one score per head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeadReduction {
    #[default]
    Mean,
    Median,
    Max,
    Min,
}

/// Ranking scope for head selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeadSelection {
    /// Rank all heads of all layers together.
    #[default]
    Global,
    /// Remove the same number of heads from every layer.
    PerLayer,
}
