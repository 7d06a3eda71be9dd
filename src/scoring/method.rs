//! Built-in scoring methods.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Zip};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::{RankOrder, ScoringFunction};
use crate::activations::ActivationStats;
use crate::error::{PruneError, Result};

/// Named scoring methods.
///
/// Every method except [`Random`](ScoringMethod::Random) is the ratio of a
/// focus statistic to the same cripple statistic, so a unit that is busy on
/// the focus data and quiet on the cripple data scores high and is kept.
///
/// A unit whose statistic is exactly zero on both datasets is silent, most
/// often because an earlier round already removed it. It scores
/// [`SILENT_SCORE`] so that recollected activations never select it again
/// ahead of live units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Mean absolute activation.
    #[default]
    Abs,
    /// Fraction of tokens where the unit fires (is positive).
    Freq,
    /// Mean of `sqrt(|x|)`, less sensitive to outliers than `abs`.
    Sqrt,
    /// Standard deviation.
    Std,
    /// Root mean square.
    Rms,
    /// Uniform noise; used for the random baseline.
    Random,
}

impl ScoringMethod {
    pub const ALL: [ScoringMethod; 6] = [
        ScoringMethod::Abs,
        ScoringMethod::Freq,
        ScoringMethod::Sqrt,
        ScoringMethod::Std,
        ScoringMethod::Rms,
        ScoringMethod::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMethod::Abs => "abs",
            ScoringMethod::Freq => "freq",
            ScoringMethod::Sqrt => "sqrt",
            ScoringMethod::Std => "std",
            ScoringMethod::Rms => "rms",
            ScoringMethod::Random => "random",
        }
    }

    fn statistic<'a>(&self, stats: &'a ActivationStats) -> Option<&'a Array2<f32>> {
        match self {
            ScoringMethod::Abs => Some(stats.abs_mean()),
            ScoringMethod::Freq => Some(stats.pos_frac()),
            ScoringMethod::Sqrt => Some(stats.sqrt_mean()),
            ScoringMethod::Std => Some(stats.std()),
            ScoringMethod::Rms => Some(stats.rms()),
            ScoringMethod::Random => None,
        }
    }
}

impl ScoringFunction for ScoringMethod {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn rank_order(&self) -> RankOrder {
        RankOrder::Ascending
    }

    fn score(
        &self,
        focus: &ActivationStats,
        cripple: &ActivationStats,
        eps: f32,
        rng: &mut dyn RngCore,
    ) -> Result<Array2<f32>> {
        let (Some(f), Some(c)) = (self.statistic(focus), self.statistic(cripple)) else {
            return Ok(Array2::from_shape_fn(focus.dim(), |_| rng.random::<f32>()));
        };
        Ok(Zip::from(f).and(c).map_collect(|&f, &c| {
            if f == 0.0 && c == 0.0 {
                SILENT_SCORE
            } else {
                ratio(f, c, eps)
            }
        }))
    }
}

/// Score of a unit that is silent on both datasets; ranks last under
/// [`RankOrder::Ascending`].
pub const SILENT_SCORE: f32 = f32::MAX;

/// `numerator / (denominator + eps)`, kept finite.
///
/// `0 / 0` is 1 (no evidence either way) and `x / 0` saturates at
/// `f32::MAX`. NaN inputs stay NaN so the caller can report them.
pub fn ratio(numerator: f32, denominator: f32, eps: f32) -> f32 {
    let denominator = denominator + eps;
    if denominator == 0.0 {
        return if numerator == 0.0 { 1.0 } else { f32::MAX.copysign(numerator) };
    }
    let r = numerator / denominator;
    if r.is_infinite() {
        f32::MAX.copysign(r)
    } else {
        r
    }
}

impl FromStr for ScoringMethod {
    type Err = PruneError;

    fn from_str(s: &str) -> Result<Self> {
        ScoringMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| PruneError::UnknownStrategy {
                kind: "scoring method",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
