//! Pruning iteration stage enum

use serde::{Deserialize, Serialize};

/// Current stage of a pruning iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PruningStage {
    /// Not started.
    #[default]
    Idle,
    /// Checking the configuration; nothing has been mutated yet.
    Validating,
    /// Running datasets through the model for activation statistics.
    Collecting,
    /// Scoring feed-forward neurons.
    ScoringFf,
    /// Scoring attention units.
    ScoringAttn,
    /// Masking feed-forward neurons.
    PruningFf,
    /// Masking attention units or heads.
    PruningAttn,
    /// Evaluating the pruned model.
    Evaluating,
    /// Run complete.
    Complete,
    /// Run failed.
    Failed,
}

impl PruningStage {
    /// Check if work is in progress (non-terminal, not idle).
    pub fn is_active(&self) -> bool {
        !matches!(self, PruningStage::Idle) && !self.is_terminal()
    }

    /// Check if the run is over (success or failure).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PruningStage::Complete | PruningStage::Failed)
    }

    /// Whether the model may already have been modified when in this stage.
    pub fn may_have_mutated(&self) -> bool {
        matches!(
            self,
            PruningStage::PruningFf
                | PruningStage::PruningAttn
                | PruningStage::Evaluating
                | PruningStage::Complete
        )
    }

    /// Get display name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            PruningStage::Idle => "Idle",
            PruningStage::Validating => "Validating",
            PruningStage::Collecting => "Collecting Activations",
            PruningStage::ScoringFf => "Scoring FF",
            PruningStage::PruningFf => "Pruning FF",
            PruningStage::ScoringAttn => "Scoring Attention",
            PruningStage::PruningAttn => "Pruning Attention",
            PruningStage::Evaluating => "Evaluating",
            PruningStage::Complete => "Complete",
            PruningStage::Failed => "Failed",
        }
    }

    /// Move to `next`, logging the transition.
    pub(crate) fn enter(&mut self, next: PruningStage) {
        tracing::debug!(from = self.display_name(), to = next.display_name(), "pruning stage");
        *self = next;
    }
}
