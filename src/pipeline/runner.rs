//! Multi-iteration pruning runs.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::offsets::apply_attn_offsets;
use super::orchestrator::{collect, evaluate, prune_and_evaluate_tracked, Precomputed};
use super::random::{prune_random_and_evaluate, RandomPruneState};
use super::stage::PruningStage;
use crate::config::{OffsetMode, PruningConfig};
use crate::error::Result;
use crate::history::{RunDataHistory, RunDataItem};
use crate::model::PrunableModel;

/// How activations are obtained across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationStrategy {
    /// Both groups scored randomly; no activations are needed beyond offsets.
    RandomBaseline,
    /// Activations recollected at the start of every iteration.
    Recompute,
    /// Activations collected once; fractions ramp with the iteration index.
    FixedActivations,
}

impl IterationStrategy {
    pub fn from_config(config: &PruningConfig) -> Self {
        if config.is_random_baseline() {
            IterationStrategy::RandomBaseline
        } else if config.recalculate_activations() {
            IterationStrategy::Recompute
        } else {
            IterationStrategy::FixedActivations
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IterationStrategy::RandomBaseline => "Random Baseline",
            IterationStrategy::Recompute => "Recompute",
            IterationStrategy::FixedActivations => "Fixed Activations",
        }
    }
}

/// A pruning run over one model.
///
/// Owns the history and the random state for the run's lifetime. The
/// history collected so far stays readable after a failed [`run`](Self::run).
pub struct PruningRun<'m, M: PrunableModel + ?Sized> {
    model: &'m mut M,
    config: PruningConfig,
    strategy: IterationStrategy,
    stage: PruningStage,
    history: RunDataHistory,
    rng: StdRng,
    random_state: Option<RandomPruneState>,
    error: Option<String>,
}

impl<'m, M: PrunableModel + ?Sized> PruningRun<'m, M> {
    /// Validate `config` and prepare a run. The model is not touched.
    pub fn new(model: &'m mut M, config: PruningConfig) -> Result<Self> {
        config.validate()?;
        let strategy = IterationStrategy::from_config(&config);
        let rng = StdRng::seed_from_u64(config.seed());
        Ok(Self {
            model,
            config,
            strategy,
            stage: PruningStage::Idle,
            history: RunDataHistory::new(),
            rng,
            random_state: None,
            error: None,
        })
    }

    pub fn config(&self) -> &PruningConfig {
        &self.config
    }

    pub fn strategy(&self) -> IterationStrategy {
        self.strategy
    }

    pub fn stage(&self) -> PruningStage {
        self.stage
    }

    pub fn history(&self) -> &RunDataHistory {
        &self.history
    }

    pub fn into_history(self) -> RunDataHistory {
        self.history
    }

    /// Cumulative masks of the random baseline, once it has started.
    pub fn random_state(&self) -> Option<&RandomPruneState> {
        self.random_state.as_ref()
    }

    /// Message of the error that stopped the run, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Run every iteration. On error the stage becomes
    /// [`PruningStage::Failed`] and the rows added so far are kept.
    pub fn run(&mut self) -> Result<()> {
        if self.stage.is_terminal() {
            tracing::warn!(stage = self.stage.display_name(), "pruning run already finished");
            return Ok(());
        }

        tracing::info!(
            strategy = self.strategy.display_name(),
            n_steps = self.config.n_steps(),
            ff_frac = self.config.ff_frac(),
            attn_frac = self.config.attn_frac(),
            focus = self.config.focus(),
            cripple = self.config.cripple(),
            "starting pruning run"
        );

        match self.run_inner() {
            Ok(()) => {
                self.stage.enter(PruningStage::Complete);
                tracing::info!(rows = self.history.len(), "pruning run complete");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    stage = self.stage.display_name(),
                    rows = self.history.len(),
                    "pruning run failed"
                );
                self.error = Some(e.to_string());
                self.stage.enter(PruningStage::Failed);
                Err(e)
            }
        }
    }

    fn run_inner(&mut self) -> Result<()> {
        if self.config.run_pre_test() {
            self.stage.enter(PruningStage::Evaluating);
            let mut item = RunDataItem::new();
            item.merge_metrics(evaluate(&mut *self.model, &self.config)?);
            self.history.add(item);
        }

        match self.strategy {
            IterationStrategy::RandomBaseline => self.run_random(),
            IterationStrategy::Recompute => self.run_recompute(),
            IterationStrategy::FixedActivations => self.run_fixed(),
        }
    }

    fn run_random(&mut self) -> Result<()> {
        self.apply_offsets_from_focus()?;

        let state = self
            .random_state
            .get_or_insert_with(|| RandomPruneState::new(self.model.dims()));
        for i in 0..self.config.n_steps() {
            tracing::info!(iteration = i, "random pruning iteration");
            let item = prune_random_and_evaluate(&mut *self.model, &self.config, state, &mut self.rng)?;
            self.history.add(item);
        }
        Ok(())
    }

    fn run_recompute(&mut self) -> Result<()> {
        self.apply_offsets_from_focus()?;

        for i in 0..self.config.n_steps() {
            tracing::info!(iteration = i, "pruning iteration");
            let item = prune_and_evaluate_tracked(
                &mut *self.model,
                &self.config,
                None,
                &mut self.rng,
                &mut self.stage,
            )?;
            self.history.add(item);
        }
        Ok(())
    }

    fn run_fixed(&mut self) -> Result<()> {
        let needs_raw = self.config.attn_offset_mode().needs_raw_attention();
        self.stage.enter(PruningStage::Collecting);
        let focus = collect(&mut *self.model, &self.config, self.config.focus(), needs_raw)?;
        let cripple = collect(&mut *self.model, &self.config, self.config.cripple(), false)?;
        apply_attn_offsets(&mut *self.model, &self.config, &focus)?;

        for iteration in 0..self.config.n_steps() {
            tracing::info!(iteration, "pruning iteration");
            let pre = Precomputed { focus: &focus, cripple: &cripple, iteration };
            let item = prune_and_evaluate_tracked(
                &mut *self.model,
                &self.config,
                Some(pre),
                &mut self.rng,
                &mut self.stage,
            )?;
            self.history.add(item);
        }
        Ok(())
    }

    /// Collect focus activations only when the offset mode needs them.
    fn apply_offsets_from_focus(&mut self) -> Result<()> {
        let mode = self.config.attn_offset_mode();
        if mode == OffsetMode::Zero {
            return Ok(());
        }
        self.stage.enter(PruningStage::Collecting);
        let focus = collect(&mut *self.model, &self.config, self.config.focus(), mode.needs_raw_attention())?;
        apply_attn_offsets(&mut *self.model, &self.config, &focus)
    }
}

/// Run a full pruning experiment on `model` and return its history.
///
/// Use [`PruningRun`] directly to keep the partial history when a step fails.
pub fn run_pruning<M>(model: &mut M, config: PruningConfig) -> Result<RunDataHistory>
where
    M: PrunableModel + ?Sized,
{
    let mut run = PruningRun::new(model, config)?;
    run.run()?;
    Ok(run.into_history())
}
