//! One pruning iteration: score, select, delete, evaluate.

use ndarray::Array2;
use rand::RngCore;

use super::stage::PruningStage;
use crate::activations::{ActivationStats, ActivationSummary};
use crate::config::PruningConfig;
use crate::error::{PruneError, Result};
use crate::history::{artifacts, RunDataItem};
use crate::model::{EvalMetrics, ModelDims, PrunableModel};
use crate::scoring::{score_units, RankOrder, ScoringFunction};
use crate::select::{select_heads, top_fraction, Selection};

/// Activations collected ahead of time, reused across iterations.
#[derive(Debug, Clone, Copy)]
pub struct Precomputed<'a> {
    pub focus: &'a ActivationSummary,
    pub cripple: &'a ActivationSummary,
    /// Zero-based iteration index; fractions are ramped by `iteration + 1`.
    pub iteration: usize,
}

/// Score both unit groups from the given activations, delete the selected
/// units from `model`, and return the result row without metrics.
///
/// The model is mutated in place and is not restored on error.
pub fn score_and_prune<M>(
    model: &mut M,
    focus: &ActivationSummary,
    cripple: &ActivationSummary,
    config: &PruningConfig,
    rng: &mut dyn RngCore,
) -> Result<RunDataItem>
where
    M: PrunableModel + ?Sized,
{
    let mut stage = PruningStage::Idle;
    score_and_prune_tracked(model, focus, cripple, config, rng, &mut stage)
}

/// Run one full iteration: collect activations (or ramp precomputed ones),
/// prune, then evaluate on every configured dataset.
pub fn prune_and_evaluate<M>(
    model: &mut M,
    config: &PruningConfig,
    precomputed: Option<Precomputed<'_>>,
    rng: &mut dyn RngCore,
) -> Result<RunDataItem>
where
    M: PrunableModel + ?Sized,
{
    let mut stage = PruningStage::Idle;
    prune_and_evaluate_tracked(model, config, precomputed, rng, &mut stage)
}

pub(crate) fn prune_and_evaluate_tracked<M>(
    model: &mut M,
    config: &PruningConfig,
    precomputed: Option<Precomputed<'_>>,
    rng: &mut dyn RngCore,
    stage: &mut PruningStage,
) -> Result<RunDataItem>
where
    M: PrunableModel + ?Sized,
{
    stage.enter(PruningStage::Validating);
    config.validate()?;

    let mut item = if config.recalculate_activations() {
        stage.enter(PruningStage::Collecting);
        let focus = collect(model, config, config.focus(), false)?;
        let cripple = collect(model, config, config.cripple(), false)?;
        score_and_prune_tracked(model, &focus, &cripple, config, rng, stage)?
    } else {
        let pre = precomputed.ok_or(PruneError::MissingActivations)?;
        let scaled = config.scaled_for_iteration(pre.iteration);
        tracing::info!(
            iteration = pre.iteration,
            ff_frac = scaled.ff_frac(),
            attn_frac = scaled.attn_frac(),
            "ramped pruning fractions"
        );
        score_and_prune_tracked(model, pre.focus, pre.cripple, &scaled, rng, stage)?
    };

    stage.enter(PruningStage::Evaluating);
    item.merge_metrics(evaluate(model, config)?);
    Ok(item)
}

pub(crate) fn score_and_prune_tracked<M>(
    model: &mut M,
    focus: &ActivationSummary,
    cripple: &ActivationSummary,
    config: &PruningConfig,
    rng: &mut dyn RngCore,
    stage: &mut PruningStage,
) -> Result<RunDataItem>
where
    M: PrunableModel + ?Sized,
{
    stage.enter(PruningStage::Validating);
    config.ensure_prunable()?;
    let dims = model.dims();
    let key = config.scoring_normalization();

    // resolve every input before the first mutation
    let ff_inputs = if config.does_ff() {
        let pair = (focus.ff.get(key)?, cripple.ff.get(key)?);
        check_dims("ff activations", pair.0, (dims.n_layers, dims.d_mlp))?;
        Some(pair)
    } else {
        None
    };
    let attn_inputs = if config.does_attn() {
        let pair = (focus.attn.get(key)?, cripple.attn.get(key)?);
        check_dims("attn activations", pair.0, (dims.n_layers, dims.attn_units()))?;
        Some(pair)
    } else {
        None
    };
    let attn_mean_offsets = if config.does_attn() && config.do_attn_mean_offset() {
        Some(focus.attn_mean()?.clone())
    } else {
        None
    };

    // score and select both groups first, so a scoring failure leaves the
    // model untouched
    let ff_pruning = match ff_inputs {
        Some((f, c)) => {
            stage.enter(PruningStage::ScoringFf);
            let method = config.ff_scoring();
            let scores = score_units(&method, f, c, config.ff_eps(), rng)?;
            let selection = top_fraction(scores.view(), config.ff_frac(), method.rank_order())?;
            Some((scores, selection))
        }
        None => None,
    };
    let attn_pruning = match attn_inputs {
        Some((f, c)) => {
            stage.enter(PruningStage::ScoringAttn);
            let method = config.attn_scoring();
            let scores = score_units(&method, f, c, config.attn_eps(), rng)?;
            let selection = select_attn(&scores, config, dims, method.rank_order())?;
            Some((scores, selection))
        }
        None => None,
    };

    let mut item = RunDataItem::new();

    if let Some((scores, selection)) = ff_pruning {
        stage.enter(PruningStage::PruningFf);
        model
            .delete_ff(&selection.criteria, None)
            .map_err(PruneError::model("delete_ff"))?;
        tracing::info!(
            removed = selection.count(),
            threshold = selection.threshold,
            frac = config.ff_frac(),
            "pruned feed-forward neurons"
        );
        item.record_ff(Some(scores), &selection);
    }

    if let Some((scores, selection)) = attn_pruning {
        stage.enter(PruningStage::PruningAttn);
        model
            .delete_attn(config.attn_mode(), &selection.criteria, attn_mean_offsets.as_ref())
            .map_err(PruneError::model("delete_attn"))?;
        tracing::info!(
            removed = selection.count(),
            threshold = selection.threshold,
            frac = config.attn_frac(),
            heads = config.attn_prune_heads(),
            mode = %config.attn_mode(),
            "pruned attention units"
        );
        item.record_attn(Some(scores), &selection);
    }

    if let Some(dir) = config.save_raw_dir() {
        artifacts::save_timestamped(dir, &item.raw)?;
    }

    Ok(item)
}

fn select_attn(
    scores: &Array2<f32>,
    config: &PruningConfig,
    dims: ModelDims,
    order: RankOrder,
) -> Result<Selection> {
    if config.attn_prune_heads() {
        select_heads(
            scores.view(),
            dims.n_heads,
            dims.d_head,
            config.attn_prune_heads_mode(),
            config.head_selection(),
            config.attn_frac(),
            order,
        )
    } else {
        top_fraction(scores.view(), config.attn_frac(), order)
    }
}

fn check_dims(context: &'static str, stats: &ActivationStats, expected: (usize, usize)) -> Result<()> {
    if stats.dim() != expected {
        let got = stats.dim();
        return Err(PruneError::ShapeMismatch {
            context,
            expected: vec![expected.0, expected.1],
            got: vec![got.0, got.1],
        });
    }
    Ok(())
}

pub(crate) fn collect<M>(
    model: &mut M,
    config: &PruningConfig,
    dataset: &str,
    collect_raw_attention: bool,
) -> Result<ActivationSummary>
where
    M: PrunableModel + ?Sized,
{
    tracing::info!(dataset, samples = config.collection_sample_size(), "collecting activations");
    model
        .collect_activations(
            dataset,
            config.collection_sample_size(),
            config.attn_mode(),
            collect_raw_attention,
        )
        .map_err(PruneError::model("collect_activations"))
}

/// Evaluate on every configured dataset, skipping the tokens used for
/// collection.
pub(crate) fn evaluate<M>(model: &mut M, config: &PruningConfig) -> Result<EvalMetrics>
where
    M: PrunableModel + ?Sized,
{
    model
        .evaluate(
            config.eval_sample_size(),
            &config.datasets(),
            config.collection_sample_size(),
        )
        .map_err(PruneError::model("evaluate"))
}
