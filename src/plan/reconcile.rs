use tracing::debug;

use crate::{
    config::{NarrationRate, PipelineConfig},
    plan::model::ContentPlan,
};

/// What the reconciler did to a plan. Purely informational; callers log it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Segments whose missing estimate was filled from the narration rate.
    pub estimated: usize,
    /// Scale factor applied to every segment, 1.0 when no rescale happened.
    pub scale: f64,
    /// Residual applied to the last segment, 0.0 when within tolerance.
    pub residual_sec: f64,
}

/// Normalize per-segment duration estimates so they sum close to the plan's
/// target duration.
///
/// Estimates here are planning-grade only: the asset collector supersedes
/// them with measured values once synthesis runs. The function is total: an
/// empty plan is a no-op and nothing here can fail.
///
/// Steps, in order:
/// 1. Missing estimates are filled from the language narration rate.
/// 2. If the sum is off target by more than the rescale tolerance, every
///    segment is scaled by `target / sum` (rounded to 0.1 s, floor 0.1 s).
/// 3. A remaining residual above the residual tolerance is applied entirely
///    to the last segment, clamped to the minimum segment duration.
pub fn reconcile_durations(plan: &mut ContentPlan, cfg: &PipelineConfig) -> ReconcileOutcome {
    let rate = NarrationRate::for_language(&plan.language);
    reconcile_with_rate(plan, rate, cfg)
}

/// [`reconcile_durations`] with an explicit narration rate.
pub fn reconcile_with_rate(
    plan: &mut ContentPlan,
    rate: NarrationRate,
    cfg: &PipelineConfig,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome {
        scale: 1.0,
        ..ReconcileOutcome::default()
    };
    if plan.segments.is_empty() {
        return outcome;
    }

    for segment in &mut plan.segments {
        match segment.duration_sec {
            Some(d) if d > 0.0 => {}
            _ => {
                segment.duration_sec = Some(round_tenth(rate.estimate_sec(&segment.clean_text())));
                outcome.estimated += 1;
            }
        }
    }

    let target = plan.target_duration_sec;
    let mut total = plan.estimated_total_sec();
    debug!(total, target, "segment estimates before reconciliation");

    if (total - target).abs() > cfg.rescale_tolerance_sec && total > 0.0 {
        let scale = target / total;
        for segment in &mut plan.segments {
            if let Some(d) = segment.duration_sec {
                segment.duration_sec = Some(round_tenth(d * scale).max(0.1));
            }
        }
        outcome.scale = scale;
        total = plan.estimated_total_sec();
        debug!(scale, total, "rescaled segment estimates");
    }

    let residual = target - total;
    if residual.abs() > cfg.residual_tolerance_sec
        && let Some(last) = plan.segments.last_mut()
        && let Some(d) = last.duration_sec
    {
        last.duration_sec = Some((d + residual).max(cfg.min_segment_sec));
        outcome.residual_sec = residual;
        debug!(
            residual,
            last = last.duration_sec,
            "applied residual to last segment"
        );
    }

    outcome
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
#[path = "../../tests/unit/plan/reconcile.rs"]
mod tests;
