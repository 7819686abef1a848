use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    assets::model::{AssetBundle, SegmentTiming},
    config::PipelineConfig,
    foundation::core::Canvas,
    foundation::error::{ReelforgeError, ReelforgeResult},
};

/// How one footage clip is placed on the timeline.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ClipSchedule {
    /// Source file.
    pub source: PathBuf,
    /// Source resolution `(width, height)`.
    pub source_resolution: (u32, u32),
    /// Native source length in seconds.
    pub native_duration_sec: f64,
    /// Times the source is played back-to-back before trimming. 1 = no loop.
    pub loops: u32,
    /// Allocated on-timeline duration, including the crossfade overlap for
    /// every clip except the last.
    pub duration_sec: f64,
    /// Timeline start: cumulative prior durations minus the accumulated
    /// crossfade overlaps.
    pub timeline_start_sec: f64,
    /// Whether the clip fades in (every clip except the first).
    pub fade_in: bool,
    /// Whether the clip fades out (every clip except the last).
    pub fade_out: bool,
}

/// The complete per-clip allocation for one job.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CompositionPlan {
    /// Output canvas.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: u32,
    /// Authoritative video length: the measured narration duration.
    pub total_duration_sec: f64,
    /// Crossfade overlap between adjacent clips.
    pub crossfade_sec: f64,
    /// Peak Ken Burns zoom factor applied across each clip.
    pub ken_burns_ratio: f64,
    /// Ordered clip placements.
    pub clips: Vec<ClipSchedule>,
}

/// Convert final measured narration timing into a per-clip allocation.
///
/// The measured narration duration is authoritative; the plan-level target
/// is discarded once real narration exists. Every clip except the last gets
/// the crossfade overlap added on top of its base share; the last clip
/// absorbs whatever residual remains so the total never drifts from the
/// narration:
///
/// `Σ allocated − (clips − 1) × crossfade == total_duration_sec`
pub fn plan_composition(
    bundle: &AssetBundle,
    cfg: &PipelineConfig,
) -> ReelforgeResult<CompositionPlan> {
    let clips = bundle.usable_clips();
    if clips.is_empty() {
        return Err(ReelforgeError::composition("no usable footage clips"));
    }

    let authoritative = bundle
        .narration
        .as_ref()
        .map(|n| n.duration_sec)
        .filter(|d| *d > 0.0)
        .unwrap_or_else(|| bundle.timings.iter().map(|t| t.duration_sec).sum());
    if !(authoritative.is_finite() && authoritative > 0.0) {
        return Err(ReelforgeError::composition(
            "no measured narration duration to compose against",
        ));
    }

    let base = base_allocations(&bundle.timings, clips.len(), authoritative);

    // A crossfade longer than the shortest clip share would push timeline
    // starts backwards; cap it rather than fail the job.
    let min_base = base.iter().copied().fold(f64::INFINITY, f64::min);
    let mut crossfade = if clips.len() > 1 { cfg.crossfade_sec } else { 0.0 };
    if crossfade > 0.0 && min_base < crossfade * 2.0 {
        crossfade = (min_base / 2.0).max(0.0);
        warn!(crossfade, "crossfade capped to half the shortest clip share");
    }

    let mut schedules = Vec::<ClipSchedule>::with_capacity(clips.len());
    let mut allocated_sum = 0.0f64;
    let last = clips.len() - 1;

    for (i, clip) in clips.iter().enumerate() {
        let duration = if i < last {
            base[i] + crossfade
        } else {
            let head: f64 = base[..last].iter().sum();
            (authoritative - head).max(cfg.min_segment_sec)
        };

        let timeline_start = allocated_sum - (i as f64) * crossfade;

        let native = clip.duration_sec;
        let loops = if native > 0.0 && native < duration {
            (duration / native).ceil() as u32
        } else {
            1
        };

        let source = clip
            .local_path
            .clone()
            .ok_or_else(|| ReelforgeError::composition("usable clip lost its local path"))?;

        schedules.push(ClipSchedule {
            source,
            source_resolution: clip.resolution,
            native_duration_sec: native,
            loops,
            duration_sec: duration,
            timeline_start_sec: timeline_start,
            fade_in: i > 0,
            fade_out: i < last,
        });
        allocated_sum += duration;
        debug!(
            clip = i,
            duration, timeline_start, loops, "clip allocation"
        );
    }

    info!(
        clips = schedules.len(),
        total = authoritative,
        crossfade,
        "composition planned"
    );

    Ok(CompositionPlan {
        canvas: cfg.canvas(),
        fps: cfg.fps,
        total_duration_sec: authoritative,
        crossfade_sec: crossfade,
        ken_burns_ratio: cfg.ken_burns_ratio,
        clips: schedules,
    })
}

/// Base (pre-overlap) allocation of narration time across `clip_count` clips.
///
/// With a 1:1 count match each clip takes its segment's measured duration;
/// otherwise segments are partitioned into contiguous, evenly-sized index
/// ranges and each range's durations are summed. With no timings at all the
/// narration is split evenly.
fn base_allocations(timings: &[SegmentTiming], clip_count: usize, total: f64) -> Vec<f64> {
    if timings.len() == clip_count {
        return timings.iter().map(|t| t.duration_sec).collect();
    }
    if timings.is_empty() {
        return vec![total / clip_count as f64; clip_count];
    }

    let n = timings.len();
    (0..clip_count)
        .map(|i| {
            let lo = i * n / clip_count;
            let hi = (i + 1) * n / clip_count;
            timings[lo..hi].iter().map(|t| t.duration_sec).sum()
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/compose/planner.rs"]
mod tests;
