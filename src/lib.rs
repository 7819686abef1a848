//! Reelforge is a script-to-video pipeline engine.
//!
//! It turns a structured script (a title plus ordered narration segments)
//! into one rendered video whose narration audio, background footage,
//! background music, and burned-in captions stay mutually time-synchronized.
//! Upstream duration estimates are all wrong in different ways (character
//! heuristics, provider-reported clip lengths, AI pacing guesses), so the
//! engine converges on one authoritative timeline instead of trusting any of
//! them.
//!
//! # Pipeline overview
//!
//! 1. **Reconcile**: normalize per-segment estimates toward the target
//!    duration ([`reconcile_durations`])
//! 2. **Collect**: synthesize narration per segment, re-measure every file,
//!    gather footage through a keyword cache, pick music
//!    ([`AssetCollector`])
//! 3. **Compose**: convert measured narration timing into a per-clip
//!    allocation with crossfade compensation ([`plan_composition`])
//! 4. **Lay out**: safe-zone-constrained captions and titles measured with
//!    real font metrics ([`layout_caption`], [`layout_title`])
//! 5. **Mix**: loop/fade/clamp the music bed under the narration
//!    ([`build_music_bed`], [`mix_tracks`])
//! 6. **Render**: one ffmpeg invocation per job ([`FfmpegRenderer`])
//! 7. **Orchestrate**: a closed job state machine with persisted history and
//!    publish retries ([`Orchestrator`])
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Measured over estimated**: once real narration exists, its measured
//!   duration is authoritative and everything else is fit to it.
//! - **Degrade, don't die**: a missing clip or missing music reduces
//!   richness; only conditions that would desynchronize the video fail a
//!   job.
//! - **Blocking collaborators**: all external calls are synchronous; one job
//!   runs at a time per orchestrator instance.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod audio;
mod bgm;
mod compose;
mod foundation;
mod job;
mod layout;
mod pipeline;
mod plan;
mod render;

/// Collaborator interfaces the pipeline is driven against.
pub mod collab;
/// Typed pipeline configuration and overlay merging.
pub mod config;

pub use assets::cache::FootageCache;
pub use assets::collector::{AssetCollector, synthesis_cache_key};
pub use assets::media::{
    AudioPart, AudioPcm, FfmpegMedia, MIX_SAMPLE_RATE, MediaProbe, VideoSourceInfo,
    ensure_parent_dir, is_ffmpeg_on_path,
};
pub use assets::model::{AssetBundle, BgmTrack, NarrationTrack, SegmentTiming, StockClip};
pub use audio::mix::{MusicBedSettings, build_music_bed, mix_tracks, write_mix_to_f32le_file};
pub use bgm::catalog::BgmCatalog;
pub use bgm::select::{infer_mood, select_bgm};
pub use compose::planner::{ClipSchedule, CompositionPlan, plan_composition};
pub use foundation::core::{Canvas, Mood, VideoFormat};
pub use foundation::error::{ReelforgeError, ReelforgeResult};
pub use job::model::{Job, JobStatus};
pub use job::store::{JobStats, JobStore};
pub use layout::text::{
    CaptionCue, CaptionEvent, CaptionLayout, DESCENDER_MARGIN_RATIO, TextMeasurer, TextMetrics,
    caption_cues, clamp_into_band, layout_caption, layout_title, place_text_block,
    split_caption_chunks, strip_decorations, wrap_to_width,
};
pub use layout::visual::{aspect_fit_crop, ken_burns_crop, ken_burns_zoom};
pub use pipeline::orchestrator::{Collaborators, JobRequest, Orchestrator};
pub use plan::model::{ContentPlan, ScriptSegment};
pub use plan::reconcile::{ReconcileOutcome, reconcile_durations, reconcile_with_rate};
pub use render::encode::{FfmpegRenderer, RenderJob, Renderer};
