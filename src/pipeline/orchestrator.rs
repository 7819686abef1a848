//! The pipeline orchestrator: drives the job state machine through its
//! stages, persists every status change, retries publishing with backoff, and
//! keeps aggregate statistics.
//!
//! Execution is single-job-at-a-time: a FIFO queue feeds one worker loop, and
//! all collaborator calls block. One job's failure never aborts a batch: the
//! failure is recorded on the job and the loop moves on.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use crate::{
    assets::collector::AssetCollector,
    assets::media::{MIX_SAMPLE_RATE, MediaProbe},
    assets::model::AssetBundle,
    audio::mix::{MusicBedSettings, build_music_bed, mix_tracks, write_mix_to_f32le_file},
    collab::{
        DefaultTrackFetcher, FootageProvider, ForcedAligner, LogProgress, ProgressSink,
        PublishReceipt, PublishRequest, Publisher, SpeechSynthesizer,
    },
    compose::planner::{CompositionPlan, plan_composition},
    config::{ConfigOverlay, PipelineConfig},
    foundation::error::{ReelforgeError, ReelforgeResult},
    job::model::{Job, JobStatus},
    job::store::JobStore,
    layout::text::{CaptionEvent, CaptionLayout, TextMeasurer, caption_cues, layout_caption, layout_title},
    plan::model::ContentPlan,
    plan::reconcile::reconcile_durations,
    render::encode::{RenderJob, Renderer},
};

/// The explicitly constructed collaborator set the orchestrator runs against.
///
/// Lifecycle belongs to the caller: build the collaborators at startup, hand
/// them over, and the orchestrator never re-initializes anything behind the
/// scenes.
pub struct Collaborators {
    /// Narration synthesis.
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    /// Optional forced alignment for timestamp-accurate timings.
    pub aligner: Option<Box<dyn ForcedAligner>>,
    /// Footage providers, queried in order.
    pub footage: Vec<Box<dyn FootageProvider>>,
    /// Optional out-of-band default-music acquisition.
    pub bgm_fetcher: Option<Box<dyn DefaultTrackFetcher>>,
    /// Optional publish target.
    pub publisher: Option<Box<dyn Publisher>>,
    /// Media measurement and transcoding.
    pub media: Box<dyn MediaProbe>,
    /// Compositing backend.
    pub renderer: Box<dyn Renderer>,
    /// Progress reporting.
    pub progress: Box<dyn ProgressSink>,
}

impl Collaborators {
    /// Collaborators with the default tracing progress sink and the given
    /// required pieces; optional collaborators start empty.
    pub fn new(
        synthesizer: Box<dyn SpeechSynthesizer>,
        media: Box<dyn MediaProbe>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        Self {
            synthesizer,
            aligner: None,
            footage: Vec::new(),
            bgm_fetcher: None,
            publisher: None,
            media,
            renderer,
            progress: Box::new(LogProgress),
        }
    }
}

/// One unit of work for the queue: a ready content plan plus job options.
pub struct JobRequest {
    /// Explicit job id; generated from the clock when absent.
    pub job_id: Option<String>,
    /// The script to turn into a video.
    pub plan: ContentPlan,
    /// Whether to publish after rendering.
    pub publish: bool,
    /// Caller-supplied configuration overrides for this job only.
    pub overrides: Option<ConfigOverlay>,
}

/// Drives jobs through `Pending → Planning → CollectingAssets → Editing →
/// Uploading → Completed`, with `Failed` reachable from every non-terminal
/// state.
pub struct Orchestrator {
    global: PipelineConfig,
    account_defaults: Option<ConfigOverlay>,
    collab: Collaborators,
    store: Arc<JobStore>,
    queue: VecDeque<JobRequest>,
}

/// Progress checkpoints reported as each stage begins.
const PROGRESS_PLANNING: u8 = 10;
const PROGRESS_COLLECTING: u8 = 30;
const PROGRESS_EDITING: u8 = 55;
const PROGRESS_UPLOADING: u8 = 80;
const PROGRESS_DONE: u8 = 100;

impl Orchestrator {
    /// Build an orchestrator over a job-history store at `history_path`.
    pub fn new(
        global: PipelineConfig,
        account_defaults: Option<ConfigOverlay>,
        collab: Collaborators,
        history_path: impl Into<PathBuf>,
    ) -> ReelforgeResult<Self> {
        global.validate()?;
        let store = Arc::new(JobStore::open(history_path)?);
        Ok(Self {
            global,
            account_defaults,
            collab,
            store,
            queue: VecDeque::new(),
        })
    }

    /// The job-history store backing this orchestrator.
    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Append a request to the FIFO queue.
    pub fn enqueue(&mut self, request: JobRequest) {
        self.queue.push_back(request);
    }

    /// Drain the queue, one job at a time. A failed job is recorded and the
    /// loop continues with the next request.
    pub fn run_queue(&mut self) -> Vec<Job> {
        let mut finished = Vec::new();
        while let Some(request) = self.queue.pop_front() {
            finished.push(self.run(request));
        }
        finished
    }

    /// Run one job to a terminal state. Never panics a batch: every failure
    /// ends as a persisted `Failed` job.
    pub fn run(&self, request: JobRequest) -> Job {
        let mut cfg = self
            .global
            .merged(self.account_defaults.as_ref(), request.overrides.as_ref());
        // The script's format decides the canvas for this job.
        cfg.format = request.plan.format;

        let job_id = request.job_id.clone().unwrap_or_else(generated_job_id);
        let mut job = Job::new(
            &job_id,
            &request.plan.title,
            cfg.format,
            request.plan.target_duration_sec,
        );
        self.persist(&job);
        self.collab
            .progress
            .progress(&format!("job started: {}", request.plan.title), 0);
        info!(job = %job_id, title = %request.plan.title, "job started");

        let mut plan = request.plan;
        let outcome = self.run_stages(&mut job, &mut plan, &cfg, request.publish);
        if let Err(e) = outcome {
            error!(job = %job_id, "job failed: {e}");
            job.record_error(e.to_string());
            if !job.status.is_terminal()
                && let Err(te) = job.transition(JobStatus::Failed)
            {
                warn!(job = %job_id, "could not mark job failed: {te}");
            }
            self.persist(&job);
        }

        let stats = self.store.stats();
        info!(
            total = stats.total,
            completed = stats.completed,
            failed = stats.failed,
            success_rate = stats.success_rate(),
            "job finished"
        );
        job
    }

    fn run_stages(
        &self,
        job: &mut Job,
        plan: &mut ContentPlan,
        cfg: &PipelineConfig,
        publish: bool,
    ) -> ReelforgeResult<()> {
        self.advance(job, JobStatus::Planning, "reconciling script timing", PROGRESS_PLANNING)?;
        cfg.validate()?;
        plan.validate()?;
        let outcome = reconcile_durations(plan, cfg);
        debug!(?outcome, "durations reconciled");

        self.advance(
            job,
            JobStatus::CollectingAssets,
            "collecting narration, footage, and music",
            PROGRESS_COLLECTING,
        )?;
        let mut rng = StdRng::from_entropy();
        let collector = AssetCollector::new(
            cfg,
            self.collab.synthesizer.as_ref(),
            self.collab.aligner.as_deref(),
            &self.collab.footage,
            self.collab.bgm_fetcher.as_deref(),
            self.collab.media.as_ref(),
        );
        let bundle = collector.collect(plan, &mut rng)?;

        self.advance(job, JobStatus::Editing, "composing and rendering", PROGRESS_EDITING)?;
        let comp = plan_composition(&bundle, cfg)?;
        let (captions, title) = self.build_layouts(plan, &bundle, cfg);
        let audio_path = self.mix_audio(&job.id, &bundle, &comp, cfg)?;

        let out_path = cfg.output_dir.join(format!("{}.mp4", job.id));
        let render_job = RenderJob {
            comp: &comp,
            captions: &captions,
            title: title.as_ref(),
            audio_f32le: audio_path.as_deref(),
            audio_sample_rate: MIX_SAMPLE_RATE,
        };
        let rendered = self.collab.renderer.render(&render_job, &out_path)?;
        job.output_path = Some(rendered);
        self.persist(job);

        if publish {
            if let Some(publisher) = &self.collab.publisher {
                self.advance(job, JobStatus::Uploading, "publishing video", PROGRESS_UPLOADING)?;
                let metadata = PublishRequest {
                    title: plan.title.clone(),
                    description: plan.description.clone(),
                    tags: plan.tags.clone(),
                };
                let video = job
                    .output_path
                    .clone()
                    .ok_or_else(|| ReelforgeError::publish("no rendered video to publish"))?;
                let receipt =
                    publish_with_retry(publisher.as_ref(), &video, &metadata, &cfg.publish_backoff)?;
                info!(url = %receipt.url, "published");
                job.publish = Some(receipt);
                self.persist(job);
            } else {
                warn!("publish requested but no publisher is configured");
            }
        }

        self.advance(job, JobStatus::Completed, "all stages complete", PROGRESS_DONE)?;
        Ok(())
    }

    /// Transition, persist, and report one stage boundary.
    fn advance(
        &self,
        job: &mut Job,
        to: JobStatus,
        message: &str,
        percent: u8,
    ) -> ReelforgeResult<()> {
        job.transition(to)?;
        self.persist(job);
        self.collab.progress.progress(message, percent);
        Ok(())
    }

    fn persist(&self, job: &Job) {
        if let Err(e) = self.store.upsert(job) {
            // History is best-effort durable; a write failure must not kill
            // the running job.
            warn!(job = %job.id, "job history write failed: {e}");
        }
    }

    /// Best-effort caption and title layout. Missing or unreadable fonts
    /// disable text rather than failing the job.
    fn build_layouts(
        &self,
        plan: &ContentPlan,
        bundle: &AssetBundle,
        cfg: &PipelineConfig,
    ) -> (Vec<CaptionEvent>, Option<CaptionLayout>) {
        let canvas = cfg.canvas();

        let mut events = Vec::new();
        match std::fs::read(&cfg.subtitle.font_path)
            .map_err(|e| ReelforgeError::validation(e.to_string()))
            .and_then(TextMeasurer::new)
        {
            Ok(mut measurer) => {
                for cue in caption_cues(&plan.segments, &bundle.timings, &cfg.subtitle) {
                    match layout_caption(&cue.text, canvas, &cfg.safe_zone, &cfg.subtitle, &mut measurer)
                    {
                        Ok(layout) => events.push(CaptionEvent {
                            start_sec: cue.start_sec,
                            end_sec: cue.start_sec + cue.duration_sec,
                            layout,
                        }),
                        Err(e) => warn!("caption layout failed: {e}"),
                    }
                }
            }
            Err(e) => warn!(
                font = %cfg.subtitle.font_path.display(),
                "caption font unavailable; rendering without captions: {e}"
            ),
        }

        let title = std::fs::read(&cfg.title.font_path)
            .map_err(|e| ReelforgeError::validation(e.to_string()))
            .and_then(TextMeasurer::new)
            .and_then(|mut measurer| {
                layout_title(&plan.title, canvas, &cfg.safe_zone, &cfg.title, &mut measurer)
            })
            .map_err(|e| {
                warn!("title layout unavailable: {e}");
                e
            })
            .ok();

        (events, title)
    }

    /// Decode, bed, and mix the job's audio; returns the raw f32le path, or
    /// `None` when there is nothing to mix.
    fn mix_audio(
        &self,
        job_id: &str,
        bundle: &AssetBundle,
        comp: &CompositionPlan,
        cfg: &PipelineConfig,
    ) -> ReelforgeResult<Option<PathBuf>> {
        let narration = match &bundle.narration {
            Some(track) => Some(
                self.collab
                    .media
                    .decode_audio_f32_stereo(&track.local_path, MIX_SAMPLE_RATE)
                    .map_err(|e| {
                        // Losing narration at mix time would desynchronize
                        // the video, so this is fatal.
                        ReelforgeError::composition(format!("narration decode failed: {e}"))
                    })?,
            ),
            None => None,
        };

        let bed = bundle.bgm.as_ref().and_then(|track| {
            match self
                .collab
                .media
                .decode_audio_f32_stereo(&track.local_path, MIX_SAMPLE_RATE)
            {
                Ok(pcm) => build_music_bed(
                    &pcm,
                    &MusicBedSettings {
                        target_duration_sec: comp.total_duration_sec,
                        fade_in_sec: cfg.music_fade_in_sec,
                        fade_out_sec: cfg.music_fade_out_sec,
                        requested_volume: track.volume.min(cfg.music_volume),
                        volume_floor: cfg.music_volume_floor,
                        volume_ceiling: cfg.music_volume_ceiling,
                    },
                ),
                Err(e) => {
                    warn!(track = %track.name, "music decode failed; continuing without: {e}");
                    None
                }
            }
        });

        let total_samples =
            (comp.total_duration_sec * f64::from(MIX_SAMPLE_RATE)).round() as usize * 2;
        let narration_samples = narration.as_ref().map(|p| p.interleaved_f32.as_slice());
        let Some(mixed) = mix_tracks(narration_samples, bed.as_deref(), total_samples) else {
            return Ok(None);
        };

        let path = cfg.workdir.join("audio").join(format!("{job_id}_mix.f32le"));
        write_mix_to_f32le_file(&mixed, &path)?;
        Ok(Some(path))
    }
}

/// Timestamped job id with a process-wide sequence suffix so that jobs
/// created within the same second stay distinct.
fn generated_job_id() -> String {
    static JOB_SEQ: AtomicU64 = AtomicU64::new(0);
    format!(
        "job_{}_{:03}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        JOB_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Publish with up to `backoff.len() + 1` attempts, sleeping between retries.
fn publish_with_retry(
    publisher: &dyn Publisher,
    video: &std::path::Path,
    metadata: &PublishRequest,
    backoff: &[std::time::Duration],
) -> ReelforgeResult<PublishReceipt> {
    let attempts = backoff.len() + 1;
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match publisher.publish(video, metadata) {
            Ok(receipt) => return Ok(receipt),
            Err(e) => {
                warn!(attempt, attempts, "publish attempt failed: {e}");
                last_error = e.to_string();
                if attempt < attempts {
                    std::thread::sleep(backoff[attempt - 1]);
                }
            }
        }
    }
    Err(ReelforgeError::publish(format!(
        "upload failed after {attempts} attempts: {last_error}"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
