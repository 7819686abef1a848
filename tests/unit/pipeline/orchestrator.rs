use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use super::*;
use crate::{
    assets::media::{AudioPart, AudioPcm, VideoSourceInfo},
    collab::{FootageCandidate, VoiceParams},
    foundation::core::VideoFormat,
    plan::model::ScriptSegment,
};

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "reelforge_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

struct FakeSynth;

impl SpeechSynthesizer for FakeSynth {
    fn synthesize(&self, _text: &str, _voice: &VoiceParams, out: &Path) -> ReelforgeResult<()> {
        std::fs::write(out, b"wav").map_err(|e| ReelforgeError::validation(e.to_string()))
    }
}

struct FakeMedia;

impl MediaProbe for FakeMedia {
    fn audio_duration_sec(&self, _path: &Path) -> ReelforgeResult<f64> {
        Ok(2.0)
    }
    fn probe_video(&self, path: &Path) -> ReelforgeResult<VideoSourceInfo> {
        Ok(VideoSourceInfo {
            source_path: path.to_path_buf(),
            width: 1080,
            height: 1920,
            duration_sec: 6.0,
            has_audio: false,
        })
    }
    fn concat_audio(&self, _parts: &[AudioPart], out: &Path) -> ReelforgeResult<()> {
        std::fs::write(out, b"concat").map_err(|e| ReelforgeError::validation(e.to_string()))
    }
    fn decode_audio_f32_stereo(&self, _path: &Path, sample_rate: u32) -> ReelforgeResult<AudioPcm> {
        Ok(AudioPcm {
            sample_rate,
            channels: 2,
            interleaved_f32: vec![0.1; 256],
        })
    }
}

struct FakeProvider {
    empty: bool,
}

impl FootageProvider for FakeProvider {
    fn name(&self) -> &str {
        "stock"
    }
    fn search(&self, keyword: &str, _limit: usize) -> ReelforgeResult<Vec<FootageCandidate>> {
        if self.empty {
            return Ok(Vec::new());
        }
        Ok(vec![FootageCandidate {
            id: keyword.replace(' ', "-"),
            url: "https://example.test/v.mp4".to_string(),
            provider: "stock".to_string(),
            keyword: keyword.to_string(),
            duration_sec: 6.0,
            width: 1080,
            height: 1920,
        }])
    }
    fn download(&self, candidate: &FootageCandidate, dir: &Path) -> ReelforgeResult<PathBuf> {
        let path = dir.join(format!("{}.mp4", candidate.id));
        std::fs::write(&path, b"mp4").map_err(|e| ReelforgeError::validation(e.to_string()))?;
        Ok(path)
    }
}

struct FakeRenderer;

impl Renderer for FakeRenderer {
    fn render(&self, job: &RenderJob<'_>, out_path: &Path) -> ReelforgeResult<PathBuf> {
        assert!(!job.comp.clips.is_empty());
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::write(out_path, b"mp4").map_err(|e| ReelforgeError::validation(e.to_string()))?;
        Ok(out_path.to_path_buf())
    }
}

struct FlakyPublisher {
    failures_before_success: usize,
    attempts: Rc<Cell<usize>>,
}

impl Publisher for FlakyPublisher {
    fn publish(&self, _video: &Path, _request: &PublishRequest) -> ReelforgeResult<PublishReceipt> {
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);
        if attempt <= self.failures_before_success {
            return Err(ReelforgeError::validation("upstream 503"));
        }
        Ok(PublishReceipt {
            video_id: "vid123".to_string(),
            url: "https://videos.example/vid123".to_string(),
            published_at: chrono::Utc::now(),
        })
    }
}

fn segment(text: &str, keyword: &str) -> ScriptSegment {
    ScriptSegment {
        text: text.to_string(),
        keyword: keyword.to_string(),
        duration_sec: None,
        start_sec: None,
        end_sec: None,
    }
}

fn plan(title: &str, keywords: &[&str]) -> ContentPlan {
    ContentPlan {
        title: title.to_string(),
        description: "a test plan".to_string(),
        tags: vec!["test".to_string()],
        format: VideoFormat::Shorts,
        target_duration_sec: 30.0,
        language: "en".to_string(),
        tone: String::new(),
        segments: keywords
            .iter()
            .enumerate()
            .map(|(i, kw)| segment(&format!("Narration segment number {i}."), kw))
            .collect(),
    }
}

fn config_in(dir: &Path) -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.workdir = dir.join("work");
    cfg.output_dir = dir.join("out");
    cfg.music_dir = dir.join("music");
    cfg.publish_backoff = vec![
        Duration::from_millis(1),
        Duration::from_millis(1),
        Duration::from_millis(1),
    ];
    cfg
}

fn orchestrator(dir: &Path, footage_empty: bool, publisher: Option<Box<dyn Publisher>>) -> Orchestrator {
    let mut collab = Collaborators::new(
        Box::new(FakeSynth),
        Box::new(FakeMedia),
        Box::new(FakeRenderer),
    );
    collab.footage = vec![Box::new(FakeProvider {
        empty: footage_empty,
    })];
    collab.publisher = publisher;
    Orchestrator::new(config_in(dir), None, collab, dir.join("history.json")).unwrap()
}

fn request(plan: ContentPlan, publish: bool) -> JobRequest {
    JobRequest {
        job_id: None,
        plan,
        publish,
        overrides: None,
    }
}

#[test]
fn happy_path_reaches_completed_with_an_output() {
    let tmp = temp_dir("orch_happy");
    let orch = orchestrator(&tmp, false, None);

    let job = orch.run(request(plan("Ocean life", &["ocean", "reef"]), false));
    assert_eq!(job.status, JobStatus::Completed);
    let out = job.output_path.expect("rendered output path");
    assert!(out.exists());
    assert!(job.error_log.is_empty());

    let stats = orch.store().stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.completed, 1);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn publish_succeeds_on_the_third_attempt() {
    // Scenario: the publish collaborator fails twice, then succeeds; the job
    // must end Completed with the receipt recorded after three attempts.
    let tmp = temp_dir("orch_retry");
    let attempts = Rc::new(Cell::new(0));
    let orch = orchestrator(
        &tmp,
        false,
        Some(Box::new(FlakyPublisher {
            failures_before_success: 2,
            attempts: attempts.clone(),
        })),
    );

    let job = orch.run(request(plan("Ocean life", &["ocean"]), true));
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(attempts.get(), 3);
    assert_eq!(job.publish.unwrap().video_id, "vid123");

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn exhausted_publish_retries_fail_the_job() {
    let tmp = temp_dir("orch_retry_exhausted");
    let attempts = Rc::new(Cell::new(0));
    let orch = orchestrator(
        &tmp,
        false,
        Some(Box::new(FlakyPublisher {
            failures_before_success: 99,
            attempts: attempts.clone(),
        })),
    );

    let job = orch.run(request(plan("Ocean life", &["ocean"]), true));
    assert_eq!(job.status, JobStatus::Failed);
    // Backoff schedule of three delays allows four attempts.
    assert_eq!(attempts.get(), 4);
    assert!(job.error_log.iter().any(|e| e.contains("publish failed")));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn no_footage_anywhere_fails_with_composition_error() {
    // Scenario: the provider returns zero candidates for every keyword.
    let tmp = temp_dir("orch_nofootage");
    let orch = orchestrator(&tmp, true, None);

    let job = orch.run(request(plan("Ocean life", &["ocean", "reef"]), false));
    assert_eq!(job.status, JobStatus::Failed);
    assert!(
        job.error_log
            .iter()
            .any(|e| e.contains("composition failed"))
    );

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn status_history_is_monotonic_even_on_failure() {
    let tmp = temp_dir("orch_monotonic");
    let orch = orchestrator(&tmp, true, None);

    let job = orch.run(request(plan("Ocean life", &["ocean"]), false));
    let indices: Vec<u8> = job.history.iter().map(|s| s.stage_index()).collect();
    for pair in indices.windows(2) {
        assert!(pair[0] <= pair[1], "status went backwards: {indices:?}");
    }

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn every_status_change_is_persisted() {
    let tmp = temp_dir("orch_persist");
    let orch = orchestrator(&tmp, false, None);

    let job = orch.run(request(plan("Ocean life", &["ocean"]), false));
    let stored = orch.store().get(&job.id).expect("job persisted");
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.history, job.history);

    // The history file itself is on disk and readable.
    let bytes = std::fs::read(tmp.join("history.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn one_failed_job_does_not_abort_the_queue() {
    let tmp = temp_dir("orch_queue");
    let mut orch = orchestrator(&tmp, false, None);

    // The first plan has no keywords at all, so composition must fail; the
    // second is fine and must still run to completion.
    orch.enqueue(request(plan("Broken", &["", ""]), false));
    orch.enqueue(request(plan("Ocean life", &["ocean"]), false));

    let finished = orch.run_queue();
    assert_eq!(finished.len(), 2);
    assert_eq!(finished[0].status, JobStatus::Failed);
    assert_eq!(finished[1].status, JobStatus::Completed);

    let stats = orch.store().stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert!((stats.success_rate() - 0.5).abs() < 1e-9);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn invalid_plans_fail_in_planning() {
    let tmp = temp_dir("orch_invalid");
    let orch = orchestrator(&tmp, false, None);

    let mut bad = plan("Ocean life", &["ocean"]);
    bad.target_duration_sec = 0.0;
    let job = orch.run(request(bad, false));

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.history.last(), Some(&JobStatus::Failed));
    assert!(job.history.contains(&JobStatus::Planning));

    std::fs::remove_dir_all(&tmp).ok();
}
