use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::{
    assets::media::{AudioPart, AudioPcm, MediaProbe, VideoSourceInfo},
    collab::{FootageCandidate, WordSpan},
    foundation::error::ReelforgeError,
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

fn plan_with(segments: Vec<ScriptSegment>) -> ContentPlan {
    ContentPlan {
        title: "Ocean life".to_string(),
        description: String::new(),
        tags: vec![],
        format: Default::default(),
        target_duration_sec: 30.0,
        language: "en".to_string(),
        tone: String::new(),
        segments,
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

struct FakeSynth {
    fail: bool,
}

impl FakeSynth {
    fn new() -> Self {
        Self { fail: false }
    }
    fn failing() -> Self {
        Self { fail: true }
    }
}

impl SpeechSynthesizer for FakeSynth {
    fn synthesize(&self, _text: &str, _voice: &VoiceParams, out_path: &Path) -> ReelforgeResult<()> {
        if self.fail {
            return Err(ReelforgeError::validation("synth offline"));
        }
        std::fs::write(out_path, b"wav").map_err(|e| ReelforgeError::validation(e.to_string()))
    }
}

struct FakeMedia {
    audio_sec: f64,
    fail_measure: bool,
}

impl FakeMedia {
    fn new(audio_sec: f64) -> Self {
        Self {
            audio_sec,
            fail_measure: false,
        }
    }
}

impl MediaProbe for FakeMedia {
    fn audio_duration_sec(&self, _path: &Path) -> ReelforgeResult<f64> {
        if self.fail_measure {
            return Err(ReelforgeError::validation("probe broken"));
        }
        Ok(self.audio_sec)
    }

    fn probe_video(&self, path: &Path) -> ReelforgeResult<VideoSourceInfo> {
        Ok(VideoSourceInfo {
            source_path: path.to_path_buf(),
            width: 1080,
            height: 1920,
            duration_sec: 8.0,
            has_audio: false,
        })
    }

    fn concat_audio(&self, parts: &[AudioPart], out: &Path) -> ReelforgeResult<()> {
        assert!(!parts.is_empty());
        std::fs::write(out, b"concat").map_err(|e| ReelforgeError::validation(e.to_string()))
    }

    fn decode_audio_f32_stereo(&self, _path: &Path, sample_rate: u32) -> ReelforgeResult<AudioPcm> {
        Ok(AudioPcm {
            sample_rate,
            channels: 2,
            interleaved_f32: vec![0.0; 64],
        })
    }
}

struct FakeProvider {
    name: String,
    search_calls: Rc<Cell<usize>>,
    empty: bool,
    fail_download: bool,
}

impl FakeProvider {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            search_calls: Rc::new(Cell::new(0)),
            empty: false,
            fail_download: false,
        }
    }
    fn empty(name: &str) -> Self {
        Self {
            empty: true,
            ..Self::new(name)
        }
    }
    fn counting(name: &str, counter: Rc<Cell<usize>>) -> Self {
        Self {
            search_calls: counter,
            ..Self::new(name)
        }
    }
}

impl FootageProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, keyword: &str, _limit: usize) -> ReelforgeResult<Vec<FootageCandidate>> {
        self.search_calls.set(self.search_calls.get() + 1);
        if self.empty {
            return Ok(Vec::new());
        }
        Ok(vec![FootageCandidate {
            id: format!("{}-{}", self.name, keyword.replace(' ', "-")),
            url: "https://example.test/clip.mp4".to_string(),
            provider: self.name.clone(),
            keyword: keyword.to_string(),
            duration_sec: 7.5,
            width: 1080,
            height: 1920,
        }])
    }

    fn download(&self, candidate: &FootageCandidate, dir: &Path) -> ReelforgeResult<PathBuf> {
        if self.fail_download {
            return Err(ReelforgeError::validation("download refused"));
        }
        let path = dir.join(format!("{}.mp4", candidate.id));
        std::fs::write(&path, b"mp4").map_err(|e| ReelforgeError::validation(e.to_string()))?;
        Ok(path)
    }
}

fn config_in(dir: &Path) -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.workdir = dir.join("work");
    cfg.output_dir = dir.join("out");
    cfg.music_dir = dir.join("music");
    cfg
}

fn boxed(providers: Vec<FakeProvider>) -> Vec<Box<dyn FootageProvider>> {
    providers
        .into_iter()
        .map(|p| Box::new(p) as Box<dyn FootageProvider>)
        .collect()
}

#[test]
fn measured_durations_overwrite_estimates() {
    let tmp = temp_dir("collector_measured");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::new();
    let media = FakeMedia::new(2.5);
    let providers = boxed(vec![FakeProvider::new("stock")]);

    let collector = AssetCollector::new(&cfg, &synth, None, &providers, None, &media);
    let mut plan = plan_with(vec![
        segment("First segment text.", "ocean"),
        segment("Second segment text.", "reef"),
    ]);
    let mut rng = StdRng::seed_from_u64(7);
    let bundle = collector.collect(&mut plan, &mut rng).unwrap();

    for s in &plan.segments {
        assert_eq!(s.duration_sec, Some(2.5));
    }
    assert_eq!(bundle.timings.len(), 2);
    assert!(!bundle.timings[0].degraded);
    assert_eq!(bundle.timings[1].start_sec, 2.5);
    assert!(bundle.narration.is_some());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn measurement_failure_degrades_to_the_estimate() {
    let tmp = temp_dir("collector_degraded");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::new();
    let mut media = FakeMedia::new(2.5);
    media.fail_measure = true;
    let providers = boxed(vec![]);

    let collector = AssetCollector::new(&cfg, &synth, None, &providers, None, &media);
    let mut plan = plan_with(vec![segment("Twenty eight chars long text", "x")]);
    let mut rng = StdRng::seed_from_u64(7);
    let bundle = collector.collect(&mut plan, &mut rng).unwrap();

    assert!(bundle.timings[0].degraded);
    // 28 chars at the default 14 chars/sec rate.
    assert!((bundle.timings[0].duration_sec - 2.0).abs() < 1e-9);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn total_synthesis_failure_is_fatal() {
    let tmp = temp_dir("collector_fatal");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::failing();
    let media = FakeMedia::new(2.5);
    let providers = boxed(vec![]);

    let collector = AssetCollector::new(&cfg, &synth, None, &providers, None, &media);
    let mut plan = plan_with(vec![segment("a", "x"), segment("b", "y")]);
    let mut rng = StdRng::seed_from_u64(7);
    let err = collector.collect(&mut plan, &mut rng).unwrap_err();
    assert!(matches!(err, ReelforgeError::AssetCollection(_)));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn footage_cache_makes_repeat_keywords_free() {
    let tmp = temp_dir("collector_cache");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::new();
    let media = FakeMedia::new(2.0);
    let searches = Rc::new(Cell::new(0));
    let providers = boxed(vec![FakeProvider::counting("stock", searches.clone())]);

    let collector = AssetCollector::new(&cfg, &synth, None, &providers, None, &media);
    let mut rng = StdRng::seed_from_u64(7);

    let mut first = plan_with(vec![segment("One.", "ocean waves")]);
    collector.collect(&mut first, &mut rng).unwrap();

    let mut second = plan_with(vec![segment("Two.", "ocean waves")]);
    let bundle = collector.collect(&mut second, &mut rng).unwrap();

    // The second request for the same keyword is served from the cache.
    assert_eq!(searches.get(), 1);
    assert_eq!(bundle.clips.len(), 1);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_footage_degrades_but_does_not_fail() {
    let tmp = temp_dir("collector_novisual");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::new();
    let media = FakeMedia::new(2.0);
    let providers = boxed(vec![FakeProvider::empty("stock")]);

    let collector = AssetCollector::new(&cfg, &synth, None, &providers, None, &media);
    let mut plan = plan_with(vec![segment("Text.", "nothing matches this")]);
    let mut rng = StdRng::seed_from_u64(7);
    let bundle = collector.collect(&mut plan, &mut rng).unwrap();

    assert!(bundle.clips.is_empty());
    assert!(bundle.narration.is_some());

    std::fs::remove_dir_all(&tmp).ok();
}

struct FakeAligner {
    words: Vec<WordSpan>,
}

impl ForcedAligner for FakeAligner {
    fn align(&self, _spans: &[AlignSpan], _audio: &Path) -> ReelforgeResult<Vec<WordSpan>> {
        Ok(self.words.clone())
    }
}

fn word(w: &str, start: f64, end: f64) -> WordSpan {
    WordSpan {
        word: w.to_string(),
        start_sec: start,
        end_sec: end,
    }
}

#[test]
fn alignment_overrides_measured_timings() {
    let tmp = temp_dir("collector_aligned");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::new();
    let media = FakeMedia::new(2.0);
    let providers = boxed(vec![]);
    // Two segments of two words each.
    let aligner = FakeAligner {
        words: vec![
            word("first", 0.0, 0.4),
            word("words", 0.5, 0.9),
            word("second", 1.0, 1.6),
            word("words", 1.7, 2.3),
        ],
    };

    let collector = AssetCollector::new(&cfg, &synth, Some(&aligner as &dyn ForcedAligner), &providers, None, &media);
    let mut plan = plan_with(vec![segment("first words", "a"), segment("second words", "b")]);
    let mut rng = StdRng::seed_from_u64(7);
    let bundle = collector.collect(&mut plan, &mut rng).unwrap();

    assert_eq!(plan.segments[0].start_sec, Some(0.0));
    assert_eq!(plan.segments[0].end_sec, Some(0.9));
    assert_eq!(plan.segments[1].start_sec, Some(1.0));
    assert_eq!(plan.segments[1].end_sec, Some(2.3));
    assert!((bundle.timings[0].duration_sec - 0.9).abs() < 1e-9);
    assert!((bundle.timings[1].duration_sec - 1.3).abs() < 1e-9);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn exhausted_word_stream_advances_one_second_per_segment() {
    let tmp = temp_dir("collector_exhausted");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::new();
    let media = FakeMedia::new(2.0);
    let providers = boxed(vec![]);
    // Only the first segment's words are present.
    let aligner = FakeAligner {
        words: vec![word("only", 0.0, 0.5), word("these", 0.6, 1.1)],
    };

    let collector = AssetCollector::new(&cfg, &synth, Some(&aligner as &dyn ForcedAligner), &providers, None, &media);
    let mut plan = plan_with(vec![segment("only these", "a"), segment("missing words", "b")]);
    let mut rng = StdRng::seed_from_u64(7);
    collector.collect(&mut plan, &mut rng).unwrap();

    assert_eq!(plan.segments[1].start_sec, Some(1.1));
    assert_eq!(plan.segments[1].end_sec, Some(2.1));

    std::fs::remove_dir_all(&tmp).ok();
}

struct BrokenAligner;

impl ForcedAligner for BrokenAligner {
    fn align(&self, _spans: &[AlignSpan], _audio: &Path) -> ReelforgeResult<Vec<WordSpan>> {
        Err(ReelforgeError::validation("model not downloaded"))
    }
}

#[test]
fn alignment_failure_keeps_measured_timings() {
    let tmp = temp_dir("collector_alignfail");
    let cfg = config_in(&tmp);
    let synth = FakeSynth::new();
    let media = FakeMedia::new(2.0);
    let providers = boxed(vec![]);

    let collector =
        AssetCollector::new(&cfg, &synth, Some(&BrokenAligner as &dyn ForcedAligner), &providers, None, &media);
    let mut plan = plan_with(vec![segment("some text", "a")]);
    let mut rng = StdRng::seed_from_u64(7);
    let bundle = collector.collect(&mut plan, &mut rng).unwrap();

    assert!(plan.segments[0].start_sec.is_none());
    assert_eq!(bundle.timings[0].duration_sec, 2.0);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn synthesis_cache_key_is_stable_and_voice_sensitive() {
    let voice = VoiceParams::default();
    let a = synthesis_cache_key("hello", &voice);
    let b = synthesis_cache_key("hello", &voice);
    assert_eq!(a, b);
    assert_eq!(a.len(), 16);

    let mut other = VoiceParams::default();
    other.stability = 0.9;
    assert_ne!(a, synthesis_cache_key("hello", &other));
    assert_ne!(a, synthesis_cache_key("goodbye", &voice));
}
