//! Interfaces for the external collaborators the pipeline drives.
//!
//! Concrete provider wrappers (stock-footage APIs, speech-synthesis vendors,
//! upload targets) live outside this crate; the pipeline only depends on the
//! contracts below. All calls are synchronous and blocking; the pipeline
//! suspends only at these IO boundaries. Per-call network timeouts are the
//! collaborator's responsibility.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::foundation::error::ReelforgeResult;

/// One stock-footage search hit, prior to download.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FootageCandidate {
    /// Provider-scoped identifier.
    pub id: String,
    /// Download URL.
    pub url: String,
    /// Name of the provider that returned this candidate.
    pub provider: String,
    /// Keyword the candidate was found under.
    pub keyword: String,
    /// Provider-reported clip length in seconds (often inaccurate).
    pub duration_sec: f64,
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
}

/// Searches and downloads stock footage.
pub trait FootageProvider {
    /// Stable provider name, used for logging and candidate routing.
    fn name(&self) -> &str;

    /// Search clips for a keyword. An empty result is not an error.
    fn search(&self, keyword: &str, limit: usize) -> ReelforgeResult<Vec<FootageCandidate>>;

    /// Download a candidate into `dir`, returning the local file path.
    fn download(&self, candidate: &FootageCandidate, dir: &Path) -> ReelforgeResult<PathBuf>;
}

/// Voice parameters forwarded to the speech-synthesis collaborator.
///
/// These fields participate in the synthesis cache key: the same text with
/// the same parameters must always resolve to the same cached file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VoiceParams {
    /// Provider-scoped voice identifier.
    pub voice_id: String,
    /// Voice stability, `0.0..=1.0`.
    pub stability: f64,
    /// Similarity to the reference voice, `0.0..=1.0`.
    pub similarity_boost: f64,
    /// Style exaggeration, `0.0..=1.0`.
    pub style: f64,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            voice_id: "default".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
        }
    }
}

impl VoiceParams {
    /// Canonical string folded into the synthesis cache key.
    pub fn cache_key_component(&self) -> String {
        format!(
            "{}|{:.3}|{:.3}|{:.3}",
            self.voice_id, self.stability, self.similarity_boost, self.style
        )
    }
}

/// Produces narration audio for one text span.
pub trait SpeechSynthesizer {
    /// Synthesize `text` with `voice` into `out_path`.
    fn synthesize(&self, text: &str, voice: &VoiceParams, out_path: &Path) -> ReelforgeResult<()>;
}

/// One narration span submitted for forced alignment.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AlignSpan {
    /// Cleaned narration text.
    pub text: String,
    /// Visual search keyword associated with the span.
    pub keyword: String,
}

/// One aligned word (or coarser span, when word-level data is unavailable).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WordSpan {
    /// The recognized word.
    pub word: String,
    /// Start timestamp in seconds.
    pub start_sec: f64,
    /// End timestamp in seconds.
    pub end_sec: f64,
}

/// Derives precise timestamps for known text against a narration recording.
pub trait ForcedAligner {
    /// Align `spans` against `audio`, returning word timestamps in input order.
    fn align(&self, spans: &[AlignSpan], audio: &Path) -> ReelforgeResult<Vec<WordSpan>>;
}

/// Acquires a default set of background tracks into the music library.
///
/// Invoked once as the third step of the BGM fallback chain when the catalog
/// has nothing usable.
pub trait DefaultTrackFetcher {
    /// Populate `music_dir` with default tracks.
    fn fetch_default_tracks(&self, music_dir: &Path) -> ReelforgeResult<()>;
}

/// Metadata attached to a publish request.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PublishRequest {
    /// Video title.
    pub title: String,
    /// Video description.
    pub description: String,
    /// Tag list.
    pub tags: Vec<String>,
}

/// Result of a successful publish.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PublishReceipt {
    /// Host-scoped video identifier.
    pub video_id: String,
    /// Public URL.
    pub url: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
}

/// Uploads a rendered video to its hosting destination.
pub trait Publisher {
    /// Publish `video` with `request` metadata.
    fn publish(&self, video: &Path, request: &PublishRequest) -> ReelforgeResult<PublishReceipt>;
}

/// Receives pipeline progress checkpoints.
pub trait ProgressSink {
    /// Report a human-readable message at `percent` completion.
    fn progress(&self, message: &str, percent: u8);
}

/// Default progress sink: forwards checkpoints to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&self, message: &str, percent: u8) {
        tracing::info!(percent, "{message}");
    }
}
