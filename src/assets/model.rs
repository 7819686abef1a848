use std::path::PathBuf;

use crate::foundation::core::Mood;

/// One downloaded (or cache-recovered) stock footage clip.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StockClip {
    /// Provider-scoped clip identifier.
    pub id: String,
    /// Name of the provider the clip came from.
    pub provider: String,
    /// Keyword the clip was found under.
    pub keyword: String,
    /// Clip length in seconds as reported by the provider; re-measured
    /// before composition when possible.
    pub duration_sec: f64,
    /// Source resolution `(width, height)`.
    pub resolution: (u32, u32),
    /// Local file path once downloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Whether the local file was actually written.
    #[serde(default)]
    pub downloaded: bool,
}

impl StockClip {
    /// Whether this clip can feed the composition stage: downloaded and still
    /// present on disk.
    pub fn is_usable(&self) -> bool {
        self.downloaded
            && self
                .local_path
                .as_deref()
                .is_some_and(|p| p.exists())
    }
}

/// The concatenated narration track for a plan.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NarrationTrack {
    /// Full narrated text (cleaned).
    pub text: String,
    /// Local path of the concatenated audio file.
    pub local_path: PathBuf,
    /// Measured duration in seconds.
    pub duration_sec: f64,
}

/// One background-music track from the catalog.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BgmTrack {
    /// Track name (file stem by default).
    pub name: String,
    /// Mood classification.
    pub mood: Mood,
    /// Track length in seconds.
    pub duration_sec: f64,
    /// Local file path.
    pub local_path: PathBuf,
    /// Requested playback volume, `0.0..=1.0`; clamped by the mixer.
    pub volume: f64,
    /// Artist credit, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// License note, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// Ground-truth timing for one segment's narration, used for clip allocation.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SegmentTiming {
    /// Segment index in plan order.
    pub index: usize,
    /// Measured (or alignment-refined) narration duration in seconds.
    pub duration_sec: f64,
    /// Start offset within the concatenated narration track.
    pub start_sec: f64,
    /// True when the duration fell back to the char-rate heuristic instead of
    /// a real measurement.
    pub degraded: bool,
}

/// Everything the collector materialized for one plan.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AssetBundle {
    /// Footage clips, at most one per segment, in segment order. Segments
    /// whose keyword yielded nothing are simply absent.
    pub clips: Vec<StockClip>,
    /// The concatenated narration track, when any narration succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<NarrationTrack>,
    /// Selected background music, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm: Option<BgmTrack>,
    /// Per-segment measured timings, one per plan segment.
    pub timings: Vec<SegmentTiming>,
}

impl AssetBundle {
    /// Clips that can actually feed composition.
    pub fn usable_clips(&self) -> Vec<&StockClip> {
        self.clips.iter().filter(|c| c.is_usable()).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/model.rs"]
mod tests;
