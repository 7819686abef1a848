use std::path::PathBuf;
use std::time::Duration;

use crate::{
    collab::VoiceParams,
    foundation::core::{Canvas, VideoFormat},
    foundation::error::{ReelforgeError, ReelforgeResult},
};

/// Vertical band (expressed as canvas-height ratios) within which on-screen
/// text must stay to avoid platform chrome and edge cropping.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct SafeZone {
    /// Fraction of canvas height reserved at the top (status bar, search UI).
    pub top_ratio: f64,
    /// Fraction of canvas height reserved at the bottom (title, sound bar).
    pub bottom_ratio: f64,
    /// Fraction of canvas width reserved on each side (action buttons).
    pub side_ratio: f64,
}

impl Default for SafeZone {
    fn default() -> Self {
        Self {
            top_ratio: 0.15,
            bottom_ratio: 0.30,
            side_ratio: 0.10,
        }
    }
}

impl SafeZone {
    /// Topmost allowed y coordinate for text, in pixels.
    pub fn y_min(&self, canvas: Canvas) -> f64 {
        f64::from(canvas.height) * self.top_ratio
    }

    /// Bottommost allowed y coordinate (exclusive of the bottom band), in pixels.
    pub fn y_max(&self, canvas: Canvas) -> f64 {
        f64::from(canvas.height) * (1.0 - self.bottom_ratio)
    }

    /// Maximum pixel width available to a text block.
    pub fn max_text_width(&self, canvas: Canvas) -> f64 {
        f64::from(canvas.width) * (1.0 - 2.0 * self.side_ratio)
    }
}

/// Caption styling and pacing parameters.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SubtitleStyle {
    /// Path to the caption font file.
    pub font_path: PathBuf,
    /// Font size for short captions, in pixels.
    pub font_px: f32,
    /// Font size used once a caption exceeds [`SubtitleStyle::small_threshold_chars`].
    pub font_px_small: f32,
    /// Character count above which the smaller font size is used.
    pub small_threshold_chars: usize,
    /// Outline stroke width in pixels.
    pub stroke_px: f64,
    /// Horizontal background-box padding in pixels.
    pub padding_x: f64,
    /// Vertical background-box padding in pixels.
    pub padding_y: f64,
    /// Background-box opacity, `0.0..=1.0`.
    pub bg_opacity: f64,
    /// Pixel offset of the default caption position above the safe-zone floor.
    pub bottom_offset_px: f64,
    /// Maximum characters per caption chunk before splitting.
    pub max_chars: usize,
    /// Minimum on-screen duration for one caption chunk, seconds.
    pub min_caption_sec: f64,
    /// Maximum on-screen duration for one caption chunk, seconds.
    pub max_caption_sec: f64,
    /// Assumed reading speed used when pacing caption chunks.
    pub read_chars_per_sec: f64,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("fonts/subtitle.ttf"),
            font_px: 70.0,
            font_px_small: 60.0,
            small_threshold_chars: 30,
            stroke_px: 3.0,
            padding_x: 30.0,
            padding_y: 20.0,
            bg_opacity: 0.6,
            bottom_offset_px: 150.0,
            max_chars: 40,
            min_caption_sec: 1.0,
            max_caption_sec: 6.0,
            read_chars_per_sec: 12.0,
        }
    }
}

/// Title-card styling parameters. Titles live in a band near the top of the
/// canvas, below a small margin that avoids platform UI.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TitleStyle {
    /// Path to the title font file.
    pub font_path: PathBuf,
    /// Title font size in pixels.
    pub font_px: f32,
    /// Horizontal background-box padding in pixels.
    pub padding_x: f64,
    /// Vertical background-box padding in pixels.
    pub padding_y: f64,
    /// Background-box opacity, `0.0..=1.0`.
    pub bg_opacity: f64,
    /// Fraction of canvas height kept clear above the title.
    pub top_margin_ratio: f64,
    /// Fraction of canvas height the title band extends to.
    pub band_ratio: f64,
}

impl Default for TitleStyle {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("fonts/title.ttf"),
            font_px: 80.0,
            padding_x: 40.0,
            padding_y: 30.0,
            bg_opacity: 0.7,
            top_margin_ratio: 0.07,
            band_ratio: 0.25,
        }
    }
}

/// Language-specific narration pacing used when a segment carries no duration
/// estimate and when audio measurement fails.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct NarrationRate {
    /// Average narrated characters per second.
    pub chars_per_sec: f64,
}

impl NarrationRate {
    /// Rate for a BCP-47-ish language code. Dense scripts narrate far fewer
    /// characters per second than Latin ones.
    pub fn for_language(code: &str) -> Self {
        let primary = code
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        let chars_per_sec = match primary.as_str() {
            "ko" | "ja" | "zh" => 3.0,
            _ => 14.0,
        };
        Self { chars_per_sec }
    }

    /// Estimated narration duration for `text`, never below 0.1 s.
    pub fn estimate_sec(&self, text: &str) -> f64 {
        let chars = text.chars().count() as f64;
        (chars / self.chars_per_sec).max(0.1)
    }
}

/// Complete pipeline configuration.
///
/// Precedence when assembling the effective configuration for a job is
/// explicit override > account default > global default; see
/// [`PipelineConfig::merged`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// Target video format; decides the output canvas.
    pub format: VideoFormat,
    /// Output frame rate.
    pub fps: u32,
    /// Narration language code.
    pub language: String,
    /// Voice parameters handed to the speech-synthesis collaborator.
    pub voice: VoiceParams,
    /// Crossfade overlap between adjacent clips, seconds.
    pub crossfade_sec: f64,
    /// Peak Ken Burns zoom factor reached at the end of each clip.
    pub ken_burns_ratio: f64,
    /// Music fade-in length, seconds.
    pub music_fade_in_sec: f64,
    /// Music fade-out length, seconds.
    pub music_fade_out_sec: f64,
    /// Requested music volume before clamping.
    pub music_volume: f64,
    /// Lower bound of the allowed music volume band.
    pub music_volume_floor: f64,
    /// Upper bound of the allowed music volume band.
    pub music_volume_ceiling: f64,
    /// Segment-sum mismatch (seconds) above which the reconciler rescales.
    pub rescale_tolerance_sec: f64,
    /// Residual (seconds) above which the reconciler adjusts the last segment.
    pub residual_tolerance_sec: f64,
    /// Minimum duration any segment or clip may be squeezed to.
    pub min_segment_sec: f64,
    /// Working directory for downloaded and intermediate files.
    pub workdir: PathBuf,
    /// Directory receiving rendered videos.
    pub output_dir: PathBuf,
    /// Music library root (mood-named subdirectories + catalog file).
    pub music_dir: PathBuf,
    /// Backoff delays between publish attempts; the attempt count is
    /// `delays.len() + 1`.
    pub publish_backoff: Vec<Duration>,
    /// Safe zone for on-screen text.
    pub safe_zone: SafeZone,
    /// Caption styling.
    pub subtitle: SubtitleStyle,
    /// Title styling.
    pub title: TitleStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            format: VideoFormat::Shorts,
            fps: 30,
            language: "en".to_string(),
            voice: VoiceParams::default(),
            crossfade_sec: 0.5,
            ken_burns_ratio: 1.15,
            music_fade_in_sec: 1.0,
            music_fade_out_sec: 2.0,
            music_volume: 0.3,
            music_volume_floor: 0.05,
            music_volume_ceiling: 0.30,
            rescale_tolerance_sec: 5.0,
            residual_tolerance_sec: 0.5,
            min_segment_sec: 0.5,
            workdir: PathBuf::from("work"),
            output_dir: PathBuf::from("output"),
            music_dir: PathBuf::from("music"),
            publish_backoff: vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ],
            safe_zone: SafeZone::default(),
            subtitle: SubtitleStyle::default(),
            title: TitleStyle::default(),
        }
    }
}

impl PipelineConfig {
    /// Output canvas derived from the configured format.
    pub fn canvas(&self) -> Canvas {
        self.format.canvas()
    }

    /// Narration rate for the configured language.
    pub fn narration_rate(&self) -> NarrationRate {
        NarrationRate::for_language(&self.language)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> ReelforgeResult<()> {
        if self.fps == 0 {
            return Err(ReelforgeError::validation("fps must be > 0"));
        }
        if !self.crossfade_sec.is_finite() || self.crossfade_sec < 0.0 {
            return Err(ReelforgeError::validation(
                "crossfade_sec must be finite and >= 0",
            ));
        }
        if !self.ken_burns_ratio.is_finite() || self.ken_burns_ratio < 1.0 {
            return Err(ReelforgeError::validation(
                "ken_burns_ratio must be finite and >= 1.0",
            ));
        }
        if self.music_volume_floor < 0.0 || self.music_volume_ceiling > 1.0 {
            return Err(ReelforgeError::validation(
                "music volume band must stay within 0.0..=1.0",
            ));
        }
        if self.music_volume_floor > self.music_volume_ceiling {
            return Err(ReelforgeError::validation(
                "music_volume_floor must not exceed music_volume_ceiling",
            ));
        }
        if self.min_segment_sec <= 0.0 {
            return Err(ReelforgeError::validation("min_segment_sec must be > 0"));
        }
        let sz = &self.safe_zone;
        if sz.top_ratio + sz.bottom_ratio >= 1.0 {
            return Err(ReelforgeError::validation(
                "safe zone top and bottom bands must leave room between them",
            ));
        }
        Ok(())
    }

    /// Assemble the effective configuration from layered sources.
    ///
    /// `account` holds per-account defaults; `explicit` holds caller-supplied
    /// overrides for a single job. Precedence is explicit > account > global
    /// (self), applied field by field.
    pub fn merged(
        &self,
        account: Option<&ConfigOverlay>,
        explicit: Option<&ConfigOverlay>,
    ) -> PipelineConfig {
        let mut cfg = self.clone();
        if let Some(overlay) = account {
            overlay.apply(&mut cfg);
        }
        if let Some(overlay) = explicit {
            overlay.apply(&mut cfg);
        }
        cfg
    }
}

/// Partial configuration: every field optional, applied over a base config.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ConfigOverlay {
    /// Override the target format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<VideoFormat>,
    /// Override the narration language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Override the synthesis voice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceParams>,
    /// Override the crossfade length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossfade_sec: Option<f64>,
    /// Override the Ken Burns peak zoom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ken_burns_ratio: Option<f64>,
    /// Override the requested music volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_volume: Option<f64>,
    /// Override the output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Override the music library root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_dir: Option<PathBuf>,
    /// Override the publish backoff schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_backoff: Option<Vec<Duration>>,
}

impl ConfigOverlay {
    fn apply(&self, cfg: &mut PipelineConfig) {
        if let Some(v) = self.format {
            cfg.format = v;
        }
        if let Some(v) = &self.language {
            cfg.language = v.clone();
        }
        if let Some(v) = &self.voice {
            cfg.voice = v.clone();
        }
        if let Some(v) = self.crossfade_sec {
            cfg.crossfade_sec = v;
        }
        if let Some(v) = self.ken_burns_ratio {
            cfg.ken_burns_ratio = v;
        }
        if let Some(v) = self.music_volume {
            cfg.music_volume = v;
        }
        if let Some(v) = &self.output_dir {
            cfg.output_dir = v.clone();
        }
        if let Some(v) = &self.music_dir {
            cfg.music_dir = v.clone();
        }
        if let Some(v) = &self.publish_backoff {
            cfg.publish_backoff = v.clone();
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
