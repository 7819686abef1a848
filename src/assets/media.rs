//! Media measurement and transcode helpers.
//!
//! All real media IO goes through the system `ffmpeg`/`ffprobe` binaries; we
//! intentionally avoid native FFmpeg bindings so the crate has no C build
//! dependencies. The [`MediaProbe`] trait is the seam that lets the collector
//! and orchestrator run under test without either binary installed.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::foundation::error::{ReelforgeError, ReelforgeResult};

/// Sample rate every PCM buffer in the pipeline is resampled to.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Probed metadata for one video source.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Probed file path.
    pub source_path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container-reported duration in seconds.
    pub duration_sec: f64,
    /// Whether the source carries an audio stream.
    pub has_audio: bool,
}

/// Decoded interleaved `f32` PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Duration of the buffer in seconds.
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.interleaved_f32.len() / usize::from(self.channels);
        frames as f64 / f64::from(self.sample_rate)
    }
}

/// One piece of the concatenated narration track: either a real audio file or
/// a silence gap standing in for a segment whose synthesis failed.
#[derive(Clone, Debug)]
pub enum AudioPart {
    /// An audio file on disk.
    File(PathBuf),
    /// Synthetic silence of the given duration in seconds.
    Silence(f64),
}

/// Boundary for media measurement and transcoding.
pub trait MediaProbe {
    /// Measure the duration of an audio file in seconds.
    fn audio_duration_sec(&self, path: &Path) -> ReelforgeResult<f64>;

    /// Probe a video file's dimensions and duration.
    fn probe_video(&self, path: &Path) -> ReelforgeResult<VideoSourceInfo>;

    /// Concatenate audio parts (files and silence gaps) in order into `out`,
    /// resampled to [`MIX_SAMPLE_RATE`] stereo.
    fn concat_audio(&self, parts: &[AudioPart], out: &Path) -> ReelforgeResult<()>;

    /// Decode a file's audio into interleaved stereo `f32` PCM at
    /// `sample_rate`. Sources without audio yield an empty buffer.
    fn decode_audio_f32_stereo(&self, path: &Path, sample_rate: u32) -> ReelforgeResult<AudioPcm>;
}

/// Check whether `ffmpeg` is invocable.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// [`MediaProbe`] backed by the system `ffmpeg`/`ffprobe` binaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegMedia;

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

impl FfmpegMedia {
    fn run_ffprobe(path: &Path) -> ReelforgeResult<ProbeOut> {
        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReelforgeError::validation(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ReelforgeError::validation(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        serde_json::from_slice(&out.stdout)
            .map_err(|e| ReelforgeError::serde(format!("ffprobe json parse failed: {e}")))
    }
}

impl MediaProbe for FfmpegMedia {
    fn audio_duration_sec(&self, path: &Path) -> ReelforgeResult<f64> {
        let parsed = Self::run_ffprobe(path)?;
        parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                ReelforgeError::validation(format!(
                    "ffprobe reported no duration for '{}'",
                    path.display()
                ))
            })
    }

    fn probe_video(&self, path: &Path) -> ReelforgeResult<VideoSourceInfo> {
        let parsed = Self::run_ffprobe(path)?;
        let video_stream = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| {
                ReelforgeError::validation(format!(
                    "no video stream found in '{}'",
                    path.display()
                ))
            })?;
        let width = video_stream
            .width
            .ok_or_else(|| ReelforgeError::validation("missing video width from ffprobe"))?;
        let height = video_stream
            .height
            .ok_or_else(|| ReelforgeError::validation("missing video height from ffprobe"))?;
        let duration_sec = parsed
            .format
            .as_ref()
            .and_then(|f| f.duration.as_ref())
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);
        let has_audio = parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(VideoSourceInfo {
            source_path: path.to_path_buf(),
            width,
            height,
            duration_sec,
            has_audio,
        })
    }

    fn concat_audio(&self, parts: &[AudioPart], out: &Path) -> ReelforgeResult<()> {
        if parts.is_empty() {
            return Err(ReelforgeError::validation(
                "concat_audio requires at least one part",
            ));
        }
        ensure_parent_dir(out)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-loglevel", "error"]);
        for part in parts {
            match part {
                AudioPart::File(path) => {
                    cmd.arg("-i").arg(path);
                }
                AudioPart::Silence(sec) => {
                    cmd.args([
                        "-f",
                        "lavfi",
                        "-t",
                        &format!("{sec:.3}"),
                        "-i",
                        &format!("anullsrc=r={MIX_SAMPLE_RATE}:cl=stereo"),
                    ]);
                }
            }
        }

        // Every input is normalized to one sample format before the concat
        // filter, which requires identical stream parameters.
        let mut filter = String::new();
        for idx in 0..parts.len() {
            filter.push_str(&format!(
                "[{idx}:a]aformat=sample_rates={MIX_SAMPLE_RATE}:channel_layouts=stereo[a{idx}];"
            ));
        }
        for idx in 0..parts.len() {
            filter.push_str(&format!("[a{idx}]"));
        }
        filter.push_str(&format!("concat=n={}:v=0:a=1[out]", parts.len()));

        cmd.args(["-filter_complex", &filter, "-map", "[out]"]);
        cmd.arg(out);

        let output = cmd
            .output()
            .map_err(|e| ReelforgeError::validation(format!("failed to run ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(ReelforgeError::validation(format!(
                "ffmpeg audio concat failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn decode_audio_f32_stereo(&self, path: &Path, sample_rate: u32) -> ReelforgeResult<AudioPcm> {
        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                "2",
                "-ar",
                &sample_rate.to_string(),
                "pipe:1",
            ])
            .output()
            .map_err(|e| {
                ReelforgeError::validation(format!("failed to run ffmpeg for audio decode: {e}"))
            })?;

        if !out.status.success() {
            let msg = String::from_utf8_lossy(&out.stderr);
            // ffmpeg reports no audio stream with an error. Treat this as
            // empty PCM for video files without audio tracks.
            if msg.contains("matches no streams")
                || msg.contains("does not contain any stream")
                || msg.contains("Stream specifier")
            {
                return Ok(AudioPcm {
                    sample_rate,
                    channels: 2,
                    interleaved_f32: Vec::new(),
                });
            }
            return Err(ReelforgeError::validation(format!(
                "ffmpeg audio decode failed for '{}': {}",
                path.display(),
                msg.trim()
            )));
        }

        if !out.stdout.len().is_multiple_of(4) {
            return Err(ReelforgeError::validation(
                "decoded audio byte length is not aligned to f32 samples",
            ));
        }
        let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
        for chunk in out.stdout.chunks_exact(4) {
            pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        Ok(AudioPcm {
            sample_rate,
            channels: 2,
            interleaved_f32: pcm,
        })
    }
}

/// Create the parent directory of `path` when missing.
pub fn ensure_parent_dir(path: &Path) -> ReelforgeResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
