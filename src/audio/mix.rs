//! Narration/music mixing over interleaved stereo f32 PCM.
//!
//! The music bed is loop-concatenated until it covers the target duration,
//! trimmed to the exact length, faded at both ends, and scaled into a clamped
//! low volume band so narration always dominates. Narration and music are
//! composed additively; there is no ducking or sidechain.

use std::path::Path;

use crate::{
    assets::media::AudioPcm,
    foundation::error::{ReelforgeError, ReelforgeResult},
};

/// Parameters controlling music-bed construction.
#[derive(Clone, Copy, Debug)]
pub struct MusicBedSettings {
    /// Exact bed length in seconds.
    pub target_duration_sec: f64,
    /// Fade-in length, seconds.
    pub fade_in_sec: f64,
    /// Fade-out length, seconds.
    pub fade_out_sec: f64,
    /// Requested volume before clamping.
    pub requested_volume: f64,
    /// Lower bound of the allowed volume band.
    pub volume_floor: f64,
    /// Upper bound of the allowed volume band.
    pub volume_ceiling: f64,
}

impl MusicBedSettings {
    /// The effective volume after clamping into the allowed band.
    pub fn effective_volume(&self) -> f32 {
        self.requested_volume
            .clamp(self.volume_floor, self.volume_ceiling) as f32
    }
}

/// Build the music bed: loop the source until it covers the target, trim to
/// the exact sample count, apply fades and the clamped volume.
///
/// Returns `None` when the source holds no audio.
pub fn build_music_bed(source: &AudioPcm, settings: &MusicBedSettings) -> Option<Vec<f32>> {
    let channels = usize::from(source.channels);
    if channels == 0 || source.interleaved_f32.is_empty() {
        return None;
    }
    let src_frames = source.interleaved_f32.len() / channels;
    if src_frames == 0 || settings.target_duration_sec <= 0.0 {
        return None;
    }

    let rate = f64::from(source.sample_rate);
    let total_frames = (settings.target_duration_sec * rate).round() as usize;
    let volume = settings.effective_volume();

    let mut out = Vec::<f32>::with_capacity(total_frames * channels);
    for frame in 0..total_frames {
        let src_frame = frame % src_frames;
        let rel_sec = frame as f64 / rate;
        let gain = fade_gain(
            rel_sec,
            settings.target_duration_sec,
            settings.fade_in_sec,
            settings.fade_out_sec,
        ) * volume;
        for ch in 0..channels {
            out.push(source.interleaved_f32[src_frame * channels + ch] * gain);
        }
    }
    Some(out)
}

/// Linear fade gain at `rel_sec` into a span of `total_sec`.
fn fade_gain(rel_sec: f64, total_sec: f64, fade_in_sec: f64, fade_out_sec: f64) -> f32 {
    let mut gain = 1.0f32;
    if fade_in_sec > 0.0 {
        gain *= (rel_sec / fade_in_sec).clamp(0.0, 1.0) as f32;
    }
    if fade_out_sec > 0.0 {
        let remaining = (total_sec - rel_sec).max(0.0);
        gain *= (remaining / fade_out_sec).clamp(0.0, 1.0) as f32;
    }
    gain
}

/// Compose narration and music additively into one buffer of exactly
/// `total_samples` interleaved samples.
///
/// Single-track inputs pass through (padded or trimmed to length); with no
/// input at all there is nothing to mix and the result is `None`.
pub fn mix_tracks(
    narration: Option<&[f32]>,
    music: Option<&[f32]>,
    total_samples: usize,
) -> Option<Vec<f32>> {
    match (narration, music) {
        (None, None) => None,
        (Some(one), None) | (None, Some(one)) => Some(fit_to_length(one, total_samples)),
        (Some(narration), Some(music)) => {
            let mut out = fit_to_length(narration, total_samples);
            for (idx, sample) in out.iter_mut().enumerate() {
                let m = music.get(idx).copied().unwrap_or(0.0);
                *sample = (*sample + m).clamp(-1.0, 1.0);
            }
            Some(out)
        }
    }
}

fn fit_to_length(samples: &[f32], total_samples: usize) -> Vec<f32> {
    let mut out = samples.to_vec();
    out.resize(total_samples, 0.0);
    out
}

/// Write interleaved samples as raw little-endian f32, ready to feed ffmpeg
/// as a raw audio input.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelforgeResult<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReelforgeError::validation(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelforgeError::validation(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
