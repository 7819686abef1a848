use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::RngCore;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::{
    assets::media::MediaProbe,
    assets::model::BgmTrack,
    foundation::core::Mood,
    foundation::error::{ReelforgeError, ReelforgeResult},
};

/// Default playback volume recorded for scanned tracks.
const DEFAULT_TRACK_VOLUME: f64 = 0.3;

const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "m4a"];

/// The background-music catalog: a mood-to-tracks mapping persisted next to
/// the music files and rebuilt by directory scan when missing.
///
/// Layout on disk: `music_dir/<mood>/*.mp3` plus `music_dir/catalog.json`.
#[derive(Clone, Debug)]
pub struct BgmCatalog {
    music_dir: PathBuf,
    by_mood: BTreeMap<Mood, Vec<BgmTrack>>,
}

impl BgmCatalog {
    /// Load the persisted catalog, falling back to a directory scan when the
    /// catalog file is missing or unreadable. Never fails; an empty library
    /// yields an empty catalog.
    pub fn load_or_scan(music_dir: &Path, media: &dyn MediaProbe) -> Self {
        match Self::load(music_dir) {
            Ok(catalog) => catalog,
            Err(e) => {
                debug!("no usable catalog file ({e}); scanning music directory");
                let mut catalog = Self {
                    music_dir: music_dir.to_path_buf(),
                    by_mood: BTreeMap::new(),
                };
                catalog.rescan(media);
                catalog
            }
        }
    }

    /// Load the catalog strictly from its JSON file.
    pub fn load(music_dir: &Path) -> ReelforgeResult<Self> {
        let path = catalog_path(music_dir);
        let bytes = std::fs::read(&path).map_err(|e| {
            ReelforgeError::validation(format!("cannot read '{}': {e}", path.display()))
        })?;
        let by_name: BTreeMap<String, Vec<BgmTrack>> = serde_json::from_slice(&bytes)
            .map_err(|e| ReelforgeError::serde(format!("catalog parse failed: {e}")))?;

        let mut by_mood = BTreeMap::new();
        for (name, tracks) in by_name {
            match Mood::from_dir_name(&name) {
                Some(mood) => {
                    by_mood.insert(mood, tracks);
                }
                None => warn!(mood = %name, "skipping unknown mood in catalog"),
            }
        }
        Ok(Self {
            music_dir: music_dir.to_path_buf(),
            by_mood,
        })
    }

    /// Persist the catalog as JSON next to the music files.
    pub fn save(&self) -> ReelforgeResult<()> {
        std::fs::create_dir_all(&self.music_dir).map_err(|e| {
            ReelforgeError::validation(format!("failed to create music dir: {e}"))
        })?;
        let by_name: BTreeMap<&str, &Vec<BgmTrack>> = self
            .by_mood
            .iter()
            .filter(|(_, tracks)| !tracks.is_empty())
            .map(|(mood, tracks)| (mood.as_str(), tracks))
            .collect();
        let json = serde_json::to_vec_pretty(&by_name)
            .map_err(|e| ReelforgeError::serde(format!("catalog encode failed: {e}")))?;
        let path = catalog_path(&self.music_dir);
        std::fs::write(&path, json).map_err(|e| {
            ReelforgeError::validation(format!("cannot write '{}': {e}", path.display()))
        })?;
        Ok(())
    }

    /// Rebuild the catalog by scanning mood-named subdirectories, probing each
    /// audio file for its duration. The result is persisted best-effort.
    pub fn rescan(&mut self, media: &dyn MediaProbe) {
        self.by_mood.clear();
        for mood in Mood::ALL {
            let dir = self.music_dir.join(mood.as_str());
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            let mut tracks = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() || !has_audio_extension(&path) {
                    continue;
                }
                let duration_sec = match media.audio_duration_sec(&path) {
                    Ok(d) => d,
                    Err(e) => {
                        warn!(file = %path.display(), "skipping unprobeable track: {e}");
                        continue;
                    }
                };
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("track")
                    .to_string();
                tracks.push(BgmTrack {
                    name,
                    mood,
                    duration_sec,
                    local_path: path,
                    volume: DEFAULT_TRACK_VOLUME,
                    artist: None,
                    license: None,
                });
            }
            if !tracks.is_empty() {
                self.by_mood.insert(mood, tracks);
            }
        }

        let total: usize = self.by_mood.values().map(Vec::len).sum();
        info!(total, "music directory scanned");
        if total > 0
            && let Err(e) = self.save()
        {
            warn!("failed to persist scanned catalog: {e}");
        }
    }

    /// Total number of tracks across all moods.
    pub fn len(&self) -> usize {
        self.by_mood.values().map(Vec::len).sum()
    }

    /// Whether the catalog holds no tracks at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracks tagged with `mood`.
    pub fn tracks(&self, mood: Mood) -> &[BgmTrack] {
        self.by_mood.get(&mood).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Random track of `mood` with at least `min_duration_sec` of material.
    pub fn pick_by_mood(
        &self,
        mood: Mood,
        min_duration_sec: f64,
        rng: &mut dyn RngCore,
    ) -> Option<BgmTrack> {
        let candidates: Vec<&BgmTrack> = self
            .tracks(mood)
            .iter()
            .filter(|t| t.duration_sec >= min_duration_sec)
            .collect();
        candidates.choose(rng).map(|t| (*t).clone())
    }

    /// Random track of any mood with at least `min_duration_sec` of material.
    pub fn pick_any(&self, min_duration_sec: f64, rng: &mut dyn RngCore) -> Option<BgmTrack> {
        let candidates: Vec<&BgmTrack> = self
            .by_mood
            .values()
            .flatten()
            .filter(|t| t.duration_sec >= min_duration_sec)
            .collect();
        candidates.choose(rng).map(|t| (*t).clone())
    }

    /// Music library root this catalog belongs to.
    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }
}

fn catalog_path(music_dir: &Path) -> PathBuf {
    music_dir.join("catalog.json")
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
#[path = "../../tests/unit/bgm/catalog.rs"]
mod tests;
