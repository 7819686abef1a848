//! Mood inference and background-track selection.
//!
//! Selection is an ordered chain of fallback steps evaluated left-to-right;
//! each step either yields a track or passes. The chain never raises;
//! proceeding with no music is a valid terminal outcome.

use rand::RngCore;
use tracing::{info, warn};

use crate::{
    assets::media::MediaProbe,
    assets::model::BgmTrack,
    bgm::catalog::BgmCatalog,
    collab::DefaultTrackFetcher,
    foundation::core::Mood,
};

/// Title keywords checked first, in order. First table with a hit wins.
const SAD_TRIGGERS: [&str; 7] = [
    "sad", "sorrow", "tear", "grief", "farewell", "goodbye", "loss",
];
const HAPPY_TRIGGERS: [&str; 6] = ["happy", "joy", "joyful", "cheerful", "delight", "celebrat"];
const TENSE_TRIGGERS: [&str; 6] = ["tense", "thriller", "horror", "scary", "fear", "suspense"];
const MYSTERIOUS_TRIGGERS: [&str; 4] = ["mystery", "mysterious", "secret", "unexplained"];

/// Tone hints act as a secondary signal after the title tables.
const CALM_TONES: [&str; 5] = ["calm", "healing", "relax", "soothing", "peaceful"];
const HUMOR_TONES: [&str; 4] = ["humor", "funny", "comedy", "playful"];

/// Infer a music mood from the plan's title and tone.
///
/// Title trigger tables are consulted in a fixed order, then tone hints; when
/// nothing matches, the default mood is [`Mood::Energetic`].
pub fn infer_mood(title: &str, tone: &str) -> Mood {
    let title = title.to_lowercase();
    let tone = tone.to_lowercase();

    let title_hit = |table: &[&str]| table.iter().any(|t| title.contains(t));
    let tone_hit = |table: &[&str]| table.iter().any(|t| tone.contains(t));

    if title_hit(&SAD_TRIGGERS) {
        return Mood::Sad;
    }
    if title_hit(&HAPPY_TRIGGERS) {
        return Mood::Happy;
    }
    if title_hit(&TENSE_TRIGGERS) {
        return Mood::Tense;
    }
    if title_hit(&MYSTERIOUS_TRIGGERS) {
        return Mood::Mysterious;
    }
    if tone_hit(&CALM_TONES) {
        return Mood::Calm;
    }
    if tone_hit(&HUMOR_TONES) {
        return Mood::Happy;
    }
    Mood::Energetic
}

/// One step of the selection fallback chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FallbackStep {
    /// Random pick among tracks of the inferred mood, long enough.
    MoodMatch,
    /// Random pick across the whole catalog, long enough.
    AnyMood,
    /// Acquire default tracks out of band, reload, retry the first two steps.
    FetchDefaults,
}

const FALLBACK_CHAIN: [FallbackStep; 3] = [
    FallbackStep::MoodMatch,
    FallbackStep::AnyMood,
    FallbackStep::FetchDefaults,
];

/// Select a background track for the inferred mood, long enough to cover
/// `min_duration_sec`. Absence of music is a valid outcome, never an error.
pub fn select_bgm(
    catalog: &mut BgmCatalog,
    media: &dyn MediaProbe,
    fetcher: Option<&dyn DefaultTrackFetcher>,
    mood: Mood,
    min_duration_sec: f64,
    rng: &mut dyn RngCore,
) -> Option<BgmTrack> {
    for step in FALLBACK_CHAIN {
        match step {
            FallbackStep::MoodMatch => {
                if let Some(track) = catalog.pick_by_mood(mood, min_duration_sec, rng) {
                    return Some(track);
                }
            }
            FallbackStep::AnyMood => {
                if let Some(track) = catalog.pick_any(min_duration_sec, rng) {
                    info!(mood = mood.as_str(), "no mood match; using any-mood track");
                    return Some(track);
                }
            }
            FallbackStep::FetchDefaults => {
                let Some(fetcher) = fetcher else {
                    continue;
                };
                info!("catalog exhausted; fetching default tracks");
                if let Err(e) = fetcher.fetch_default_tracks(catalog.music_dir()) {
                    warn!("default track acquisition failed: {e}");
                    continue;
                }
                catalog.rescan(media);
                if let Some(track) = catalog.pick_by_mood(mood, min_duration_sec, rng) {
                    return Some(track);
                }
                if let Some(track) = catalog.pick_any(min_duration_sec, rng) {
                    return Some(track);
                }
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "../../tests/unit/bgm/select.rs"]
mod tests;
