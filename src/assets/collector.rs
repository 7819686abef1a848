use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::{
    assets::cache::FootageCache,
    assets::media::{AudioPart, MediaProbe},
    assets::model::{AssetBundle, NarrationTrack, SegmentTiming, StockClip},
    bgm::catalog::BgmCatalog,
    bgm::select::{infer_mood, select_bgm},
    collab::{AlignSpan, DefaultTrackFetcher, FootageProvider, ForcedAligner, SpeechSynthesizer, VoiceParams},
    config::PipelineConfig,
    foundation::error::{ReelforgeError, ReelforgeResult},
    plan::model::ContentPlan,
};

/// Results-per-provider requested during footage search.
const SEARCH_LIMIT: usize = 3;

/// Materializes every asset a plan needs and progressively replaces duration
/// estimates with ground truth.
///
/// Narration is synthesized per segment so duration drift in one segment can
/// never silently shift the ones after it; each produced file is re-measured
/// and the measurement fed back into the plan.
pub struct AssetCollector<'a> {
    cfg: &'a PipelineConfig,
    synthesizer: &'a dyn SpeechSynthesizer,
    aligner: Option<&'a dyn ForcedAligner>,
    providers: &'a [Box<dyn FootageProvider>],
    bgm_fetcher: Option<&'a dyn DefaultTrackFetcher>,
    media: &'a dyn MediaProbe,
}

impl<'a> AssetCollector<'a> {
    /// Assemble a collector over explicitly constructed collaborators.
    pub fn new(
        cfg: &'a PipelineConfig,
        synthesizer: &'a dyn SpeechSynthesizer,
        aligner: Option<&'a dyn ForcedAligner>,
        providers: &'a [Box<dyn FootageProvider>],
        bgm_fetcher: Option<&'a dyn DefaultTrackFetcher>,
        media: &'a dyn MediaProbe,
    ) -> Self {
        Self {
            cfg,
            synthesizer,
            aligner,
            providers,
            bgm_fetcher,
            media,
        }
    }

    /// Collect narration, footage, and music for `plan`.
    ///
    /// Fatal only when no narration audio can be produced at all; a missing
    /// footage clip or missing music merely degrades the bundle.
    #[instrument(skip_all, fields(title = %plan.title))]
    pub fn collect(
        &self,
        plan: &mut ContentPlan,
        rng: &mut dyn RngCore,
    ) -> ReelforgeResult<AssetBundle> {
        let audio_dir = self.cfg.workdir.join("audio");
        let video_dir = self.cfg.workdir.join("stock_videos");
        let cache_dir = self.cfg.workdir.join("cache");
        for dir in [&audio_dir, &video_dir, &cache_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                ReelforgeError::validation(format!(
                    "failed to create asset dir '{}': {e}",
                    dir.display()
                ))
            })?;
        }

        let mut bundle = AssetBundle::default();

        let narration = self.collect_narration(plan, &audio_dir)?;
        bundle.timings = narration.timings;
        bundle.narration = Some(narration.track);

        self.refine_with_alignment(plan, &mut bundle);

        bundle.clips = self.collect_footage(plan, &video_dir, &cache_dir)?;

        let mood = infer_mood(&plan.title, &plan.tone);
        let mut catalog = BgmCatalog::load_or_scan(&self.cfg.music_dir, self.media);
        bundle.bgm = select_bgm(
            &mut catalog,
            self.media,
            self.bgm_fetcher,
            mood,
            plan.target_duration_sec,
            rng,
        );
        match &bundle.bgm {
            Some(track) => info!(track = %track.name, mood = mood.as_str(), "selected background music"),
            None => warn!(mood = mood.as_str(), "no background music available; continuing without"),
        }

        info!(
            clips = bundle.clips.len(),
            segments = plan.segments.len(),
            "asset collection complete"
        );
        Ok(bundle)
    }

    fn collect_narration(
        &self,
        plan: &mut ContentPlan,
        audio_dir: &std::path::Path,
    ) -> ReelforgeResult<CollectedNarration> {
        let rate = self.cfg.narration_rate();
        let voice = &self.cfg.voice;

        let mut parts = Vec::<AudioPart>::with_capacity(plan.segments.len());
        let mut timings = Vec::<SegmentTiming>::with_capacity(plan.segments.len());
        let mut cursor = 0.0f64;
        let mut produced = 0usize;

        for (index, segment) in plan.segments.iter_mut().enumerate() {
            let text = segment.clean_text();
            let estimate = segment
                .duration_sec
                .filter(|d| *d > 0.0)
                .unwrap_or_else(|| rate.estimate_sec(&text));

            let (duration, degraded, part) = if text.is_empty() {
                debug!(index, "segment narrates nothing; inserting silence");
                (estimate, true, AudioPart::Silence(estimate))
            } else {
                let path = audio_dir.join(format!(
                    "narr_{}.wav",
                    synthesis_cache_key(&text, voice)
                ));
                if path.exists() {
                    debug!(index, "narration cache hit");
                } else if let Err(e) = self.synthesizer.synthesize(&text, voice, &path) {
                    warn!(index, "segment synthesis failed, padding with silence: {e}");
                    segment.duration_sec = Some(estimate);
                    timings.push(SegmentTiming {
                        index,
                        duration_sec: estimate,
                        start_sec: cursor,
                        degraded: true,
                    });
                    parts.push(AudioPart::Silence(estimate));
                    cursor += estimate;
                    continue;
                }
                match self.media.audio_duration_sec(&path) {
                    Ok(measured) => {
                        produced += 1;
                        (measured, false, AudioPart::File(path))
                    }
                    Err(e) => {
                        warn!(index, "duration measurement failed, using estimate: {e}");
                        produced += 1;
                        (estimate, true, AudioPart::File(path))
                    }
                }
            };

            segment.duration_sec = Some(duration);
            timings.push(SegmentTiming {
                index,
                duration_sec: duration,
                start_sec: cursor,
                degraded,
            });
            parts.push(part);
            cursor += duration;
        }

        if produced == 0 {
            return Err(ReelforgeError::asset_collection(
                "no narration audio could be produced for any segment",
            ));
        }

        let narration_path = audio_dir.join("narration.wav");
        self.media
            .concat_audio(&parts, &narration_path)
            .map_err(|e| {
                ReelforgeError::asset_collection(format!("narration concat failed: {e}"))
            })?;

        let duration_sec = match self.media.audio_duration_sec(&narration_path) {
            Ok(d) => d,
            Err(e) => {
                warn!("narration track measurement failed, summing segments: {e}");
                timings.iter().map(|t| t.duration_sec).sum()
            }
        };

        let text = plan
            .segments
            .iter()
            .map(|s| s.clean_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        info!(
            segments = timings.len(),
            produced,
            duration_sec,
            "narration track assembled"
        );

        Ok(CollectedNarration {
            track: NarrationTrack {
                text,
                local_path: narration_path,
                duration_sec,
            },
            timings,
        })
    }

    /// Override measured per-segment timings with alignment-accurate ones.
    /// Best-effort: any failure leaves the decoded durations untouched.
    fn refine_with_alignment(&self, plan: &mut ContentPlan, bundle: &mut AssetBundle) {
        let Some(aligner) = self.aligner else {
            return;
        };
        let Some(narration) = &bundle.narration else {
            return;
        };

        let spans: Vec<AlignSpan> = plan
            .segments
            .iter()
            .filter(|s| !s.clean_text().is_empty())
            .map(|s| AlignSpan {
                text: s.clean_text(),
                keyword: s.keyword.clone(),
            })
            .collect();
        if spans.is_empty() {
            return;
        }

        let words = match aligner.align(&spans, &narration.local_path) {
            Ok(words) if !words.is_empty() => words,
            Ok(_) => {
                warn!("aligner returned no words; keeping measured timings");
                return;
            }
            Err(e) => {
                warn!("alignment failed; keeping measured timings: {e}");
                return;
            }
        };

        let mut word_index = 0usize;
        let mut last_end = 0.0f64;
        for (index, segment) in plan.segments.iter_mut().enumerate() {
            let word_count = segment.word_count();
            if word_count == 0 {
                continue;
            }

            let (start, end) = if word_index < words.len() {
                let start = words[word_index].start_sec;
                let take = (word_index + word_count).min(words.len());
                let end = if take > word_index {
                    words[take - 1].end_sec
                } else {
                    start + 1.0
                };
                word_index = take;
                (start, end)
            } else {
                // Word stream ran out; advance by one second per segment.
                (last_end, last_end + 1.0)
            };

            last_end = end;
            segment.start_sec = Some(start);
            segment.end_sec = Some(end);
            segment.duration_sec = Some(end - start);
            if let Some(timing) = bundle.timings.iter_mut().find(|t| t.index == index) {
                timing.start_sec = start;
                timing.duration_sec = end - start;
                timing.degraded = false;
            }
        }
        info!(words = words.len(), "alignment refinement applied");
    }

    fn collect_footage(
        &self,
        plan: &ContentPlan,
        video_dir: &std::path::Path,
        cache_dir: &std::path::Path,
    ) -> ReelforgeResult<Vec<StockClip>> {
        let cache = FootageCache::open(cache_dir)?;
        let mut clips = Vec::<StockClip>::new();

        for (index, segment) in plan.segments.iter().enumerate() {
            let keyword = segment.keyword.trim();
            if keyword.is_empty() {
                warn!(index, "segment has no search keyword; no visual");
                continue;
            }

            if let Some(clip) = cache.lookup(keyword) {
                info!(index, keyword, id = %clip.id, "footage cache hit");
                clips.push(clip);
                continue;
            }

            let mut candidates = Vec::new();
            for provider in self.providers {
                match provider.search(keyword, SEARCH_LIMIT) {
                    Ok(found) => candidates.extend(found),
                    Err(e) => warn!(provider = provider.name(), keyword, "search failed: {e}"),
                }
            }

            let Some(candidate) = candidates.first() else {
                warn!(index, keyword, "no footage candidates; no visual");
                continue;
            };

            let Some(provider) = self
                .providers
                .iter()
                .find(|p| p.name() == candidate.provider)
            else {
                warn!(keyword, provider = %candidate.provider, "candidate names unknown provider");
                continue;
            };

            match provider.download(candidate, video_dir) {
                Ok(path) => {
                    // Provider-reported lengths are routinely wrong; prefer a
                    // real measurement when the file can be probed.
                    let duration_sec = match self.media.probe_video(&path) {
                        Ok(info) => info.duration_sec,
                        Err(e) => {
                            warn!(keyword, "footage probe failed, keeping reported length: {e}");
                            candidate.duration_sec
                        }
                    };
                    let clip = StockClip {
                        id: candidate.id.clone(),
                        provider: candidate.provider.clone(),
                        keyword: keyword.to_string(),
                        duration_sec,
                        resolution: (candidate.width, candidate.height),
                        local_path: Some(path),
                        downloaded: true,
                    };
                    if let Err(e) = cache.store(keyword, &clip) {
                        warn!(keyword, "failed to write footage cache record: {e}");
                    }
                    clips.push(clip);
                }
                Err(e) => warn!(index, keyword, "download failed; no visual: {e}"),
            }
        }

        Ok(clips)
    }
}

struct CollectedNarration {
    track: NarrationTrack,
    timings: Vec<SegmentTiming>,
}

/// Deterministic cache key for one synthesized span: same text and voice
/// parameters always resolve to the same file.
pub fn synthesis_cache_key(text: &str, voice: &VoiceParams) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    hasher.update(voice.cache_key_component().as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/collector.rs"]
mod tests;
