use super::*;
use crate::foundation::core::VideoFormat;

#[test]
fn default_config_is_valid() {
    PipelineConfig::default().validate().unwrap();
}

#[test]
fn overlay_precedence_is_explicit_over_account_over_global() {
    let global = PipelineConfig::default();
    let account = ConfigOverlay {
        format: Some(VideoFormat::Landscape),
        music_volume: Some(0.2),
        crossfade_sec: Some(0.8),
        ..ConfigOverlay::default()
    };
    let explicit = ConfigOverlay {
        music_volume: Some(0.1),
        ..ConfigOverlay::default()
    };

    let cfg = global.merged(Some(&account), Some(&explicit));
    // Explicit wins where set.
    assert_eq!(cfg.music_volume, 0.1);
    // Account fills the rest.
    assert_eq!(cfg.format, VideoFormat::Landscape);
    assert_eq!(cfg.crossfade_sec, 0.8);
    // Untouched fields come from the global default.
    assert_eq!(cfg.fps, 30);
}

#[test]
fn merged_without_overlays_is_the_global_config() {
    let global = PipelineConfig::default();
    let cfg = global.merged(None, None);
    assert_eq!(cfg.crossfade_sec, global.crossfade_sec);
    assert_eq!(cfg.language, global.language);
}

#[test]
fn narration_rate_depends_on_language() {
    assert_eq!(NarrationRate::for_language("ko").chars_per_sec, 3.0);
    assert_eq!(NarrationRate::for_language("ko-KR").chars_per_sec, 3.0);
    assert_eq!(NarrationRate::for_language("en").chars_per_sec, 14.0);
    assert_eq!(NarrationRate::for_language("de-DE").chars_per_sec, 14.0);
}

#[test]
fn estimate_never_returns_zero() {
    let rate = NarrationRate::for_language("en");
    assert!(rate.estimate_sec("") >= 0.1);
    let est = rate.estimate_sec("a sentence of ordinary length for narration");
    assert!(est > 2.0 && est < 5.0);
}

#[test]
fn safe_zone_bands_follow_canvas() {
    let sz = SafeZone::default();
    let canvas = VideoFormat::Shorts.canvas();
    assert_eq!(sz.y_min(canvas), 288.0);
    assert_eq!(sz.y_max(canvas), 1344.0);
    assert_eq!(sz.max_text_width(canvas), 864.0);
}

#[test]
fn invalid_configs_are_rejected() {
    let mut cfg = PipelineConfig::default();
    cfg.fps = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.ken_burns_ratio = 0.9;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.music_volume_floor = 0.5;
    cfg.music_volume_ceiling = 0.2;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.safe_zone.top_ratio = 0.6;
    cfg.safe_zone.bottom_ratio = 0.5;
    assert!(cfg.validate().is_err());
}
