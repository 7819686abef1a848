//! Safe-zone-constrained text layout for captions and titles.
//!
//! Wrapping decisions use real font metrics (Parley), never character counts:
//! a caption is wrapped at a maximum pixel width, its background box is sized
//! from the tight text bounding box plus a descender safety margin, and the
//! block's vertical position is clamped into the safe band so it can never
//! collide with platform chrome. The renderer turns the resulting geometry
//! into subtitle events; nothing here rasterizes.

use kurbo::{Point, Rect};
use tracing::warn;

use crate::{
    assets::model::SegmentTiming,
    config::{SafeZone, SubtitleStyle, TitleStyle},
    foundation::core::Canvas,
    foundation::error::{ReelforgeError, ReelforgeResult},
    plan::model::ScriptSegment,
};

/// Extra height reserved below the text baseline block, as a fraction of the
/// glyph size, so descenders (g, j, y) are never clipped by the box.
pub const DESCENDER_MARGIN_RATIO: f64 = 0.20;

/// Measured dimensions of a single laid-out text line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextMetrics {
    /// Advance width in pixels.
    pub width: f64,
    /// Ascent above the baseline.
    pub ascent: f64,
    /// Descent below the baseline.
    pub descent: f64,
    /// Additional leading.
    pub leading: f64,
}

impl TextMetrics {
    /// Full line height.
    pub fn line_height(&self) -> f64 {
        self.ascent + self.descent + self.leading
    }
}

/// RGBA8 brush attached to Parley layouts. Measurement does not use the
/// color; the type satisfies Parley's brush bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Stateful text measurer over one registered font.
pub struct TextMeasurer {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    family: String,
}

impl TextMeasurer {
    /// Register `font_bytes` and build a measurer for that family.
    pub fn new(font_bytes: Vec<u8>) -> ReelforgeResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ReelforgeError::validation("no font families registered from font bytes")
        })?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelforgeError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family,
        })
    }

    /// Measure `text` as a single line at `size_px`.
    pub fn measure(&mut self, text: &str, size_px: f32) -> ReelforgeResult<TextMetrics> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelforgeError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrush::default()));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);

        let mut metrics = TextMetrics::default();
        for line in layout.lines() {
            let m = line.metrics();
            metrics.width = metrics.width.max(f64::from(m.advance));
            metrics.ascent = metrics.ascent.max(f64::from(m.ascent));
            metrics.descent = metrics.descent.max(f64::from(m.descent));
            metrics.leading = metrics.leading.max(f64::from(m.leading));
        }
        Ok(metrics)
    }
}

/// Greedy word wrap against a pixel-width budget.
///
/// `measure_line` returns the advance width of a candidate line; the function
/// never breaks inside a word, so a single word wider than the budget gets a
/// line of its own.
pub fn wrap_to_width(
    text: &str,
    max_width: f64,
    measure_line: &mut dyn FnMut(&str) -> ReelforgeResult<f64>,
) -> ReelforgeResult<Vec<String>> {
    let mut lines = Vec::<String>::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure_line(&candidate)? <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines)
}

/// Clamp a block's top edge so `[y, y + height]` stays inside
/// `[band_min, band_max]`. When the block is taller than the band, the top
/// edge wins.
pub fn clamp_into_band(y: f64, height: f64, band_min: f64, band_max: f64) -> f64 {
    let mut y = y;
    if y + height > band_max {
        y = band_max - height;
    }
    if y < band_min {
        y = band_min;
    }
    y
}

/// A fully placed text block: wrapped lines, background box, and text origin.
#[derive(Clone, Debug)]
pub struct CaptionLayout {
    /// Wrapped lines, top to bottom.
    pub lines: Vec<String>,
    /// Font size the block was measured at.
    pub font_px: f32,
    /// Tight text width in pixels.
    pub text_width: f64,
    /// Text block height including the descender margin.
    pub text_height: f64,
    /// Semi-opaque background rectangle, canvas coordinates.
    pub bg: Rect,
    /// Background opacity, `0.0..=1.0`.
    pub bg_opacity: f64,
    /// Top-left corner of the text block, canvas coordinates.
    pub text_origin: Point,
}

/// Size and place a text block inside a vertical band. Pure geometry; the
/// caller supplies measured text dimensions.
pub fn place_text_block(
    text_width: f64,
    text_height: f64,
    canvas: Canvas,
    band_min: f64,
    band_max: f64,
    padding_x: f64,
    padding_y: f64,
    preferred_y: Option<f64>,
) -> (Rect, Point) {
    let canvas_w = f64::from(canvas.width);
    let bg_w = (text_width + 2.0 * padding_x).min(canvas_w);
    let bg_h = text_height + 2.0 * padding_y;

    let y = preferred_y.unwrap_or(band_max - bg_h);
    let y = clamp_into_band(y, bg_h, band_min, band_max);
    let bg_x = (canvas_w - bg_w) / 2.0;

    let bg = Rect::new(bg_x, y, bg_x + bg_w, y + bg_h);
    let origin = Point::new((canvas_w - text_width) / 2.0, y + padding_y);
    (bg, origin)
}

/// Lay out one caption inside the subtitle safe band.
pub fn layout_caption(
    text: &str,
    canvas: Canvas,
    safe: &SafeZone,
    style: &SubtitleStyle,
    measurer: &mut TextMeasurer,
) -> ReelforgeResult<CaptionLayout> {
    let char_count = text.chars().filter(|c| !c.is_whitespace()).count();
    let font_px = if char_count > style.small_threshold_chars {
        style.font_px_small
    } else {
        style.font_px
    };

    let max_width = safe.max_text_width(canvas);
    let lines = wrap_to_width(text, max_width, &mut |line| {
        Ok(measurer.measure(line, font_px)?.width)
    })?;
    if lines.is_empty() {
        return Err(ReelforgeError::validation("caption text is empty"));
    }

    let mut text_width = 0.0f64;
    let mut text_height = 0.0f64;
    for line in &lines {
        let m = measurer.measure(line, font_px)?;
        text_width = text_width.max(m.width);
        text_height += m.line_height();
    }
    text_height += DESCENDER_MARGIN_RATIO * f64::from(font_px);

    let band_min = safe.y_min(canvas);
    let band_max = safe.y_max(canvas);
    let preferred = band_max - (text_height + 2.0 * style.padding_y) - style.bottom_offset_px;
    let (bg, origin) = place_text_block(
        text_width,
        text_height,
        canvas,
        band_min,
        band_max,
        style.padding_x,
        style.padding_y,
        Some(preferred),
    );

    Ok(CaptionLayout {
        lines,
        font_px,
        text_width,
        text_height,
        bg,
        bg_opacity: style.bg_opacity,
        text_origin: origin,
    })
}

/// Lay out the title card inside the top band.
pub fn layout_title(
    title: &str,
    canvas: Canvas,
    safe: &SafeZone,
    style: &TitleStyle,
    measurer: &mut TextMeasurer,
) -> ReelforgeResult<CaptionLayout> {
    let clean = strip_decorations(title);
    let max_width = safe.max_text_width(canvas);
    let lines = wrap_to_width(&clean, max_width, &mut |line| {
        Ok(measurer.measure(line, style.font_px)?.width)
    })?;
    if lines.is_empty() {
        return Err(ReelforgeError::validation("title text is empty"));
    }

    let mut text_width = 0.0f64;
    let mut text_height = 0.0f64;
    for line in &lines {
        let m = measurer.measure(line, style.font_px)?;
        text_width = text_width.max(m.width);
        text_height += m.line_height();
    }
    text_height += DESCENDER_MARGIN_RATIO * f64::from(style.font_px);

    let canvas_h = f64::from(canvas.height);
    let band_min = canvas_h * style.top_margin_ratio;
    let band_max = canvas_h * style.band_ratio;
    if band_max - band_min < text_height {
        warn!("title taller than its band; clamping to the band top");
    }
    let (bg, origin) = place_text_block(
        text_width,
        text_height,
        canvas,
        band_min,
        band_max,
        style.padding_x,
        style.padding_y,
        Some(band_min),
    );

    Ok(CaptionLayout {
        lines,
        font_px: style.font_px,
        text_width,
        text_height,
        bg,
        bg_opacity: style.bg_opacity,
        text_origin: origin,
    })
}

/// Strip emoji and decorative symbols from a title.
pub fn strip_decorations(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|&c| {
            let cp = c as u32;
            !((0x1F000..=0x1FFFF).contains(&cp)
                || (0x2600..=0x27BF).contains(&cp)
                || (0x2190..=0x21FF).contains(&cp)
                || cp == 0xFE0F)
        })
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        "Untitled".to_string()
    } else {
        cleaned
    }
}

/// One timed caption chunk, pre-layout.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionCue {
    /// Chunk text.
    pub text: String,
    /// Start offset on the video timeline, seconds.
    pub start_sec: f64,
    /// On-screen duration, seconds.
    pub duration_sec: f64,
}

/// A caption cue bound to its resolved layout, ready for the renderer.
#[derive(Clone, Debug)]
pub struct CaptionEvent {
    /// Start offset, seconds.
    pub start_sec: f64,
    /// End offset, seconds.
    pub end_sec: f64,
    /// Placed text block.
    pub layout: CaptionLayout,
}

/// Split a long caption into readable chunks of at most `max_chars`,
/// preferring sentence boundaries and falling back to word boundaries.
pub fn split_caption_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::<String>::new();
    let mut current = String::new();
    for sentence in split_sentences(text) {
        let candidate_len = current.chars().count()
            + if current.is_empty() { 0 } else { 1 }
            + sentence.chars().count();
        if candidate_len <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if sentence.chars().count() <= max_chars {
            current = sentence;
            continue;
        }
        // Sentence itself is too long: split on words.
        for word in sentence.split_whitespace() {
            let candidate_len =
                current.chars().count() + if current.is_empty() { 0 } else { 1 } + word.chars().count();
            if candidate_len <= max_chars || current.is_empty() {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            } else {
                chunks.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::<String>::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let s = current.trim().to_string();
            if !s.is_empty() {
                sentences.push(s);
            }
            current.clear();
        }
    }
    let s = current.trim().to_string();
    if !s.is_empty() {
        sentences.push(s);
    }
    sentences
}

/// Produce timed caption cues from measured segment timings.
///
/// Long segments are split into chunks; each chunk's duration blends its
/// character-weighted share of the segment with a reading-speed optimum and
/// is clamped to the configured bounds.
pub fn caption_cues(
    segments: &[ScriptSegment],
    timings: &[SegmentTiming],
    style: &SubtitleStyle,
) -> Vec<CaptionCue> {
    let mut cues = Vec::<CaptionCue>::new();
    for timing in timings {
        let Some(segment) = segments.get(timing.index) else {
            continue;
        };
        let text = segment.clean_text();
        if text.is_empty() {
            continue;
        }

        let chunks = split_caption_chunks(&text, style.max_chars);
        let total_chars: usize = chunks.iter().map(|c| c.chars().count()).sum();
        if total_chars == 0 {
            continue;
        }

        let mut start = timing.start_sec;
        for chunk in chunks {
            let chars = chunk.chars().count();
            let share = timing.duration_sec * chars as f64 / total_chars as f64;
            let optimal = chars as f64 / style.read_chars_per_sec;
            let duration = ((share + optimal) / 2.0)
                .clamp(style.min_caption_sec, style.max_caption_sec);
            cues.push(CaptionCue {
                text: chunk,
                start_sec: start,
                duration_sec: duration,
            });
            start += duration;
        }
    }
    cues
}

#[cfg(test)]
#[path = "../../tests/unit/layout/text.rs"]
mod tests;
