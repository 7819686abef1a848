//! MP4 rendering through the system `ffmpeg` binary.
//!
//! The renderer turns a [`CompositionPlan`] plus pre-computed caption
//! geometry into one ffmpeg invocation: per-clip loop/trim/crop/scale chains
//! with a Ken Burns zoom, an `xfade` chain whose offsets come straight from
//! the planner's timeline starts, an ASS subtitle burn, and an optional raw
//! f32le audio input produced by the mixer.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::{
    assets::media::{ensure_parent_dir, is_ffmpeg_on_path},
    compose::planner::CompositionPlan,
    foundation::core::Canvas,
    foundation::error::{ReelforgeError, ReelforgeResult},
    layout::text::{CaptionEvent, CaptionLayout},
    layout::visual::aspect_fit_crop,
};

/// Everything the renderer needs for one job.
pub struct RenderJob<'a> {
    /// Clip allocation and timeline.
    pub comp: &'a CompositionPlan,
    /// Timed, placed captions.
    pub captions: &'a [CaptionEvent],
    /// Title card shown for the whole video, when present.
    pub title: Option<&'a CaptionLayout>,
    /// Mixed audio as raw interleaved stereo f32le, when present.
    pub audio_f32le: Option<&'a Path>,
    /// Sample rate of the raw audio input.
    pub audio_sample_rate: u32,
}

/// Boundary between the pipeline and the compositing backend.
pub trait Renderer {
    /// Render `job` into `out_path`, returning the written file path.
    fn render(&self, job: &RenderJob<'_>, out_path: &Path) -> ReelforgeResult<PathBuf>;
}

/// [`Renderer`] backed by one `ffmpeg` subprocess per job.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegRenderer;

impl Renderer for FfmpegRenderer {
    fn render(&self, job: &RenderJob<'_>, out_path: &Path) -> ReelforgeResult<PathBuf> {
        if job.comp.clips.is_empty() {
            return Err(ReelforgeError::composition("render called with no clips"));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelforgeError::validation(
                "ffmpeg is required for rendering, but was not found on PATH",
            ));
        }
        ensure_parent_dir(out_path)?;

        let ass_path = out_path.with_extension("ass");
        let ass = build_ass_document(job.comp.canvas, job.comp.total_duration_sec, job);
        std::fs::write(&ass_path, ass).map_err(|e| {
            ReelforgeError::validation(format!(
                "failed to write subtitle file '{}': {e}",
                ass_path.display()
            ))
        })?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-loglevel", "error"]);

        for clip in &job.comp.clips {
            if clip.loops > 1 {
                cmd.args(["-stream_loop", &(clip.loops - 1).to_string()]);
            }
            cmd.arg("-i").arg(&clip.source);
        }

        let audio_input_index = job.comp.clips.len();
        if let Some(audio) = job.audio_f32le {
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &job.audio_sample_rate.to_string(),
                "-ac",
                "2",
            ]);
            cmd.arg("-i").arg(audio);
        }

        let filter = build_filter_graph(job.comp, &ass_path);
        debug!(filter = %filter, "assembled ffmpeg filter graph");
        cmd.args(["-filter_complex", &filter, "-map", "[vout]"]);

        if job.audio_f32le.is_some() {
            cmd.args(["-map", &format!("{audio_input_index}:a"), "-c:a", "aac"]);
        } else {
            cmd.arg("-an");
        }

        cmd.args([
            "-t",
            &format!("{:.3}", job.comp.total_duration_sec),
            "-r",
            &job.comp.fps.to_string(),
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(out_path);

        let output = cmd
            .output()
            .map_err(|e| ReelforgeError::validation(format!("failed to spawn ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(ReelforgeError::composition(format!(
                "ffmpeg render failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!(out = %out_path.display(), "video rendered");
        Ok(out_path.to_path_buf())
    }
}

/// Build the `-filter_complex` graph: per-clip normalize chains, the xfade
/// chain, and the subtitle burn.
fn build_filter_graph(comp: &CompositionPlan, ass_path: &Path) -> String {
    let canvas = comp.canvas;
    let mut filter = String::new();

    for (i, clip) in comp.clips.iter().enumerate() {
        let (src_w, src_h) = clip.source_resolution;
        let crop = if src_w > 0 && src_h > 0 {
            aspect_fit_crop(src_w, src_h, canvas)
        } else {
            kurbo::Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height))
        };
        let frames = ((clip.duration_sec * f64::from(comp.fps)).round() as u64).max(1);
        filter.push_str(&format!(
            "[{i}:v]trim=duration={dur:.3},setpts=PTS-STARTPTS,\
             crop={cw:.0}:{ch:.0}:{cx:.0}:{cy:.0},scale={w}:{h},\
             zoompan=z='1+{zr:.4}*on/{frames}':d=1:\
             x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s={w}x{h}:fps={fps},\
             format=yuv420p,settb=AVTB[v{i}];",
            dur = clip.duration_sec,
            cw = crop.width(),
            ch = crop.height(),
            cx = crop.x0,
            cy = crop.y0,
            w = canvas.width,
            h = canvas.height,
            zr = comp.ken_burns_ratio - 1.0,
            fps = comp.fps,
        ));
    }

    let mut prev = "v0".to_string();
    if comp.clips.len() > 1 && comp.crossfade_sec > 0.0 {
        for i in 1..comp.clips.len() {
            let label = format!("x{i}");
            filter.push_str(&format!(
                "[{prev}][v{i}]xfade=transition=fade:duration={dur:.3}:offset={off:.3}[{label}];",
                dur = comp.crossfade_sec,
                off = comp.clips[i].timeline_start_sec,
            ));
            prev = label;
        }
    } else if comp.clips.len() > 1 {
        for i in 0..comp.clips.len() {
            filter.push_str(&format!("[v{i}]"));
        }
        filter.push_str(&format!("concat=n={}:v=1:a=0[xc];", comp.clips.len()));
        prev = "xc".to_string();
    }

    filter.push_str(&format!(
        "[{prev}]ass='{}'[vout]",
        escape_filter_path(ass_path)
    ));
    filter
}

/// Escape a path for use inside a single-quoted ffmpeg filter argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Build the ASS document carrying captions and the title card.
///
/// Each text block becomes two events: a vector-drawn background box on layer
/// 0 (sized exactly from the layout geometry) and the outlined text on layer
/// 1, positioned with `\pos` and auto-wrap disabled, since line breaks were
/// already decided by the layout engine.
fn build_ass_document(canvas: Canvas, total_duration_sec: f64, job: &RenderJob<'_>) -> String {
    let mut doc = String::new();
    doc.push_str("[Script Info]\n");
    doc.push_str("ScriptType: v4.00+\n");
    doc.push_str(&format!("PlayResX: {}\n", canvas.width));
    doc.push_str(&format!("PlayResY: {}\n", canvas.height));
    doc.push_str("WrapStyle: 2\n\n");

    doc.push_str("[V4+ Styles]\n");
    doc.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, OutlineColour, BackColour, \
         Bold, Outline, Shadow, Alignment, MarginL, MarginR, MarginV\n",
    );
    doc.push_str(
        "Style: Caption,Sans,70,&H00FFFFFF,&H00000000,&H00000000,0,3,0,8,0,0,0\n",
    );
    doc.push_str(
        "Style: Title,Sans,80,&H00FFFFFF,&H00000000,&H00000000,1,3,0,8,0,0,0\n\n",
    );

    doc.push_str("[Events]\n");
    doc.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    if let Some(title) = job.title {
        push_block_events(&mut doc, "Title", 0.0, total_duration_sec, title);
    }
    for event in job.captions {
        push_block_events(
            &mut doc,
            "Caption",
            event.start_sec,
            event.end_sec.min(total_duration_sec),
            &event.layout,
        );
    }
    doc
}

fn push_block_events(
    doc: &mut String,
    style: &str,
    start_sec: f64,
    end_sec: f64,
    layout: &CaptionLayout,
) {
    if end_sec <= start_sec {
        return;
    }
    let start = ass_time(start_sec);
    let end = ass_time(end_sec);

    // Background box, drawn in screen space on the lower layer.
    let alpha = ass_alpha(layout.bg_opacity);
    doc.push_str(&format!(
        "Dialogue: 0,{start},{end},{style},,0,0,0,,{{\\pos({x:.0},{y:.0})\\an7\\1c&H000000&\\1a&H{alpha}&\\bord0\\p1}}m 0 0 l {w:.0} 0 {w:.0} {h:.0} 0 {h:.0}{{\\p0}}\n",
        x = layout.bg.x0,
        y = layout.bg.y0,
        w = layout.bg.width(),
        h = layout.bg.height(),
    ));

    // Text block on the upper layer, centered over the box.
    let text = layout.lines.join("\\N");
    let center_x = layout.bg.center().x;
    doc.push_str(&format!(
        "Dialogue: 1,{start},{end},{style},,0,0,0,,{{\\pos({cx:.0},{ty:.0})\\an8\\q2\\fs{fs:.0}}}{text}\n",
        cx = center_x,
        ty = layout.text_origin.y,
        fs = layout.font_px,
    ));
}

/// Format seconds as ASS `h:mm:ss.cs`.
fn ass_time(sec: f64) -> String {
    let sec = sec.max(0.0);
    let centis = (sec * 100.0).round() as u64;
    let cs = centis % 100;
    let total_sec = centis / 100;
    let s = total_sec % 60;
    let m = (total_sec / 60) % 60;
    let h = total_sec / 3600;
    format!("{h}:{m:02}:{s:02}.{cs:02}")
}

/// ASS alpha byte (00 = opaque, FF = transparent) for a box opacity.
fn ass_alpha(opacity: f64) -> String {
    let a = ((1.0 - opacity.clamp(0.0, 1.0)) * 255.0).round() as u8;
    format!("{a:02X}")
}

#[cfg(test)]
#[path = "../../tests/unit/render/encode.rs"]
mod tests;
