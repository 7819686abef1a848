//! Crop and zoom transforms, expressed as pure geometry.
//!
//! Everything here maps source dimensions (and, for the Ken Burns effect,
//! elapsed time) to crop rectangles in source-pixel space. No rendering
//! backend is involved, which keeps the math independently testable; the
//! ffmpeg renderer consumes these rectangles when it builds filter chains.

use kurbo::Rect;

use crate::foundation::core::Canvas;

/// Centered crop of the source that matches the canvas aspect ratio.
///
/// Whichever axis is in excess relative to the canvas aspect gets cropped;
/// the result is then resized to canvas resolution by the renderer.
pub fn aspect_fit_crop(src_width: u32, src_height: u32, canvas: Canvas) -> Rect {
    let sw = f64::from(src_width);
    let sh = f64::from(src_height);
    let src_aspect = sw / sh;
    let target_aspect = canvas.aspect();

    if src_aspect > target_aspect {
        // Source is wider: crop left/right.
        let new_w = sh * target_aspect;
        let x0 = (sw - new_w) / 2.0;
        Rect::new(x0, 0.0, x0 + new_w, sh)
    } else {
        // Source is taller: crop top/bottom.
        let new_h = sw / target_aspect;
        let y0 = (sh - new_h) / 2.0;
        Rect::new(0.0, y0, sw, y0 + new_h)
    }
}

/// Zoom factor at elapsed time `t` of a clip lasting `total_sec`.
///
/// Maps `t ∈ [0, total]` linearly onto `[1.0, ratio]`. Out-of-range times are
/// clamped; a non-positive total yields no zoom.
pub fn ken_burns_zoom(t_sec: f64, total_sec: f64, ratio: f64) -> f64 {
    if total_sec <= 0.0 || ratio <= 1.0 {
        return 1.0;
    }
    let progress = (t_sec / total_sec).clamp(0.0, 1.0);
    1.0 + (ratio - 1.0) * progress
}

/// Centered crop implementing a zoom of `factor` on a source frame: the
/// visible window shrinks to `1/factor` of the frame and is scaled back up to
/// full size by the renderer.
pub fn ken_burns_crop(src_width: u32, src_height: u32, factor: f64) -> Rect {
    let sw = f64::from(src_width);
    let sh = f64::from(src_height);
    let factor = factor.max(1.0);
    let w = sw / factor;
    let h = sh / factor;
    let x0 = (sw - w) / 2.0;
    let y0 = (sh - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

#[cfg(test)]
#[path = "../../tests/unit/layout/visual.rs"]
mod tests;
