use crate::{
    foundation::core::VideoFormat,
    foundation::error::{ReelforgeError, ReelforgeResult},
};

/// The script-level unit of work: a title plus ordered narration segments.
///
/// A plan arrives from the script-writing collaborator with rough duration
/// estimates (or none at all) and is refined in place as the pipeline runs:
/// first by the duration reconciler, then by measured synthesis, finally by
/// forced alignment. Segment order is narration order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ContentPlan {
    /// Video title.
    pub title: String,
    /// Video description.
    pub description: String,
    /// Tag list for publishing.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Target video format.
    #[serde(default)]
    pub format: VideoFormat,
    /// Requested total duration in seconds. Superseded by the measured
    /// narration duration once real audio exists.
    pub target_duration_sec: f64,
    /// Narration language code.
    #[serde(default = "default_language")]
    pub language: String,
    /// Tone hint from the script writer ("calm", "humor", ...). Secondary
    /// signal for music mood inference.
    #[serde(default)]
    pub tone: String,
    /// Ordered narration segments.
    pub segments: Vec<ScriptSegment>,
}

fn default_language() -> String {
    "en".to_string()
}

/// One narration beat: its text, a visual search keyword, and timing fields
/// that are progressively refined.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScriptSegment {
    /// Narration text, possibly containing parenthesized sound-effect cues.
    pub text: String,
    /// Stock-footage search keyword.
    pub keyword: String,
    /// Duration estimate in seconds. Refined twice: by the reconciler, then
    /// by measured synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    /// Start timestamp, present only after alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_sec: Option<f64>,
    /// End timestamp, present only after alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_sec: Option<f64>,
}

impl ScriptSegment {
    /// Narration text with parenthesized sound-effect cues removed.
    pub fn clean_text(&self) -> String {
        strip_parenthesized(&self.text)
    }

    /// Word count of the cleaned narration text.
    pub fn word_count(&self) -> usize {
        self.clean_text().split_whitespace().count()
    }
}

/// Remove `(...)` spans, which script writers use for sound-effect cues that
/// are never narrated. Unbalanced parens keep the trailing text.
fn strip_parenthesized(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ContentPlan {
    /// Validate plan invariants before the pipeline touches it.
    pub fn validate(&self) -> ReelforgeResult<()> {
        if self.title.trim().is_empty() {
            return Err(ReelforgeError::validation("plan title must be non-empty"));
        }
        if !self.target_duration_sec.is_finite() || self.target_duration_sec <= 0.0 {
            return Err(ReelforgeError::validation(
                "plan target_duration_sec must be finite and > 0",
            ));
        }
        for (idx, segment) in self.segments.iter().enumerate() {
            if segment.text.trim().is_empty() {
                return Err(ReelforgeError::validation(format!(
                    "segment {idx} has empty narration text"
                )));
            }
            if let Some(d) = segment.duration_sec
                && (!d.is_finite() || d < 0.0)
            {
                return Err(ReelforgeError::validation(format!(
                    "segment {idx} has invalid duration estimate"
                )));
            }
        }
        Ok(())
    }

    /// Sum of current segment duration estimates, treating missing values as
    /// zero.
    pub fn estimated_total_sec(&self) -> f64 {
        self.segments
            .iter()
            .filter_map(|s| s.duration_sec)
            .sum::<f64>()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/plan/model.rs"]
mod tests;
