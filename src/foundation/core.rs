use crate::foundation::error::{ReelforgeError, ReelforgeResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Construct a canvas, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> ReelforgeResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelforgeError::validation(
                "canvas width/height must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    /// Width divided by height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Target video format. Each format has a canonical canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    /// Vertical short-form video (1080x1920).
    #[default]
    Shorts,
    /// Horizontal video (1920x1080).
    Landscape,
    /// Square video (1080x1080).
    Square,
}

impl VideoFormat {
    /// Canonical output canvas for this format.
    pub fn canvas(self) -> Canvas {
        match self {
            VideoFormat::Shorts => Canvas {
                width: 1080,
                height: 1920,
            },
            VideoFormat::Landscape => Canvas {
                width: 1920,
                height: 1080,
            },
            VideoFormat::Square => Canvas {
                width: 1080,
                height: 1080,
            },
        }
    }
}

/// Categorical music mood used to match background tracks to content tone.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Bright, upbeat content.
    Happy,
    /// Melancholic or emotional content.
    Sad,
    /// High-energy content (the default when nothing else matches).
    Energetic,
    /// Slow, soothing content.
    Calm,
    /// Suspenseful content.
    Tense,
    /// Enigmatic content.
    Mysterious,
}

impl Mood {
    /// All moods, in catalog order.
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Energetic,
        Mood::Calm,
        Mood::Tense,
        Mood::Mysterious,
    ];

    /// Lowercase name used for catalog keys and music subdirectories.
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Energetic => "energetic",
            Mood::Calm => "calm",
            Mood::Tense => "tense",
            Mood::Mysterious => "mysterious",
        }
    }

    /// Parse a music subdirectory name into a mood.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Mood::ALL.into_iter().find(|m| m.as_str() == name)
    }
}
