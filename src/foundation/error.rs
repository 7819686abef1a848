/// Convenience result type used across Reelforge.
pub type ReelforgeResult<T> = Result<T, ReelforgeError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// The split mirrors the degradation rule of the pipeline: anything that
/// would leave the final video desynchronized surfaces as
/// [`ReelforgeError::AssetCollection`] or [`ReelforgeError::Composition`] and
/// fails the job; conditions that only reduce richness (a missing footage
/// clip, no background music) are logged as warnings and never become errors.
#[derive(thiserror::Error, Debug)]
pub enum ReelforgeError {
    /// Invalid user-provided plan, configuration, or state transition.
    #[error("validation error: {0}")]
    Validation(String),

    /// No usable narration audio could be produced for a plan.
    #[error("asset collection failed: {0}")]
    AssetCollection(String),

    /// The composition stage had nothing to work with (no usable clips).
    #[error("composition failed: {0}")]
    Composition(String),

    /// Publishing exhausted its retries; the last provider error is retained.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Errors when serializing or deserializing persisted data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelforgeError {
    /// Build a [`ReelforgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelforgeError::AssetCollection`] value.
    pub fn asset_collection(msg: impl Into<String>) -> Self {
        Self::AssetCollection(msg.into())
    }

    /// Build a [`ReelforgeError::Composition`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Build a [`ReelforgeError::Publish`] value.
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Build a [`ReelforgeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
