use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{
    assets::model::StockClip,
    foundation::error::{ReelforgeError, ReelforgeResult},
};

/// Keyword-keyed footage cache.
///
/// Each record is one JSON file named by the sha256 of the keyword and holds
/// a serialized [`StockClip`]. A record is only honored when its referenced
/// local file still exists on disk, so deleting downloads naturally
/// invalidates the cache.
#[derive(Clone, Debug)]
pub struct FootageCache {
    dir: PathBuf,
}

impl FootageCache {
    /// Open (and create) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> ReelforgeResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            ReelforgeError::validation(format!(
                "failed to create cache dir '{}': {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    fn record_path(&self, keyword: &str) -> PathBuf {
        let digest = Sha256::digest(keyword.trim().to_lowercase().as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Look up a cached clip for `keyword`. Stale or unreadable records are
    /// treated as misses.
    pub fn lookup(&self, keyword: &str) -> Option<StockClip> {
        let path = self.record_path(keyword);
        let bytes = std::fs::read(&path).ok()?;
        let clip: StockClip = match serde_json::from_slice(&bytes) {
            Ok(clip) => clip,
            Err(e) => {
                warn!(keyword, "discarding unreadable cache record: {e}");
                return None;
            }
        };
        if !clip.is_usable() {
            debug!(keyword, "cache record points at a missing file");
            return None;
        }
        Some(clip)
    }

    /// Store `clip` under `keyword`.
    pub fn store(&self, keyword: &str, clip: &StockClip) -> ReelforgeResult<()> {
        let path = self.record_path(keyword);
        let json = serde_json::to_vec_pretty(clip)
            .map_err(|e| ReelforgeError::serde(format!("failed to encode cache record: {e}")))?;
        std::fs::write(&path, json).map_err(|e| {
            ReelforgeError::validation(format!(
                "failed to write cache record '{}': {e}",
                path.display()
            ))
        })?;
        debug!(keyword, "cached footage record");
        Ok(())
    }

    /// Remove every cache record.
    pub fn clear(&self) -> ReelforgeResult<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir).map_err(|e| {
                ReelforgeError::validation(format!("failed to clear cache: {e}"))
            })?;
        }
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ReelforgeError::validation(format!("failed to recreate cache: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
