use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use crate::{
    foundation::error::{ReelforgeError, ReelforgeResult},
    job::model::{Job, JobStatus},
};

/// Aggregate job statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobStats {
    /// Total jobs ever recorded.
    pub total: usize,
    /// Jobs that reached `Completed`.
    pub completed: usize,
    /// Jobs that reached `Failed`.
    pub failed: usize,
}

impl JobStats {
    /// `completed / total`, 0.0 when no jobs exist.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Durable job history: an in-memory list mirrored to one JSON file.
///
/// A single mutex serializes every read-modify-write of the list *and* its
/// persistence, so history writes stay ordered even when jobs are appended
/// concurrently by an external scheduler. Append/update is the only
/// operation; the core never deletes a job.
#[derive(Debug)]
pub struct JobStore {
    path: PathBuf,
    inner: Mutex<Vec<Job>>,
}

impl JobStore {
    /// Open (or create) the store backed by `path`.
    pub fn open(path: impl Into<PathBuf>) -> ReelforgeResult<Self> {
        let path = path.into();
        let jobs = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ReelforgeError::serde(format!(
                    "job history '{}' is unreadable: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(ReelforgeError::validation(format!(
                    "cannot read job history '{}': {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            inner: Mutex::new(jobs),
        })
    }

    /// Insert or update `job` by id and persist the whole history.
    pub fn upsert(&self, job: &Job) -> ReelforgeResult<()> {
        let mut jobs = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match jobs.iter_mut().find(|j| j.id == job.id) {
            Some(slot) => *slot = job.clone(),
            None => jobs.push(job.clone()),
        }
        self.persist(&jobs)
    }

    /// Fetch a job snapshot by id.
    pub fn get(&self, id: &str) -> Option<Job> {
        let jobs = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        jobs.iter().find(|j| j.id == id).cloned()
    }

    /// Snapshot of the full history, oldest first.
    pub fn all(&self) -> Vec<Job> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Aggregate counters over the history.
    pub fn stats(&self) -> JobStats {
        let jobs = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut stats = JobStats {
            total: jobs.len(),
            ..JobStats::default()
        };
        for job in jobs.iter() {
            match job.status {
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                _ => {}
            }
        }
        stats
    }

    fn persist(&self, jobs: &[Job]) -> ReelforgeResult<()> {
        if let Some(parent) = self.path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("failed to create job history dir: {e}");
        }
        let json = serde_json::to_vec_pretty(jobs)
            .map_err(|e| ReelforgeError::serde(format!("job history encode failed: {e}")))?;
        std::fs::write(&self.path, json).map_err(|e| {
            ReelforgeError::validation(format!(
                "cannot write job history '{}': {e}",
                self.path.display()
            ))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/store.rs"]
mod tests;
