use chrono::{DateTime, Utc};

use crate::{
    collab::PublishReceipt,
    foundation::core::VideoFormat,
    foundation::error::{ReelforgeError, ReelforgeResult},
};

/// Job lifecycle states, strictly forward except the `Failed` escape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet started.
    Pending,
    /// Script validation and duration reconciliation.
    Planning,
    /// Narration synthesis, footage and music acquisition.
    CollectingAssets,
    /// Composition planning, layout, mixing, rendering.
    Editing,
    /// Publishing the rendered video.
    Uploading,
    /// Finished successfully.
    Completed,
    /// Finished with a fatal error.
    Failed,
}

/// The closed transition table: everything not listed here is rejected.
/// `Editing -> Completed` is the path for jobs that skip publishing.
const TRANSITIONS: [(JobStatus, JobStatus); 6] = [
    (JobStatus::Pending, JobStatus::Planning),
    (JobStatus::Planning, JobStatus::CollectingAssets),
    (JobStatus::CollectingAssets, JobStatus::Editing),
    (JobStatus::Editing, JobStatus::Uploading),
    (JobStatus::Editing, JobStatus::Completed),
    (JobStatus::Uploading, JobStatus::Completed),
];

impl JobStatus {
    /// Position in the forward chain, used to check monotonicity. `Failed`
    /// sits past every forward state.
    pub fn stage_index(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Planning => 1,
            JobStatus::CollectingAssets => 2,
            JobStatus::Editing => 3,
            JobStatus::Uploading => 4,
            JobStatus::Completed => 5,
            JobStatus::Failed => 6,
        }
    }

    /// Whether this state ends the job's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a transition from `self` to `to` is in the table.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        if to == JobStatus::Failed {
            return !self.is_terminal();
        }
        TRANSITIONS.contains(&(self, to))
    }
}

/// One end-to-end pipeline execution with persisted state.
///
/// Owned exclusively by the orchestrator; every mutation goes through
/// [`Job::transition`] / [`Job::record_error`] and is persisted by the job
/// store immediately afterwards. Jobs are never deleted by the core.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Job {
    /// Stable job identifier; also names the output file.
    pub id: String,
    /// The topic or title the job was created for.
    pub topic: String,
    /// Target video format.
    pub format: VideoFormat,
    /// Requested duration in seconds.
    pub target_duration_sec: f64,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Every state the job has been in, in order.
    pub history: Vec<JobStatus>,
    /// Rendered video path once editing succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<std::path::PathBuf>,
    /// Publish result once uploading succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishReceipt>,
    /// Timestamped fatal-error messages.
    #[serde(default)]
    pub error_log: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Set when the job reaches a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job.
    pub fn new(
        id: impl Into<String>,
        topic: impl Into<String>,
        format: VideoFormat,
        target_duration_sec: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            topic: topic.into(),
            format,
            target_duration_sec,
            status: JobStatus::Pending,
            history: vec![JobStatus::Pending],
            output_path: None,
            publish: None,
            error_log: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Move the job to `to`, rejecting transitions outside the table.
    pub fn transition(&mut self, to: JobStatus) -> ReelforgeResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(ReelforgeError::validation(format!(
                "illegal job transition {:?} -> {:?}",
                self.status, to
            )));
        }
        self.status = to;
        self.history.push(to);
        self.updated_at = Utc::now();
        if to.is_terminal() {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }

    /// Append a timestamped message to the error log.
    pub fn record_error(&mut self, message: impl AsRef<str>) {
        let now = Utc::now();
        self.error_log
            .push(format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S"), message.as_ref()));
        self.updated_at = now;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/model.rs"]
mod tests;
