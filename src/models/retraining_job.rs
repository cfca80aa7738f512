// Retraining job data models
use crate::error::RetrainingProcessError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Succeeded | JobStatus::Failed => 2,
        }
    }

    /// Transitions only move forward and never leave a terminal state
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// Why a job ended up `Failed`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    ExitCode { code: Option<i32>, message: Option<String> },
    Timeout { seconds: u64 },
    Spawn { message: String },
    MissingArtifact { path: String },
    RegistrationRejected { message: String },
    Internal { message: String },
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::ExitCode { code, message } => {
                match code {
                    Some(code) => write!(f, "worker exited with code {}", code)?,
                    None => write!(f, "worker terminated by signal")?,
                }
                if let Some(message) = message {
                    write!(f, ": {}", message)?;
                }
                Ok(())
            }
            JobFailure::Timeout { seconds } => {
                write!(f, "worker killed after exceeding the {}s timeout", seconds)
            }
            JobFailure::Spawn { message } => write!(f, "failed to start worker: {}", message),
            JobFailure::MissingArtifact { path } => {
                write!(f, "worker reported success but no artifact exists at {}", path)
            }
            JobFailure::RegistrationRejected { message } => {
                write!(f, "candidate registration rejected: {}", message)
            }
            JobFailure::Internal { message } => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainingJob {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8, // 0-100
    pub stage: Option<String>,
    pub training_records: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub captured_stdout: String,
    pub captured_stderr: String,
    pub exit_code: Option<i32>,
    pub failure: Option<JobFailure>,
    pub artifact_id: Option<String>,
    /// Payload of the worker's `result` message, if it sent one
    #[serde(default)]
    pub worker_result: Option<serde_json::Value>,
}

impl RetrainingJob {
    pub fn new(id: String, training_records: usize) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            stage: None,
            training_records,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            captured_stdout: String::new(),
            captured_stderr: String::new(),
            exit_code: None,
            failure: None,
            artifact_id: None,
            worker_result: None,
        }
    }

    /// Returns false (and leaves the job untouched) for a backwards or repeated transition
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        match next {
            JobStatus::Running => self.started_at = Some(now),
            JobStatus::Succeeded | JobStatus::Failed => self.completed_at = Some(now),
            JobStatus::Queued => {}
        }
        self.status = next;
        true
    }

    pub fn succeed(&mut self, artifact_id: String) -> bool {
        if !self.transition(JobStatus::Succeeded) {
            return false;
        }
        self.progress = 100;
        self.stage = None;
        self.artifact_id = Some(artifact_id);
        true
    }

    pub fn fail(&mut self, failure: JobFailure) -> bool {
        if !self.transition(JobStatus::Failed) {
            return false;
        }
        self.failure = Some(failure);
        true
    }

    /// `Ok` with the registered artifact id once Succeeded, the failure once Failed
    pub fn outcome(&self) -> Option<Result<&str, RetrainingProcessError>> {
        match self.status {
            JobStatus::Succeeded => Some(Ok(self.artifact_id.as_deref().unwrap_or_default())),
            JobStatus::Failed => Some(Err(RetrainingProcessError {
                job_id: self.id.clone(),
                failure: self.failure.clone().unwrap_or(JobFailure::Internal {
                    message: "unknown failure".to_string(),
                }),
                stderr: self.captured_stderr.clone(),
            })),
            JobStatus::Queued | JobStatus::Running => None,
        }
    }
}
