// Model artifact and promotion data models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    Production,
    Candidate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    pub id: String,
    pub role: ArtifactRole,
    pub storage_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub accuracy_score: Option<f64>,
    #[serde(default)]
    pub source_job_id: Option<String>,
}

impl ModelArtifact {
    pub fn production(storage_path: impl Into<PathBuf>) -> Self {
        Self::with_role(ArtifactRole::Production, storage_path.into(), None)
    }

    pub fn candidate(storage_path: impl Into<PathBuf>, source_job_id: Option<String>) -> Self {
        Self::with_role(ArtifactRole::Candidate, storage_path.into(), source_job_id)
    }

    fn with_role(role: ArtifactRole, storage_path: PathBuf, source_job_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            storage_path,
            created_at: Utc::now(),
            accuracy_score: None,
            source_job_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Promote,
    Reject,
}

/// Operator verdict on a pending candidate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionDecision {
    pub candidate_id: String,
    pub production_id_at_time: String,
    pub accuracy_current: f64,
    pub accuracy_candidate: f64,
    pub outcome: DecisionOutcome,
    pub decided_at: DateTime<Utc>,
}

/// Applied decision kept in the registry's audit history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub decision: PromotionDecision,
    pub applied_at: DateTime<Utc>,
    pub production_after: String,
}
