// Error taxonomy shared by every component
use std::path::PathBuf;
use thiserror::Error;

use crate::models::JobFailure;

/// Rejected caller input (bad image reference, unknown caption, zero target)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    #[error("image reference is empty")]
    EmptyReference,
    #[error("image file not found: {0}")]
    ImageNotFound(String),
    #[error("unsupported image URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("image reference contains a line break")]
    LineBreak,
    #[error("caption is empty")]
    EmptyCaption,
    #[error("caption was not one of the offered candidates: {0}")]
    UnknownCaption(String),
    #[error("target_count must be at least 1")]
    ZeroTarget,
}

/// Failure reported by a `ModelAdapter` implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("training failed: {0}")]
    Training(String),
    #[error("failed to load model from {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to append to ledger {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read ledger {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt ledger line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("candidate {0} is already pending a promotion decision")]
    CandidatePending(String),
    #[error("no candidate is pending a promotion decision")]
    NoPendingCandidate,
    #[error("decision is stale: {0}")]
    StaleDecision(String),
    #[error("candidate storage path collides with production: {0:?}")]
    PathCollision(PathBuf),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum RetrainingError {
    #[error("retraining already pending: {0}")]
    AlreadyPending(String),
    #[error("feedback ledger has no records to train on")]
    EmptyLedger,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("retraining job not found: {0}")]
    UnknownJob(String),
    #[error("retraining must be triggered from within a tokio runtime")]
    NoRuntime,
}

/// Outcome of a retraining job that reached `Failed`
#[derive(Debug, Clone, Error)]
#[error("retraining job {job_id} failed: {failure}")]
pub struct RetrainingProcessError {
    pub job_id: String,
    pub failure: JobFailure,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("model artifact missing at {0:?}")]
    ArtifactMissing(PathBuf),
    #[error(transparent)]
    ModelLoad(ModelError),
    #[error("evaluation dataset is empty")]
    EmptyDataset,
    #[error("inference failed during evaluation: {0}")]
    Inference(ModelError),
}

/// Startup failure while preparing the data directory or restoring the registry
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
