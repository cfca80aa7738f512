//! Caption generation with a human feedback loop.
//!
//! Images are captioned with a diverse candidate set, the user's confirmed
//! choice is appended to a feedback ledger, a retraining job turns the ledger
//! into a candidate model, and an operator promotes or rejects the candidate
//! after an offline comparison against production.

pub mod app;
pub mod captioning;
pub mod commands;
pub mod error;
pub mod evaluation;
pub mod feedback;
pub mod file_manager;
pub mod logging;
pub mod models;
pub mod process_manager;
pub mod registry;
pub mod retraining;
pub mod utils;

pub use app::{CaptionLoop, SEED_MODEL_FILE};
pub use captioning::{CaptionDiversityEngine, ModelAdapter};
pub use error::{
    CaptionError, EvaluationError, InitError, InputError, LedgerError, ModelError, RegistryError,
    RetrainingError, RetrainingProcessError, StorageError,
};
pub use evaluation::ModelPromotionEvaluator;
pub use feedback::{FeedbackLedger, FileLedger};
pub use registry::ModelRegistry;
pub use retraining::{JobLauncher, OrchestratorConfig, RetrainingOrchestrator, TrainingDataset};
pub use utils::DataPaths;
