// Retraining module
pub mod dataset;
pub mod orchestrator;

pub use dataset::{TrainingDataset, TrainingExample};
pub use orchestrator::{JobLauncher, OrchestratorConfig, RetrainingOrchestrator};
