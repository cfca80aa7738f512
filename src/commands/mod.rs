// Command handlers - one file per domain
// Each returns a serializable payload or the error rendered as a string
pub mod captions;
pub mod models;
pub mod retraining;
pub mod settings;
