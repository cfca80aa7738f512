// Data models (structs)
pub mod artifact;
pub mod caption;
pub mod evaluation;
pub mod feedback;
pub mod retraining_job;
pub mod settings;

pub use artifact::*;
pub use caption::*;
pub use evaluation::*;
pub use feedback::*;
pub use retraining_job::*;
pub use settings::*;
