// Feedback ledger module
pub mod ledger;
pub mod record_format;

pub use ledger::{FeedbackLedger, FileLedger};
