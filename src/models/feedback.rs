// Feedback data models
use super::ImageReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One confirmed human choice. Never mutated once written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub image_reference: ImageReference,
    pub chosen_caption: String,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(image_reference: ImageReference, chosen_caption: impl Into<String>) -> Self {
        Self {
            image_reference,
            chosen_caption: chosen_caption.into().trim().to_string(),
            recorded_at: Utc::now(),
        }
    }
}
