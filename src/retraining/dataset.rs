use crate::models::{FeedbackRecord, ImageReference};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingExample {
    pub image: ImageReference,
    pub caption: String,
}

/// Training pairs built from the full ledger. Repeated confirmations stay
/// as repeated examples, so a caption picked twice weighs twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrainingDataset {
    pub examples: Vec<TrainingExample>,
}

impl TrainingDataset {
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let examples = records
            .iter()
            .map(|record| TrainingExample {
                image: record.image_reference.clone(),
                caption: record.chosen_caption.clone(),
            })
            .collect();
        Self { examples }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn distinct_images(&self) -> usize {
        self.examples
            .iter()
            .map(|example| &example.image)
            .collect::<HashSet<_>>()
            .len()
    }
}
