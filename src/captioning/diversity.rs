// Diverse caption generation
// Builds a bounded set of distinct candidates from repeated noisy sampling

use super::ModelAdapter;
use crate::error::{CaptionError, InputError, ModelError};
use crate::models::{CaptionSet, ImageReference};
use log::{debug, warn};
use std::sync::Arc;

pub struct CaptionDiversityEngine {
    adapter: Arc<dyn ModelAdapter>,
}

impl CaptionDiversityEngine {
    pub fn new(adapter: Arc<dyn ModelAdapter>) -> Self {
        Self { adapter }
    }

    /// Deterministic baseline plus noisy samples until `target_count` distinct
    /// captions exist or `sampling_budget` noisy attempts have been spent.
    /// A short result is flagged `exhausted`, it is not an error.
    pub fn generate(
        &self,
        image: &ImageReference,
        target_count: usize,
        sampling_budget: u32,
    ) -> Result<CaptionSet, CaptionError> {
        if target_count == 0 {
            return Err(InputError::ZeroTarget.into());
        }

        let mut set = CaptionSet::new(target_count, sampling_budget);

        let baseline = self.adapter.infer(image, false)?;
        if !set.insert(&baseline) {
            return Err(ModelError::Inference(
                "model returned an empty baseline caption".to_string(),
            )
            .into());
        }

        self.sample_until(image, &mut set, target_count)?;
        Ok(set)
    }

    /// Fresh batch for the same image. With `carry_forward_previous` the earlier
    /// candidates stay visible and `target_count` counts only new captions.
    pub fn regenerate(
        &self,
        image: &ImageReference,
        previous: &[String],
        carry_forward_previous: bool,
        target_count: usize,
        sampling_budget: u32,
    ) -> Result<CaptionSet, CaptionError> {
        if !carry_forward_previous {
            return self.generate(image, target_count, sampling_budget);
        }
        if target_count == 0 {
            return Err(InputError::ZeroTarget.into());
        }

        let mut set = CaptionSet::new(target_count, sampling_budget);
        for caption in previous {
            set.insert(caption);
        }
        let seeded = set.len();

        let baseline = self.adapter.infer(image, false)?;
        set.insert(&baseline);
        if set.is_empty() {
            return Err(ModelError::Inference(
                "model returned an empty baseline caption".to_string(),
            )
            .into());
        }

        self.sample_until(image, &mut set, seeded + target_count)?;
        Ok(set)
    }

    fn sample_until(
        &self,
        image: &ImageReference,
        set: &mut CaptionSet,
        goal: usize,
    ) -> Result<(), CaptionError> {
        while set.len() < goal && set.attempts < set.sampling_budget {
            set.attempts += 1;
            let caption = self.adapter.infer(image, true)?;
            if !set.insert(&caption) {
                debug!("Duplicate or blank sample {} for {}", set.attempts, image);
            }
        }

        if set.len() < goal {
            set.exhausted = true;
            warn!(
                "Sampling budget of {} exhausted for {}: {} of {} captions",
                set.sampling_budget,
                image,
                set.len(),
                goal
            );
        }
        Ok(())
    }
}
