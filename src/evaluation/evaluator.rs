// Offline production-vs-candidate comparison
// Advisory only: produces a report, never touches the registry

use crate::captioning::ModelAdapter;
use crate::error::EvaluationError;
use crate::models::{ComparisonReport, DecisionOutcome, EvalDataset, ModelArtifact};
use log::{info, warn};
use std::sync::Arc;

pub struct ModelPromotionEvaluator {
    adapter: Arc<dyn ModelAdapter>,
    promotion_margin: f64,
}

fn normalize(caption: &str) -> String {
    caption
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

impl ModelPromotionEvaluator {
    pub fn new(adapter: Arc<dyn ModelAdapter>, promotion_margin: f64) -> Self {
        Self {
            adapter,
            promotion_margin,
        }
    }

    fn load(&self, artifact: &ModelArtifact) -> Result<Arc<dyn ModelAdapter>, EvaluationError> {
        if !artifact.storage_path.exists() {
            return Err(EvaluationError::ArtifactMissing(artifact.storage_path.clone()));
        }
        self.adapter
            .load(&artifact.storage_path)
            .map_err(EvaluationError::ModelLoad)
    }

    /// Share of samples whose deterministic caption matches the expected one
    fn accuracy(model: &dyn ModelAdapter, dataset: &EvalDataset) -> Result<f64, EvaluationError> {
        let mut correct = 0usize;
        for sample in &dataset.samples {
            let caption = model
                .infer(&sample.image, false)
                .map_err(EvaluationError::Inference)?;
            if normalize(&caption) == normalize(&sample.expected_caption) {
                correct += 1;
            }
        }
        Ok(correct as f64 / dataset.len() as f64)
    }

    /// Evaluate both artifacts on the same dataset
    pub fn compare(
        &self,
        production: &ModelArtifact,
        candidate: &ModelArtifact,
        eval_dataset: &EvalDataset,
    ) -> Result<ComparisonReport, EvaluationError> {
        if eval_dataset.is_empty() {
            return Err(EvaluationError::EmptyDataset);
        }

        let production_model = self.load(production)?;
        let candidate_model = self.load(candidate)?;

        let accuracy_production = Self::accuracy(production_model.as_ref(), eval_dataset)?;
        let accuracy_candidate = Self::accuracy(candidate_model.as_ref(), eval_dataset)?;

        let reproducible = eval_dataset.is_reproducible();
        if !reproducible {
            warn!(
                "Evaluation dataset was drawn without a seed; comparing {} and {} again \
                 will use different samples",
                production.id, candidate.id
            );
        }

        let recommendation = if accuracy_candidate > accuracy_production + self.promotion_margin {
            DecisionOutcome::Promote
        } else {
            DecisionOutcome::Reject
        };

        info!(
            "Compared production {} ({:.3}) with candidate {} ({:.3}) on {} samples: \
             recommend {:?}",
            production.id,
            accuracy_production,
            candidate.id,
            accuracy_candidate,
            eval_dataset.len(),
            recommendation
        );

        Ok(ComparisonReport {
            production_id: production.id.clone(),
            candidate_id: candidate.id.clone(),
            accuracy_production,
            accuracy_candidate,
            evaluated_samples: eval_dataset.len(),
            reproducible,
            recommendation,
        })
    }
}
