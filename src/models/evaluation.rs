// Evaluation data models
use super::{DecisionOutcome, ImageReference, PromotionDecision};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalSample {
    pub image: ImageReference,
    pub expected_caption: String,
}

/// Where an evaluation set came from, which decides whether a comparison can be repeated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "seed", rename_all = "snake_case")]
pub enum DatasetProvenance {
    Fixed,
    Seeded(u64),
    Unseeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalDataset {
    pub samples: Vec<EvalSample>,
    pub provenance: DatasetProvenance,
}

impl EvalDataset {
    pub fn fixed(samples: Vec<EvalSample>) -> Self {
        Self {
            samples,
            provenance: DatasetProvenance::Fixed,
        }
    }

    /// Draw up to `n` samples from `pool`. Without a seed the draw differs on every call.
    pub fn sampled(pool: &[EvalSample], n: usize, seed: Option<u64>) -> Self {
        let (samples, provenance) = match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                (
                    pool.choose_multiple(&mut rng, n).cloned().collect(),
                    DatasetProvenance::Seeded(seed),
                )
            }
            None => {
                let mut rng = rand::thread_rng();
                (
                    pool.choose_multiple(&mut rng, n).cloned().collect(),
                    DatasetProvenance::Unseeded,
                )
            }
        };
        Self { samples, provenance }
    }

    pub fn is_reproducible(&self) -> bool {
        self.provenance != DatasetProvenance::Unseeded
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Advisory comparison output. Nothing here touches the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonReport {
    pub production_id: String,
    pub candidate_id: String,
    pub accuracy_production: f64,
    pub accuracy_candidate: f64,
    pub evaluated_samples: usize,
    pub reproducible: bool,
    pub recommendation: DecisionOutcome,
}

impl ComparisonReport {
    pub fn scores(&self) -> (f64, f64) {
        (self.accuracy_production, self.accuracy_candidate)
    }

    /// Turn the operator's verdict into a decision the registry can apply
    pub fn decide(&self, outcome: DecisionOutcome) -> PromotionDecision {
        PromotionDecision {
            candidate_id: self.candidate_id.clone(),
            production_id_at_time: self.production_id.clone(),
            accuracy_current: self.accuracy_production,
            accuracy_candidate: self.accuracy_candidate,
            outcome,
            decided_at: chrono::Utc::now(),
        }
    }
}
