// Model registry
// Owns the production pointer and the single pending-candidate slot

use crate::error::RegistryError;
use crate::file_manager::{read_json_file, write_json_file};
use crate::models::{
    ArtifactRole, DecisionOutcome, DecisionRecord, ModelArtifact, PromotionDecision,
};
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryState {
    production: ModelArtifact,
    candidate: Option<ModelArtifact>,
    #[serde(default)]
    history: Vec<DecisionRecord>,
}

pub struct ModelRegistry {
    path: PathBuf,
    state: Mutex<RegistryState>,
}

impl ModelRegistry {
    /// Restore the registry persisted at `path`, or start one whose production
    /// artifact is `initial_production`
    pub fn open(
        path: impl Into<PathBuf>,
        initial_production: ModelArtifact,
    ) -> Result<Self, RegistryError> {
        let path = path.into();

        let state = if path.exists() {
            let mut state: RegistryState = read_json_file(&path)?;
            state.production.role = ArtifactRole::Production;
            state
        } else {
            let mut production = initial_production;
            production.role = ArtifactRole::Production;
            let state = RegistryState {
                production,
                candidate: None,
                history: Vec::new(),
            };
            write_json_file(&path, &state)?;
            info!("Initialized model registry at {:?}", path);
            state
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_production(&self) -> ModelArtifact {
        self.state.lock().production.clone()
    }

    pub fn pending_candidate(&self) -> Option<ModelArtifact> {
        self.state.lock().candidate.clone()
    }

    pub fn decision_history(&self) -> Vec<DecisionRecord> {
        self.state.lock().history.clone()
    }

    pub fn register_candidate(&self, mut artifact: ModelArtifact) -> Result<(), RegistryError> {
        let mut state = self.state.lock();

        if let Some(pending) = &state.candidate {
            return Err(RegistryError::CandidatePending(pending.id.clone()));
        }
        if artifact.storage_path == state.production.storage_path {
            return Err(RegistryError::PathCollision(artifact.storage_path));
        }

        artifact.role = ArtifactRole::Candidate;
        info!("Registering candidate {} at {:?}", artifact.id, artifact.storage_path);

        let mut next = state.clone();
        next.candidate = Some(artifact);
        write_json_file(&self.path, &next)?;
        *state = next;
        Ok(())
    }

    /// Apply an operator decision to the pending candidate. Returns the production
    /// artifact afterwards. A decision can be applied once; repeating it fails
    /// with `NoPendingCandidate`.
    pub fn apply_decision(
        &self,
        decision: &PromotionDecision,
    ) -> Result<ModelArtifact, RegistryError> {
        let mut state = self.state.lock();

        let candidate = state.candidate.clone().ok_or(RegistryError::NoPendingCandidate)?;
        if decision.candidate_id != candidate.id {
            return Err(RegistryError::StaleDecision(format!(
                "decision is for candidate {}, pending candidate is {}",
                decision.candidate_id, candidate.id
            )));
        }
        if decision.production_id_at_time != state.production.id {
            return Err(RegistryError::StaleDecision(format!(
                "decision was made against production {}, current production is {}",
                decision.production_id_at_time, state.production.id
            )));
        }

        let mut next = state.clone();
        next.candidate = None;
        if decision.outcome == DecisionOutcome::Promote {
            let mut promoted = candidate;
            promoted.role = ArtifactRole::Production;
            promoted.accuracy_score = Some(decision.accuracy_candidate);
            next.production = promoted;
        }
        next.history.push(DecisionRecord {
            decision: decision.clone(),
            applied_at: chrono::Utc::now(),
            production_after: next.production.id.clone(),
        });

        write_json_file(&self.path, &next)?;
        *state = next;

        info!(
            "Applied {:?} for candidate {}; production is {}",
            decision.outcome, decision.candidate_id, state.production.id
        );
        Ok(state.production.clone())
    }
}
