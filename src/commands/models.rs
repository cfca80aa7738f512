// Model comparison and promotion command handlers
use crate::error::RegistryError;
use crate::models::{
    ComparisonReport, DecisionOutcome, DecisionRecord, EvalDataset, EvalSample, ModelArtifact,
};
use crate::CaptionLoop;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub production: ModelArtifact,
    pub candidate: Option<ModelArtifact>,
    pub history: Vec<DecisionRecord>,
}

pub fn get_registry_status(app: &CaptionLoop) -> Result<RegistryStatus, String> {
    let registry = app.registry();
    Ok(RegistryStatus {
        production: registry.get_production(),
        candidate: registry.pending_candidate(),
        history: registry.decision_history(),
    })
}

/// Compare production with the pending candidate.
/// An empty `samples` list evaluates against the confirmed feedback instead.
/// With `sample_size`, a subset is drawn using the configured `eval_seed`.
pub fn compare_models(
    app: &CaptionLoop,
    samples: Vec<EvalSample>,
    sample_size: Option<usize>,
) -> Result<ComparisonReport, String> {
    let candidate = app
        .registry()
        .pending_candidate()
        .ok_or_else(|| RegistryError::NoPendingCandidate.to_string())?;
    let production = app.registry().get_production();

    let pool: Vec<EvalSample> = if samples.is_empty() {
        app.ledger()
            .read_all()
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|record| EvalSample {
                image: record.image_reference,
                expected_caption: record.chosen_caption,
            })
            .collect()
    } else {
        samples
    };

    let dataset = match sample_size {
        Some(n) => EvalDataset::sampled(&pool, n, app.settings().eval_seed),
        None => EvalDataset::fixed(pool),
    };

    let report = app
        .evaluator()
        .compare(&production, &candidate, &dataset)
        .map_err(|e| e.to_string())?;
    app.remember_report(report.clone());
    Ok(report)
}

/// Apply the operator's verdict on the most recently compared candidate
pub fn decide_promotion(
    app: &CaptionLoop,
    outcome: DecisionOutcome,
) -> Result<ModelArtifact, String> {
    let report = app
        .last_report()
        .ok_or_else(|| "no comparison has been run for the pending candidate".to_string())?;
    let decision = report.decide(outcome);

    let production = app.registry().apply_decision(&decision).map_err(|e| e.to_string())?;
    app.clear_report(&decision.candidate_id);

    info!(
        "Decision {:?} applied to candidate {}; production is {}",
        outcome, decision.candidate_id, production.id
    );
    Ok(production)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::setup;
    use crate::commands::captions::{confirm_caption, generate_captions, RetrainingOutcome};
    use crate::commands::retraining::wait_for_retraining_job;

    #[test]
    fn test_compare_requires_candidate() {
        let (_dir, app, _image) = setup();
        assert!(compare_models(&app, vec![], None).is_err());
        assert!(decide_promotion(&app, DecisionOutcome::Reject).is_err());
    }

    #[tokio::test]
    async fn test_reject_keeps_production() {
        let (_dir, app, image) = setup();
        generate_captions(&app, image.clone(), None).unwrap();
        let payload = confirm_caption(&app, image, "a brown dog".to_string()).unwrap();
        let RetrainingOutcome::Started { job } = payload.retraining else {
            panic!("retraining did not start");
        };
        wait_for_retraining_job(&app, job.id).await.unwrap();

        let before = app.registry().get_production();
        let report = compare_models(&app, vec![], None).unwrap();
        assert_eq!(report.evaluated_samples, 1);
        assert_eq!(report.scores(), (0.0, 1.0));

        let production = decide_promotion(&app, DecisionOutcome::Reject).unwrap();
        assert_eq!(production.id, before.id);

        let status = get_registry_status(&app).unwrap();
        assert!(status.candidate.is_none());
        assert_eq!(status.history.len(), 1);
        assert_eq!(status.history[0].decision.outcome, DecisionOutcome::Reject);
    }
}
