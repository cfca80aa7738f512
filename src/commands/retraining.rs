// Retraining job command handlers
use crate::error::RetrainingError;
use crate::models::RetrainingJob;
use crate::CaptionLoop;

pub fn trigger_retraining(app: &CaptionLoop) -> Result<RetrainingJob, String> {
    app.orchestrator().trigger_retraining().map_err(|e| e.to_string())
}

pub fn list_retraining_jobs(app: &CaptionLoop) -> Result<Vec<RetrainingJob>, String> {
    Ok(app.orchestrator().list_jobs())
}

pub fn get_retraining_job(app: &CaptionLoop, job_id: String) -> Result<RetrainingJob, String> {
    app.orchestrator()
        .get_job(&job_id)
        .ok_or_else(|| RetrainingError::UnknownJob(job_id).to_string())
}

pub async fn wait_for_retraining_job(
    app: &CaptionLoop,
    job_id: String,
) -> Result<RetrainingJob, String> {
    app.orchestrator().wait(&job_id).await.map_err(|e| e.to_string())
}
