// Settings command handlers
use crate::models::Settings;
use crate::CaptionLoop;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsParams {
    pub target_count: Option<usize>,
    pub sampling_budget: Option<u32>,
    pub retrain_on_confirm: Option<bool>,
    pub retraining_timeout_secs: Option<u64>,
    pub worker_script: Option<String>,
    pub worker_program: Option<String>,
    pub promotion_margin: Option<f64>,
    pub eval_seed: Option<u64>,
}

pub fn get_settings(app: &CaptionLoop) -> Result<Settings, String> {
    Ok(app.settings())
}

/// Update settings with partial update support
pub fn update_settings(
    app: &CaptionLoop,
    settings: UpdateSettingsParams,
) -> Result<Settings, String> {
    let mut current_settings = app.settings();

    if let Some(target_count) = settings.target_count {
        if target_count == 0 {
            return Err("target_count must be at least 1".to_string());
        }
        current_settings.target_count = target_count;
    }
    if let Some(sampling_budget) = settings.sampling_budget {
        current_settings.sampling_budget = sampling_budget;
    }
    if let Some(retrain_on_confirm) = settings.retrain_on_confirm {
        current_settings.retrain_on_confirm = retrain_on_confirm;
    }
    if let Some(retraining_timeout_secs) = settings.retraining_timeout_secs {
        if retraining_timeout_secs == 0 {
            return Err("retraining_timeout_secs must be at least 1".to_string());
        }
        current_settings.retraining_timeout_secs = retraining_timeout_secs;
    }
    if let Some(worker_script) = settings.worker_script {
        current_settings.worker_script = worker_script;
    }
    if let Some(worker_program) = settings.worker_program {
        current_settings.worker_program = if worker_program.is_empty() {
            None
        } else {
            Some(worker_program)
        };
    }
    if let Some(promotion_margin) = settings.promotion_margin {
        current_settings.promotion_margin = promotion_margin;
    }
    if let Some(eval_seed) = settings.eval_seed {
        current_settings.eval_seed = Some(eval_seed);
    }

    app.replace_settings(current_settings.clone())
        .map_err(|e| e.to_string())?;

    debug!("Updated settings: {:?}", current_settings);

    Ok(current_settings)
}
