// Settings data models
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_sampling_budget")]
    pub sampling_budget: u32,
    #[serde(default = "default_retrain_on_confirm")]
    pub retrain_on_confirm: bool,
    #[serde(default = "default_retraining_timeout_secs")]
    pub retraining_timeout_secs: u64,
    #[serde(default = "default_worker_script")]
    pub worker_script: String,
    /// Interpreter override; the first python found on PATH is used otherwise
    #[serde(default)]
    pub worker_program: Option<String>,
    #[serde(default)]
    pub promotion_margin: f64,
    #[serde(default)]
    pub eval_seed: Option<u64>,
}

fn default_target_count() -> usize {
    5
}

fn default_sampling_budget() -> u32 {
    20
}

fn default_retrain_on_confirm() -> bool {
    true
}

fn default_retraining_timeout_secs() -> u64 {
    30 * 60
}

fn default_worker_script() -> String {
    String::from("retrain_model.py")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            sampling_budget: default_sampling_budget(),
            retrain_on_confirm: default_retrain_on_confirm(),
            retraining_timeout_secs: default_retraining_timeout_secs(),
            worker_script: default_worker_script(),
            worker_program: None,
            promotion_margin: 0.0,
            eval_seed: None,
        }
    }
}
