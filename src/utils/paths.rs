use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::StorageError;

static DEFAULT_ROOT: OnceLock<PathBuf> = OnceLock::new();

pub fn get_default_root() -> PathBuf {
    DEFAULT_ROOT
        .get_or_init(|| {
            let base_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."));
            base_dir.join("Captionist")
        })
        .clone()
}

/// Every on-disk location, derived from one root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new(get_default_root())
    }
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn production_dir(&self) -> PathBuf {
        self.models_dir().join("production")
    }

    pub fn candidates_dir(&self) -> PathBuf {
        self.models_dir().join("candidates")
    }

    pub fn candidate_artifact_path(&self, job_id: &str) -> PathBuf {
        self.candidates_dir().join(format!("{}.model", job_id))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn workers_dir(&self) -> PathBuf {
        self.root.join("workers")
    }

    pub fn settings_json_path(&self) -> PathBuf {
        self.data_dir().join("settings.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir().join("user_feedback.csv")
    }

    pub fn registry_json_path(&self) -> PathBuf {
        self.data_dir().join("model_registry.json")
    }

    pub fn retraining_jobs_json_path(&self) -> PathBuf {
        self.data_dir().join("retraining_jobs.json")
    }

    pub fn initialize_directories(&self) -> Result<(), StorageError> {
        let directories = [
            self.data_dir(),
            self.production_dir(),
            self.candidates_dir(),
            self.logs_dir(),
            self.workers_dir(),
        ];

        for dir in &directories {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                    path: dir.clone(),
                    source,
                })?;
                debug!("Created directory: {:?}", dir);
            }
        }

        debug!("Data directories initialized at: {:?}", self.root);
        Ok(())
    }
}
