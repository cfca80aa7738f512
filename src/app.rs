// Application context
// Builds every component from the data directory and one injected model adapter

use crate::captioning::{CaptionDiversityEngine, ModelAdapter};
use crate::error::{InitError, StorageError};
use crate::evaluation::ModelPromotionEvaluator;
use crate::feedback::{FeedbackLedger, FileLedger};
use crate::file_manager::{initialize_json_file, read_json_file_or_default, write_json_file};
use crate::logging::cleanup_old_logs;
use crate::models::{
    CaptionSet, ComparisonReport, ImageReference, ModelArtifact, RetrainingJob, Settings,
};
use crate::process_manager::WorkerCommand;
use crate::registry::ModelRegistry;
use crate::retraining::{JobLauncher, OrchestratorConfig, RetrainingOrchestrator};
use crate::utils::DataPaths;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// File name of the production model shipped in `models/production/`
pub const SEED_MODEL_FILE: &str = "seed.model";

/// Images whose offered captions are remembered for confirmation
const MAX_OFFERED_IMAGES: usize = 256;

/// Last caption set shown per image, evicting the least recently offered image
struct OfferedCaptions {
    capacity: usize,
    sets: HashMap<ImageReference, Vec<String>>,
    order: VecDeque<ImageReference>,
}

impl OfferedCaptions {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sets: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn insert(&mut self, image: &ImageReference, captions: Vec<String>) {
        if self.sets.insert(image.clone(), captions).is_some() {
            self.order.retain(|seen| seen != image);
        }
        self.order.push_back(image.clone());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.sets.remove(&oldest);
            }
        }
    }

    fn get(&self, image: &ImageReference) -> Option<&Vec<String>> {
        self.sets.get(image)
    }

    fn len(&self) -> usize {
        self.sets.len()
    }
}

/// The configured Python worker if its script exists, otherwise training in-process
fn default_launcher(
    paths: &DataPaths,
    settings: &Settings,
    adapter: &Arc<dyn ModelAdapter>,
) -> JobLauncher {
    let script = paths.workers_dir().join(&settings.worker_script);
    if script.is_file() {
        return JobLauncher::Process(WorkerCommand::python_script(
            &script,
            settings.worker_program.clone(),
        ));
    }
    warn!(
        "Worker script {:?} not found; retraining will call the model adapter in-process",
        script
    );
    JobLauncher::InProcess(adapter.clone())
}

pub struct CaptionLoop {
    paths: DataPaths,
    settings: Mutex<Settings>,
    adapter: Arc<dyn ModelAdapter>,
    engine: CaptionDiversityEngine,
    ledger: Arc<dyn FeedbackLedger>,
    registry: Arc<ModelRegistry>,
    orchestrator: RetrainingOrchestrator,
    offered: Mutex<OfferedCaptions>,
    last_report: Mutex<Option<ComparisonReport>>,
}

impl CaptionLoop {
    /// Prepare the data directory and wire the components together.
    /// `launcher` defaults to the Python worker configured in settings, or to
    /// in-process training when that worker script is not installed.
    pub fn initialize(
        paths: DataPaths,
        adapter: Arc<dyn ModelAdapter>,
        launcher: Option<JobLauncher>,
    ) -> Result<Self, InitError> {
        paths.initialize_directories()?;

        let removed = cleanup_old_logs(&paths.logs_dir());
        if removed > 0 {
            info!("Removed {} expired log files", removed);
        }

        initialize_json_file(&paths.settings_json_path(), &Settings::default())?;
        initialize_json_file(&paths.retraining_jobs_json_path(), &Vec::<RetrainingJob>::new())?;
        let settings: Settings = read_json_file_or_default(&paths.settings_json_path())?;

        let seed = paths.production_dir().join(SEED_MODEL_FILE);
        if !seed.exists() {
            warn!(
                "No seed production model at {:?}; comparisons will fail until one is provided",
                seed
            );
        }
        let registry = Arc::new(ModelRegistry::open(
            paths.registry_json_path(),
            ModelArtifact::production(seed),
        )?);

        let ledger: Arc<dyn FeedbackLedger> = Arc::new(FileLedger::new(paths.ledger_path()));

        let launcher =
            launcher.unwrap_or_else(|| default_launcher(&paths, &settings, &adapter));
        let orchestrator = RetrainingOrchestrator::new(
            ledger.clone(),
            registry.clone(),
            launcher,
            OrchestratorConfig {
                paths: paths.clone(),
                timeout: Duration::from_secs(settings.retraining_timeout_secs),
            },
        );

        info!("Caption loop ready at {:?}", paths.root());

        Ok(Self {
            engine: CaptionDiversityEngine::new(adapter.clone()),
            paths,
            settings: Mutex::new(settings),
            adapter,
            ledger,
            registry,
            orchestrator,
            offered: Mutex::new(OfferedCaptions::new(MAX_OFFERED_IMAGES)),
            last_report: Mutex::new(None),
        })
    }

    /// Open the loop in the default data directory with the default launcher
    pub fn open(adapter: Arc<dyn ModelAdapter>) -> Result<Self, InitError> {
        Self::initialize(DataPaths::default(), adapter, None)
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Persist new settings and use them for subsequent operations.
    /// The retraining timeout and worker command are read once at startup.
    pub fn replace_settings(&self, settings: Settings) -> Result<(), StorageError> {
        let mut current = self.settings.lock();
        write_json_file(&self.paths.settings_json_path(), &settings)?;
        *current = settings;
        Ok(())
    }

    pub fn engine(&self) -> &CaptionDiversityEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &dyn FeedbackLedger {
        self.ledger.as_ref()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn orchestrator(&self) -> &RetrainingOrchestrator {
        &self.orchestrator
    }

    pub fn evaluator(&self) -> ModelPromotionEvaluator {
        let margin = self.settings.lock().promotion_margin;
        ModelPromotionEvaluator::new(self.adapter.clone(), margin)
    }

    /// Remember the candidates shown for `image`; only these can be confirmed
    pub(crate) fn offer(&self, image: &ImageReference, set: &CaptionSet) {
        let mut offered = self.offered.lock();
        offered.insert(image, set.captions().to_vec());
        debug!("Remembering offered captions for {} images", offered.len());
    }

    pub(crate) fn offered_for(&self, image: &ImageReference) -> Vec<String> {
        self.offered.lock().get(image).cloned().unwrap_or_default()
    }

    pub(crate) fn remember_report(&self, report: ComparisonReport) {
        *self.last_report.lock() = Some(report);
    }

    pub(crate) fn last_report(&self) -> Option<ComparisonReport> {
        self.last_report.lock().clone()
    }

    pub(crate) fn clear_report(&self, candidate_id: &str) {
        let mut report = self.last_report.lock();
        if report.as_ref().map_or(false, |r| r.candidate_id == candidate_id) {
            *report = None;
        }
    }
}
