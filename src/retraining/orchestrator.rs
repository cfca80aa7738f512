// Retraining orchestrator
// Owns the retraining job lifecycle: Queued -> Running -> Succeeded | Failed

use super::TrainingDataset;
use crate::captioning::ModelAdapter;
use crate::error::RetrainingError;
use crate::feedback::FeedbackLedger;
use crate::file_manager::{read_json_file_or_default, write_json_file};
use crate::models::{JobFailure, JobStatus, ModelArtifact, RetrainingJob};
use crate::process_manager::{run_worker, WorkerCommand, WorkerMessage};
use crate::registry::ModelRegistry;
use crate::utils::DataPaths;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

const PROGRESS_WRITE_DEBOUNCE_MS: u64 = 500;

pub const LEDGER_PATH_ENV: &str = "CAPTIONIST_LEDGER_PATH";
pub const OUTPUT_PATH_ENV: &str = "CAPTIONIST_OUTPUT_PATH";

/// The isolated context a retraining job runs in
#[derive(Clone)]
pub enum JobLauncher {
    /// External worker process; reads the ledger file and writes the artifact itself
    Process(WorkerCommand),
    /// Blocking task calling `ModelAdapter::fit`
    InProcess(Arc<dyn ModelAdapter>),
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub paths: DataPaths,
    pub timeout: Duration,
}

struct JobSlot {
    id: String,
    tx: watch::Sender<RetrainingJob>,
}

/// What a finished run left behind, before it is folded into the job record
#[derive(Default)]
struct JobRun {
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    result: Option<serde_json::Value>,
    failure: Option<JobFailure>,
}

impl JobRun {
    fn failed(failure: JobFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }
}

struct Inner {
    ledger: Arc<dyn FeedbackLedger>,
    registry: Arc<ModelRegistry>,
    launcher: JobLauncher,
    config: OrchestratorConfig,
    jobs: Mutex<Vec<JobSlot>>,
    active: Mutex<Option<String>>,
}

#[derive(Clone)]
pub struct RetrainingOrchestrator {
    inner: Arc<Inner>,
}

impl RetrainingOrchestrator {
    /// Loads job history from disk. Jobs left Queued or Running by a previous
    /// process can no longer be observed and are marked Failed.
    pub fn new(
        ledger: Arc<dyn FeedbackLedger>,
        registry: Arc<ModelRegistry>,
        launcher: JobLauncher,
        config: OrchestratorConfig,
    ) -> Self {
        let history_path = config.paths.retraining_jobs_json_path();
        let history: Vec<RetrainingJob> = match read_json_file_or_default(&history_path) {
            Ok(history) => history,
            Err(e) => {
                warn!("Ignoring unreadable retraining history {:?}: {}", history_path, e);
                Vec::new()
            }
        };

        let jobs = history
            .into_iter()
            .map(|mut job| {
                if !job.status.is_terminal() {
                    job.fail(JobFailure::Internal {
                        message: "interrupted by restart".to_string(),
                    });
                }
                let (tx, _rx) = watch::channel(job.clone());
                JobSlot { id: job.id, tx }
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                ledger,
                registry,
                launcher,
                config,
                jobs: Mutex::new(jobs),
                active: Mutex::new(None),
            }),
        }
    }

    /// Start a retraining job and return it while still Queued.
    /// Fails fast if a job is in flight, a candidate awaits a decision, or
    /// the ledger is empty; none of these checks change any state.
    pub fn trigger_retraining(&self) -> Result<RetrainingJob, RetrainingError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| RetrainingError::NoRuntime)?;

        let job = {
            let mut active = self.inner.active.lock();
            if let Some(job_id) = active.as_ref() {
                return Err(RetrainingError::AlreadyPending(format!(
                    "job {} is still in flight",
                    job_id
                )));
            }
            if let Some(candidate) = self.inner.registry.pending_candidate() {
                return Err(RetrainingError::AlreadyPending(format!(
                    "candidate {} awaits a promotion decision",
                    candidate.id
                )));
            }

            let records = self.inner.ledger.read_all()?;
            if records.is_empty() {
                return Err(RetrainingError::EmptyLedger);
            }

            let job = RetrainingJob::new(uuid::Uuid::new_v4().to_string(), records.len());
            let (tx, _rx) = watch::channel(job.clone());
            self.inner.jobs.lock().push(JobSlot { id: job.id.clone(), tx });
            *active = Some(job.id.clone());
            job
        };

        self.persist();
        info!("Queued retraining job {} over {} records", job.id, job.training_records);

        let this = self.clone();
        let job_id = job.id.clone();
        runtime.spawn(async move { this.run_job(job_id).await });

        Ok(job)
    }

    pub fn get_job(&self, job_id: &str) -> Option<RetrainingJob> {
        self.inner
            .jobs
            .lock()
            .iter()
            .find(|slot| slot.id == job_id)
            .map(|slot| slot.tx.borrow().clone())
    }

    pub fn list_jobs(&self) -> Vec<RetrainingJob> {
        self.inner
            .jobs
            .lock()
            .iter()
            .map(|slot| slot.tx.borrow().clone())
            .collect()
    }

    /// Id of the job currently Queued or Running
    pub fn active_job(&self) -> Option<String> {
        self.inner.active.lock().clone()
    }

    /// Resolves once the job reaches Succeeded or Failed
    pub async fn wait(&self, job_id: &str) -> Result<RetrainingJob, RetrainingError> {
        let mut rx = self
            .inner
            .jobs
            .lock()
            .iter()
            .find(|slot| slot.id == job_id)
            .map(|slot| slot.tx.subscribe())
            .ok_or_else(|| RetrainingError::UnknownJob(job_id.to_string()))?;

        let job = rx
            .wait_for(|job| job.status.is_terminal())
            .await
            .map_err(|_| RetrainingError::UnknownJob(job_id.to_string()))?
            .clone();
        Ok(job)
    }

    /// Apply `f` to the job and publish the new snapshot
    fn update(&self, job_id: &str, f: impl FnOnce(&mut RetrainingJob)) {
        let jobs = self.inner.jobs.lock();
        if let Some(slot) = jobs.iter().find(|slot| slot.id == job_id) {
            slot.tx.send_modify(f);
        }
    }

    fn persist(&self) {
        let snapshot = self.list_jobs();
        let path = self.inner.config.paths.retraining_jobs_json_path();
        if let Err(e) = write_json_file(&path, &snapshot) {
            error!("Failed to persist retraining jobs: {}", e);
        }
    }

    async fn run_job(&self, job_id: String) {
        self.update(&job_id, |job| {
            job.transition(JobStatus::Running);
            job.stage = Some("training".to_string());
        });
        self.persist();

        let output_path = self.inner.config.paths.candidate_artifact_path(&job_id);
        let run = if output_path == self.inner.registry.get_production().storage_path {
            JobRun::failed(JobFailure::Internal {
                message: format!("output path {:?} is the production artifact", output_path),
            })
        } else if let Some(parent) = output_path.parent().filter(|p| !p.exists()) {
            match fs::create_dir_all(parent) {
                Ok(()) => self.launch(&job_id, &output_path).await,
                Err(e) => JobRun::failed(JobFailure::Internal {
                    message: format!("failed to create {:?}: {}", parent, e),
                }),
            }
        } else {
            self.launch(&job_id, &output_path).await
        };

        self.finish(&job_id, output_path, run);
    }

    async fn launch(&self, job_id: &str, output_path: &Path) -> JobRun {
        match &self.inner.launcher {
            JobLauncher::Process(command) => self.run_process(command, job_id, output_path).await,
            JobLauncher::InProcess(adapter) => {
                self.run_in_process(adapter.clone(), output_path.to_path_buf())
                    .await
            }
        }
    }

    async fn run_process(&self, base: &WorkerCommand, job_id: &str, output_path: &Path) -> JobRun {
        let Some(ledger_path) = self.inner.ledger.location().map(Path::to_path_buf) else {
            return JobRun::failed(JobFailure::Internal {
                message: "ledger is not file backed; a worker process cannot read it".to_string(),
            });
        };

        let command = base
            .clone()
            .env(LEDGER_PATH_ENV, ledger_path.to_string_lossy())
            .env(OUTPUT_PATH_ENV, output_path.to_string_lossy());
        let input = serde_json::json!({
            "job_id": job_id,
            "ledger_path": ledger_path,
            "output_path": output_path,
        });

        let (tx, mut rx) = mpsc::channel::<WorkerMessage>(100);
        let progress_self = self.clone();
        let progress_job_id = job_id.to_string();
        let progress_task = tokio::spawn(async move {
            let debounce = Duration::from_millis(PROGRESS_WRITE_DEBOUNCE_MS);
            let mut last_write = Instant::now() - debounce;

            while let Some(message) = rx.recv().await {
                if let WorkerMessage::Progress { percent, stage } = message {
                    progress_self.update(&progress_job_id, |job| {
                        job.progress = percent.min(100);
                        job.stage = Some(stage);
                    });
                    // Only write to disk if 500ms elapsed OR the worker reports 100%
                    if percent >= 100 || last_write.elapsed() >= debounce {
                        progress_self.persist();
                        last_write = Instant::now();
                    }
                }
            }
        });

        let result = run_worker(&command, &input, self.inner.config.timeout, Some(tx)).await;
        let _ = progress_task.await;

        match result {
            Err(e) => JobRun::failed(JobFailure::Spawn { message: e.to_string() }),
            Ok(output) => {
                let failure = if output.timed_out {
                    Some(JobFailure::Timeout {
                        seconds: self.inner.config.timeout.as_secs(),
                    })
                } else if !output.succeeded() {
                    Some(JobFailure::ExitCode {
                        code: output.exit_code,
                        message: output.error.clone(),
                    })
                } else {
                    None
                };
                JobRun {
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    result: output.result,
                    failure,
                }
            }
        }
    }

    async fn run_in_process(&self, adapter: Arc<dyn ModelAdapter>, output_path: PathBuf) -> JobRun {
        let ledger = self.inner.ledger.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<(usize, usize), String> {
            let records = ledger.read_all().map_err(|e| e.to_string())?;
            let dataset = TrainingDataset::from_records(&records);
            adapter
                .fit(&dataset, &output_path)
                .map_err(|e| e.to_string())?;
            Ok((dataset.len(), dataset.distinct_images()))
        });

        let timeout = self.inner.config.timeout;
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok((examples, images)))) => JobRun {
                exit_code: Some(0),
                stdout: format!("trained on {} examples across {} images\n", examples, images),
                result: Some(serde_json::json!({ "examples": examples, "images": images })),
                ..Default::default()
            },
            Ok(Ok(Err(message))) => JobRun {
                exit_code: Some(1),
                stderr: format!("{}\n", message),
                failure: Some(JobFailure::ExitCode {
                    code: Some(1),
                    message: Some(message),
                }),
                ..Default::default()
            },
            Ok(Err(join_error)) => JobRun::failed(JobFailure::Internal {
                message: format!("training task panicked: {}", join_error),
            }),
            // The blocking thread cannot be stopped; whatever it writes later is never registered
            Err(_) => JobRun::failed(JobFailure::Timeout {
                seconds: timeout.as_secs(),
            }),
        }
    }

    /// Captured output is published before the terminal status, so anyone
    /// woken by `wait` sees the complete record
    fn finish(&self, job_id: &str, output_path: PathBuf, run: JobRun) {
        self.update(job_id, |job| {
            job.exit_code = run.exit_code;
            job.captured_stdout = run.stdout;
            job.captured_stderr = run.stderr;
            job.worker_result = run.result;
        });

        let outcome = match run.failure {
            Some(failure) => Err(failure),
            None if !output_path.is_file() => Err(JobFailure::MissingArtifact {
                path: output_path.to_string_lossy().to_string(),
            }),
            None => {
                let artifact = ModelArtifact::candidate(output_path, Some(job_id.to_string()));
                let artifact_id = artifact.id.clone();
                self.inner
                    .registry
                    .register_candidate(artifact)
                    .map(|()| artifact_id)
                    .map_err(|e| JobFailure::RegistrationRejected { message: e.to_string() })
            }
        };

        {
            let mut active = self.inner.active.lock();
            if active.as_deref() == Some(job_id) {
                *active = None;
            }
        }

        match &outcome {
            Ok(artifact_id) => {
                info!("Retraining job {} produced candidate {}", job_id, artifact_id)
            }
            Err(failure) => warn!("Retraining job {} failed: {}", job_id, failure),
        }

        self.update(job_id, |job| match outcome {
            Ok(artifact_id) => {
                job.succeed(artifact_id);
            }
            Err(failure) => {
                job.fail(failure);
            }
        });
        self.persist();
        debug!("Retraining job {} released the in-flight slot", job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::feedback::FileLedger;
    use crate::models::{FeedbackRecord, ImageReference};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes the number of training examples as the artifact
    struct CountingTrainer {
        fits: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingTrainer {
        fn new() -> Self {
            Self {
                fits: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    impl ModelAdapter for CountingTrainer {
        fn infer(&self, _image: &ImageReference, _noise: bool) -> Result<String, ModelError> {
            Ok("a caption".to_string())
        }

        fn fit(&self, dataset: &TrainingDataset, output_path: &Path) -> Result<(), ModelError> {
            self.fits.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self.fail {
                return Err(ModelError::Training("loss diverged".to_string()));
            }
            fs::write(output_path, dataset.len().to_string())
                .map_err(|e| ModelError::Training(e.to_string()))
        }

        fn load(&self, path: &Path) -> Result<Arc<dyn ModelAdapter>, ModelError> {
            Err(ModelError::Load {
                path: path.to_path_buf(),
                reason: "not needed".to_string(),
            })
        }
    }

    struct Fixture {
        _dir: TempDir,
        paths: DataPaths,
        ledger: Arc<FileLedger>,
        registry: Arc<ModelRegistry>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        paths.initialize_directories().unwrap();
        let ledger = Arc::new(FileLedger::new(paths.ledger_path()));
        let registry = Arc::new(
            ModelRegistry::open(
                paths.registry_json_path(),
                ModelArtifact::production(paths.production_dir().join("seed.model")),
            )
            .unwrap(),
        );
        Fixture {
            _dir: dir,
            paths,
            ledger,
            registry,
        }
    }

    fn orchestrator(
        fx: &Fixture,
        launcher: JobLauncher,
        timeout: Duration,
    ) -> RetrainingOrchestrator {
        RetrainingOrchestrator::new(
            fx.ledger.clone(),
            fx.registry.clone(),
            launcher,
            OrchestratorConfig {
                paths: fx.paths.clone(),
                timeout,
            },
        )
    }

    fn add_feedback(fx: &Fixture, caption: &str) {
        let image = ImageReference::remote("https://example.com/i1.jpg").unwrap();
        fx.ledger.append(&FeedbackRecord::new(image, caption)).unwrap();
    }

    #[tokio::test]
    async fn test_empty_ledger_is_refused() {
        let fx = fixture();
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(Arc::new(CountingTrainer::new())),
            Duration::from_secs(10),
        );
        assert!(matches!(orchestrator.trigger_retraining(), Err(RetrainingError::EmptyLedger)));
        assert!(orchestrator.list_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_in_process_job_registers_candidate() {
        let fx = fixture();
        add_feedback(&fx, "a dog running");
        add_feedback(&fx, "a dog running");
        let trainer = Arc::new(CountingTrainer::new());
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(trainer.clone()),
            Duration::from_secs(10),
        );

        let queued = orchestrator.trigger_retraining().unwrap();
        assert_eq!(queued.status, JobStatus::Queued);
        assert_eq!(queued.training_records, 2);

        let job = orchestrator.wait(&queued.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.exit_code, Some(0));
        assert!(job.started_at.is_some() && job.completed_at.is_some());

        let candidate = fx.registry.pending_candidate().unwrap();
        assert_eq!(Some(candidate.id.clone()), job.artifact_id);
        assert_eq!(candidate.source_job_id.as_deref(), Some(queued.id.as_str()));
        assert_ne!(candidate.storage_path, fx.registry.get_production().storage_path);
        assert_eq!(fs::read_to_string(&candidate.storage_path).unwrap(), "2");
        assert_eq!(trainer.fits.load(Ordering::SeqCst), 1);
        assert!(orchestrator.active_job().is_none());
    }

    #[tokio::test]
    async fn test_pending_candidate_blocks_new_run() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(Arc::new(CountingTrainer::new())),
            Duration::from_secs(10),
        );

        let first = orchestrator.trigger_retraining().unwrap();
        orchestrator.wait(&first.id).await.unwrap();
        let pending = fx.registry.pending_candidate().unwrap();
        let records_before = fx.ledger.read_all().unwrap();

        assert!(matches!(
            orchestrator.trigger_retraining(),
            Err(RetrainingError::AlreadyPending(_))
        ));
        assert_eq!(fx.registry.pending_candidate().unwrap(), pending);
        assert_eq!(fx.ledger.read_all().unwrap(), records_before);
        assert_eq!(orchestrator.list_jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_second_trigger_while_running_fails_fast() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let trainer = Arc::new(CountingTrainer {
            delay: Duration::from_millis(300),
            ..CountingTrainer::new()
        });
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(trainer.clone()),
            Duration::from_secs(10),
        );

        let first = orchestrator.trigger_retraining().unwrap();
        assert!(matches!(
            orchestrator.trigger_retraining(),
            Err(RetrainingError::AlreadyPending(_))
        ));

        orchestrator.wait(&first.id).await.unwrap();
        assert_eq!(trainer.fits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fit_leaves_production_alone() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let production = fx.registry.get_production();
        let trainer = Arc::new(CountingTrainer {
            fail: true,
            ..CountingTrainer::new()
        });
        let orchestrator =
            orchestrator(&fx, JobLauncher::InProcess(trainer), Duration::from_secs(10));

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.captured_stderr.contains("loss diverged"));
        assert!(fx.registry.pending_candidate().is_none());
        assert_eq!(fx.registry.get_production(), production);

        let err = job.outcome().unwrap().unwrap_err();
        assert!(matches!(err.failure, JobFailure::ExitCode { code: Some(1), .. }));

        // The slot is free again after a failure
        assert!(orchestrator.trigger_retraining().is_ok());
    }

    #[tokio::test]
    async fn test_job_history_is_persisted() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(Arc::new(CountingTrainer::new())),
            Duration::from_secs(10),
        );

        let queued = orchestrator.trigger_retraining().unwrap();
        orchestrator.wait(&queued.id).await.unwrap();

        let reloaded = self::orchestrator(
            &fx,
            JobLauncher::InProcess(Arc::new(CountingTrainer::new())),
            Duration::from_secs(10),
        );
        let job = reloaded.get_job(&queued.id).unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let fx = fixture();
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(Arc::new(CountingTrainer::new())),
            Duration::from_secs(10),
        );
        assert!(matches!(
            orchestrator.wait("missing").await,
            Err(RetrainingError::UnknownJob(_))
        ));
    }

    #[test]
    fn test_trigger_outside_runtime() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(Arc::new(CountingTrainer::new())),
            Duration::from_secs(10),
        );
        assert!(matches!(orchestrator.trigger_retraining(), Err(RetrainingError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_in_process_timeout_discards_late_artifact() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let trainer = Arc::new(CountingTrainer {
            delay: Duration::from_millis(500),
            ..CountingTrainer::new()
        });
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(trainer),
            Duration::from_millis(50),
        );

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(matches!(job.failure, Some(JobFailure::Timeout { .. })));

        // Let the abandoned fit finish writing; it must stay unregistered
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(fx.paths.candidate_artifact_path(&queued.id).exists());
        assert!(fx.registry.pending_candidate().is_none());
        assert_eq!(orchestrator.get_job(&queued.id).unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_in_process_result_summarizes_dataset() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        add_feedback(&fx, "a kitten");
        let orchestrator = orchestrator(
            &fx,
            JobLauncher::InProcess(Arc::new(CountingTrainer::new())),
            Duration::from_secs(10),
        );

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();
        assert_eq!(
            job.worker_result,
            Some(serde_json::json!({ "examples": 2, "images": 1 }))
        );
        assert_eq!(job.captured_stdout, "trained on 2 examples across 1 images\n");
    }

    #[cfg(unix)]
    fn sh(script: &str) -> JobLauncher {
        JobLauncher::Process(WorkerCommand::new("sh").arg("-c").arg(script))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_process_writes_candidate() {
        let fx = fixture();
        add_feedback(&fx, "a dog, running");
        let script = concat!(
            "echo '{\"type\":\"progress\",\"percent\":100,\"stage\":\"saving\"}'; ",
            "wc -l < \"$CAPTIONIST_LEDGER_PATH\" > \"$CAPTIONIST_OUTPUT_PATH\"; ",
            "echo done"
        );
        let orchestrator = orchestrator(&fx, sh(script), Duration::from_secs(10));

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();

        assert_eq!(job.status, JobStatus::Succeeded, "stderr: {}", job.captured_stderr);
        assert!(job.captured_stdout.contains("done"));
        let candidate = fx.registry.pending_candidate().unwrap();
        assert_eq!(candidate.storage_path, fx.paths.candidate_artifact_path(&queued.id));
        assert_eq!(fs::read_to_string(&candidate.storage_path).unwrap().trim(), "1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_with_non_utf8_output_still_succeeds() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let script = concat!(
            "printf '\\351\\n'; seq 1 20000; ",
            "echo '{\"type\":\"result\",\"data\":{\"epochs\":3}}'; ",
            "echo trained > \"$CAPTIONIST_OUTPUT_PATH\"; echo finished"
        );
        let orchestrator = orchestrator(&fx, sh(script), Duration::from_secs(10));

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();

        assert_eq!(job.status, JobStatus::Succeeded, "stderr: {}", job.captured_stderr);
        assert!(job.captured_stdout.ends_with("finished\n"));
        assert_eq!(job.worker_result, Some(serde_json::json!({ "epochs": 3 })));
        assert!(fx.registry.pending_candidate().is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_failure_is_captured() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let orchestrator = orchestrator(
            &fx,
            sh("echo 'feedback file unreadable' >&2; exit 2"),
            Duration::from_secs(10),
        );

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.exit_code, Some(2));
        assert_eq!(job.captured_stderr, "feedback file unreadable\n");
        assert!(fx.registry.pending_candidate().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_without_artifact_fails() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let orchestrator = orchestrator(&fx, sh("exit 0"), Duration::from_secs(10));

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();

        assert!(matches!(job.failure, Some(JobFailure::MissingArtifact { .. })));
        assert!(fx.registry.pending_candidate().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_timeout_marks_job_failed() {
        let fx = fixture();
        add_feedback(&fx, "a cat");
        let launcher = JobLauncher::Process(WorkerCommand::new("sleep").arg("30"));
        let orchestrator = orchestrator(&fx, launcher, Duration::from_millis(200));

        let queued = orchestrator.trigger_retraining().unwrap();
        let job = orchestrator.wait(&queued.id).await.unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert!(matches!(job.failure, Some(JobFailure::Timeout { .. })));
        assert!(fx.registry.pending_candidate().is_none());
    }
}
