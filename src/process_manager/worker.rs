// Worker process management
// Spawns the retraining worker, captures its output and enforces the timeout

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// How long to keep draining pipes after the worker has been killed
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Structured line a worker may print on stdout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Progress {
        percent: u8,
        stage: String,
    },
    Result {
        data: serde_json::Value,
    },
    Error {
        message: String,
    },
    Log {
        level: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to capture worker {0}")]
    Pipe(&'static str),
    #[error("failed to wait for worker: {0}")]
    Wait(#[source] std::io::Error),
}

pub fn get_python_path() -> String {
    #[cfg(target_os = "windows")]
    let paths = ["python", "python3", "py"];

    #[cfg(not(target_os = "windows"))]
    let paths = ["python3", "python"];

    for path in paths {
        let mut cmd = std::process::Command::new(path);
        cmd.arg("--version");

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        if cmd.output().is_ok() {
            return path.to_string();
        }
    }

    "python".to_string()
}

/// Program, arguments and environment of the isolated worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// `python <script>`, using `python` or the first interpreter found on PATH
    pub fn python_script(script: &Path, python: Option<String>) -> Self {
        let program = python.unwrap_or_else(get_python_path);
        Self::new(program).arg(script.to_string_lossy())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkerOutput {
    /// `None` when the worker was killed or ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timed_out: bool,
}

impl WorkerOutput {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0) && self.error.is_none()
    }
}

#[derive(Default)]
struct StdoutCapture {
    text: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

async fn read_stdout<R>(stdout: R, progress: Option<mpsc::Sender<WorkerMessage>>) -> StdoutCapture
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut capture = StdoutCapture::default();
    let mut buf = Vec::new();

    // Keep draining until EOF; a closed pipe would kill the worker with SIGPIPE
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read worker stdout: {}", e);
                break;
            }
        }

        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches(|c: char| c == '\n' || c == '\r');
        capture.text.push_str(line);
        capture.text.push('\n');

        let Ok(message) = serde_json::from_str::<WorkerMessage>(line) else {
            debug!("[worker] {}", line);
            continue;
        };

        match &message {
            WorkerMessage::Progress { .. } => {
                if let Some(ref tx) = progress {
                    let _ = tx.send(message.clone()).await;
                }
            }
            WorkerMessage::Result { data } => {
                capture.result = Some(data.clone());
            }
            WorkerMessage::Error { message } => {
                capture.error = Some(message.clone());
            }
            WorkerMessage::Log { level, message } => {
                info!("[worker {}] {}", level, message);
            }
        }
    }

    capture
}

async fn read_to_end<R>(mut pipe: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let _ = pipe.read_to_end(&mut bytes).await;
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn drain<T: Default>(task: JoinHandle<T>, grace: Option<Duration>) -> T {
    match grace {
        Some(grace) => match tokio::time::timeout(grace, task).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => {
                warn!("Worker pipes still open {:?} after kill, dropping remaining output", grace);
                T::default()
            }
        },
        None => task.await.unwrap_or_default(),
    }
}

/// Run `command` to completion, writing `input` as JSON to its stdin.
/// A worker still running after `timeout` is killed and reported with `timed_out`.
pub async fn run_worker(
    command: &WorkerCommand,
    input: &serde_json::Value,
    timeout: Duration,
    progress: Option<mpsc::Sender<WorkerMessage>>,
) -> Result<WorkerOutput, WorkerError> {
    info!("Spawning worker: {} {:?}", command.program, command.args);

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let mut child = cmd.spawn().map_err(|source| WorkerError::Spawn {
        program: command.program.clone(),
        source,
    })?;

    let stdout = child.stdout.take().ok_or(WorkerError::Pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(WorkerError::Pipe("stderr"))?;
    let stdout_task = tokio::spawn(read_stdout(stdout, progress));
    let stderr_task = tokio::spawn(read_to_end(stderr));

    if let Some(mut stdin) = child.stdin.take() {
        let payload = input.to_string();
        // Workers that ignore stdin may exit before reading it
        if let Err(e) = stdin.write_all(payload.as_bytes()).await {
            debug!("Worker did not accept input on stdin: {}", e);
        }
        let _ = stdin.shutdown().await;
    }

    let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => (status.map_err(WorkerError::Wait)?.code(), false),
        Err(_) => {
            warn!("Worker exceeded {:?}, killing it", timeout);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill worker: {}", e);
            }
            (None, true)
        }
    };

    let grace = timed_out.then_some(PIPE_DRAIN_GRACE);
    let captured = drain(stdout_task, grace).await;
    let stderr = drain(stderr_task, grace).await;

    info!("Worker exited with code: {:?}", exit_code);

    Ok(WorkerOutput {
        exit_code,
        stdout: captured.text,
        stderr,
        result: captured.result,
        error: captured.error,
        timed_out,
    })
}
