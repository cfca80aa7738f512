pub mod worker;

pub use worker::{
    get_python_path, run_worker, WorkerCommand, WorkerError, WorkerMessage, WorkerOutput,
};
