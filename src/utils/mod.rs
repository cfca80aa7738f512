pub mod paths;

pub use paths::{get_default_root, DataPaths};
