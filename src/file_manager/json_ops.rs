// Atomic JSON file operations

use crate::error::StorageError;
use log::debug;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

lazy_static::lazy_static! {
    static ref FILE_LOCK: Mutex<()> = Mutex::new(());
}

/// Run `f` while holding the same lock the JSON helpers use.
/// `f` must not call back into the JSON helpers.
pub fn with_file_lock<R>(f: impl FnOnce() -> R) -> R {
    let _lock = FILE_LOCK.lock();
    f()
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let _lock = FILE_LOCK.lock();

    if !path.exists() {
        return Err(StorageError::NotFound(path.to_path_buf()));
    }

    let mut file = File::open(path).map_err(io_error(path))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(io_error(path))?;

    serde_json::from_str(&contents).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes JSON atomically using write-to-temp-then-rename
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), StorageError> {
    let _lock = FILE_LOCK.lock();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let json_string = serde_json::to_string_pretty(data).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = path.with_extension("tmp");

    let mut temp_file = File::create(&temp_path).map_err(io_error(&temp_path))?;
    temp_file
        .write_all(json_string.as_bytes())
        .map_err(io_error(&temp_path))?;
    temp_file.sync_all().map_err(io_error(&temp_path))?;

    fs::rename(&temp_path, path).map_err(io_error(path))?;

    Ok(())
}

pub fn initialize_json_file<T: Serialize>(path: &Path, default: &T) -> Result<(), StorageError> {
    if !path.exists() {
        debug!("Initializing JSON file: {:?}", path);
        write_json_file(path, default)?;
    }
    Ok(())
}

pub fn read_json_file_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, StorageError> {
    if path.exists() {
        read_json_file(path)
    } else {
        Ok(T::default())
    }
}
