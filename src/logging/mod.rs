//! Logging utilities for Captionist
//! Log output goes through the `log` facade; the host installs the logger.
//! This module only enforces the 7-day retention on `<root>/logs`.

use log::info;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

const LOG_RETENTION_DAYS: u64 = 7;

/// Remove `.log` files older than the retention window, returning how many were removed
pub fn cleanup_old_logs(logs_dir: &Path) -> usize {
    let retention = Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    cleanup_logs_older_than(logs_dir, retention, SystemTime::now())
}

fn cleanup_logs_older_than(logs_dir: &Path, retention: Duration, now: SystemTime) -> usize {
    let Ok(entries) = fs::read_dir(logs_dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "log") {
            continue;
        }
        let age = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if matches!(age, Some(age) if age > retention) && fs::remove_file(&path).is_ok() {
            info!("Cleaned up old log: {:?}", path.file_name());
            removed += 1;
        }
    }
    removed
}
