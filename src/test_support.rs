//! Helpers shared by tests that touch process-wide state.

use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serializes tests that change the working directory, spawn children or
/// inspect open descriptors.
pub(crate) fn process_lock() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Descriptors of this process that currently refer to a pipe.
#[cfg(target_os = "linux")]
pub(crate) fn open_pipe_fds() -> std::collections::HashSet<String> {
    std::fs::read_dir("/proc/self/fd")
        .expect("read /proc/self/fd")
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let target = std::fs::read_link(entry.path()).ok()?;
            let target = target.to_string_lossy().into_owned();
            target
                .starts_with("pipe:")
                .then(|| format!("{}->{}", entry.file_name().to_string_lossy(), target))
        })
        .collect()
}
