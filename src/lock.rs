//! Single-instance guard per install target.
//!
//! Two concurrent installs share the source checkout, so a second run
//! against the same target must fail fast instead of racing the first.
//! The guard is an advisory file lock under `<root>/locks/`; it releases
//! on drop and on process death.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use anyhow::Context;
use fs2::FileExt;

use crate::errors::InstallError;

/// Held exclusive lock for one install target.
#[derive(Debug)]
pub struct TargetLock {
    file: File,
}

impl TargetLock {
    /// Try to take the lock for `target`, failing fast when another run
    /// holds it.
    pub fn acquire(locks_dir: &Path, target: &str) -> Result<TargetLock, InstallError> {
        fs::create_dir_all(locks_dir)
            .with_context(|| format!("Failed to create lock directory {}", locks_dir.display()))?;
        let path = locks_dir.join(format!("{target}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;
        file.try_lock_exclusive()
            .map_err(|_| InstallError::InstallBusy {
                target: target.to_string(),
            })?;
        Ok(TargetLock { file })
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
