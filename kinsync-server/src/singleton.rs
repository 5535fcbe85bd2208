//! One kinsync-server per data directory.
//!
//! Two servers sharing a data directory would run two sweeps over the same
//! sources. Servers pointed at different directories don't conflict.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "server.lock";

/// Released when dropped
pub struct ServerLock {
    _file: File,
    path: PathBuf,
}

impl ServerLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lock `data_dir` for this process, or fail naming the lock file if another
/// server already holds it.
pub fn lock_data_dir(data_dir: &Path) -> Result<ServerLock> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let path = data_dir.join(LOCK_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        anyhow::bail!(
            "kinsync-server is already running for {}.\n\
            Stop it first, or point this one at another data_dir.",
            data_dir.display()
        );
    }

    Ok(ServerLock { _file: file, path })
}
