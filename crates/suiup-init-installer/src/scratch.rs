use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use suiup_init_core::InstallError;

/// Paths that must be removed if the process is interrupted.
///
/// Shared between the install flow and the Ctrl-C handler; a normal return
/// never needs it because [`ScratchDir`] cleans up on drop.
#[derive(Debug, Clone, Default)]
pub struct CleanupRegistry {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: &Path) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
    }

    pub fn unregister(&self, path: &Path) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|registered| registered != path);
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes every registered directory. Errors are ignored.
    pub fn cleanup(&self) {
        let paths = std::mem::take(&mut *self.paths.lock().unwrap_or_else(PoisonError::into_inner));
        for path in paths {
            if path.is_dir() {
                let _ = fs::remove_dir_all(&path);
            } else {
                let _ = fs::remove_file(&path);
            }
        }
    }
}

/// Installs a Ctrl-C / SIGTERM handler that empties `registry` and exits
/// with status 1.
pub fn install_interrupt_handler(registry: CleanupRegistry) -> Result<()> {
    ctrlc::set_handler(move || {
        let err = InstallError::Interrupted;
        eprintln!("\n{err}, removing temporary files");
        registry.cleanup();
        for line in err.remediation() {
            eprintln!("  - {line}");
        }
        std::process::exit(1);
    })
    .context("failed to install interrupt handler")
}

/// Per-run scratch directory, removed when dropped.
pub struct ScratchDir {
    dir: tempfile::TempDir,
    registry: CleanupRegistry,
}

impl ScratchDir {
    pub fn create(registry: &CleanupRegistry) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("suiup-init-")
            .tempdir()
            .context("failed to create scratch directory")?;
        registry.register(dir.path());
        tracing::debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Self {
            dir,
            registry: registry.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.registry.unregister(self.dir.path());
    }
}
