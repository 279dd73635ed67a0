use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use suiup_init_core::error::PlacementError;
use suiup_init_core::{Os, Platform};

pub const INSTALL_DIR_ENV_VAR: &str = "SUIUP_INSTALL_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallDirSource {
    Override,
    UserLocalBin,
    SystemWide,
    UserFallback,
}

impl InstallDirSource {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Override => "requested install directory",
            Self::UserLocalBin => "per-user bin directory",
            Self::SystemWide => "system-wide bin directory",
            Self::UserFallback => "fallback per-user bin directory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub directory: PathBuf,
    pub final_path: PathBuf,
    pub source: InstallDirSource,
}

impl InstallTarget {
    pub fn new(directory: PathBuf, binary_name: &str, source: InstallDirSource) -> Self {
        Self {
            final_path: directory.join(binary_name),
            directory,
            source,
        }
    }

    /// Creates the install directory if needed.
    pub fn ensure_directory(&self) -> Result<()> {
        fs::create_dir_all(&self.directory).map_err(|err| PlacementError {
            target: self.directory.clone(),
            reason: format!("cannot create install directory: {err}"),
        })?;
        Ok(())
    }
}

/// Inputs of the install-directory choice, gathered from the host by
/// [`InstallDirPolicy::from_host`] or supplied directly in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDirPolicy {
    pub os: Os,
    pub override_dir: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub local_data: Option<PathBuf>,
    pub system_dirs: Vec<PathBuf>,
}

impl InstallDirPolicy {
    pub fn from_host(platform: Platform, override_dir: Option<PathBuf>) -> Self {
        let system_dirs = match platform.os {
            Os::Windows => Vec::new(),
            _ => vec![PathBuf::from("/usr/local/bin")],
        };
        Self {
            os: platform.os,
            override_dir,
            home: dirs::home_dir(),
            local_data: dirs::data_local_dir(),
            system_dirs,
        }
    }

    /// Picks the install directory. First match wins:
    /// the override; `~/.local/bin` if it exists or can be created; a
    /// writable system directory; `~/bin` (Unix) or
    /// `%LOCALAPPDATA%\suiup\bin` (Windows).
    ///
    /// Only the `~/.local/bin` probe touches the filesystem; the fallback is
    /// created later by [`InstallTarget::ensure_directory`].
    pub fn resolve(&self) -> Result<(PathBuf, InstallDirSource)> {
        if let Some(dir) = self
            .override_dir
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            return Ok((dir.clone(), InstallDirSource::Override));
        }

        if let Some(home) = &self.home {
            let local_bin = home.join(".local").join("bin");
            if local_bin.is_dir() || fs::create_dir_all(&local_bin).is_ok() {
                return Ok((local_bin, InstallDirSource::UserLocalBin));
            }
            tracing::debug!(path = %local_bin.display(), "per-user bin directory unusable");
        }

        if let Some(dir) = self
            .system_dirs
            .iter()
            .find(|dir| dir.is_dir() && is_writable(dir))
        {
            return Ok((dir.clone(), InstallDirSource::SystemWide));
        }

        let fallback = match self.os {
            Os::Windows => self
                .local_data
                .as_ref()
                .map(|dir| dir.join("suiup").join("bin")),
            _ => self.home.as_ref().map(|home| home.join("bin")),
        };
        fallback
            .map(|dir| (dir, InstallDirSource::UserFallback))
            .ok_or_else(|| {
                PlacementError {
                    target: PathBuf::from("~"),
                    reason: format!(
                        "could not determine a home directory; set {INSTALL_DIR_ENV_VAR} or pass --install-dir"
                    ),
                }
                .into()
            })
    }
}

/// Checks write access by creating and dropping a probe file.
pub fn is_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".suiup-init-probe")
        .tempfile_in(dir)
        .is_ok()
}

pub fn resolve_install_target(policy: &InstallDirPolicy, binary_name: &str) -> Result<InstallTarget> {
    let (directory, source) = policy
        .resolve()
        .context("failed to choose an install directory")?;
    tracing::debug!(dir = %directory.display(), source = source.describe(), "install directory");
    Ok(InstallTarget::new(directory, binary_name, source))
}
