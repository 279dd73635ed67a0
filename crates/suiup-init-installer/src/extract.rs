use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use suiup_init_core::error::ExtractionError;
use suiup_init_core::{escape_ps_single_quote, ArchiveKind};

use crate::command::{command_exists, run_command};
use crate::fs_utils::{find_file_named, is_regular_file};

/// One way of unpacking a release archive on this host.
pub trait Unpacker {
    fn name(&self) -> &'static str;
    fn supports(&self, kind: ArchiveKind) -> bool;
    fn is_available(&self) -> bool;
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;
}

pub struct TarCommand;

impl Unpacker for TarCommand {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn supports(&self, kind: ArchiveKind) -> bool {
        kind == ArchiveKind::TarGz
    }

    fn is_available(&self) -> bool {
        command_exists("tar")
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        run_command(
            Command::new("tar")
                .arg("-xzf")
                .arg(archive)
                .arg("-C")
                .arg(dest),
            "failed to extract tar archive",
        )
    }
}

pub struct UnzipCommand;

impl Unpacker for UnzipCommand {
    fn name(&self) -> &'static str {
        "unzip"
    }

    fn supports(&self, kind: ArchiveKind) -> bool {
        kind == ArchiveKind::Zip
    }

    fn is_available(&self) -> bool {
        command_exists("unzip")
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        run_command(
            Command::new("unzip")
                .arg("-q")
                .arg("-o")
                .arg(archive)
                .arg("-d")
                .arg(dest),
            "failed to extract zip archive with unzip",
        )
    }
}

pub struct ExpandArchive;

impl Unpacker for ExpandArchive {
    fn name(&self) -> &'static str {
        "Expand-Archive"
    }

    fn supports(&self, kind: ArchiveKind) -> bool {
        kind == ArchiveKind::Zip
    }

    fn is_available(&self) -> bool {
        cfg!(windows) && command_exists("powershell")
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        let mut command = Command::new("powershell");
        command.arg("-NoProfile").arg("-Command").arg(format!(
            "Expand-Archive -LiteralPath '{}' -DestinationPath '{}' -Force",
            escape_ps_single_quote(archive),
            escape_ps_single_quote(dest)
        ));
        run_command(
            &mut command,
            "failed to extract zip archive with powershell",
        )
    }
}

pub struct BuiltinTarGz;

impl Unpacker for BuiltinTarGz {
    fn name(&self) -> &'static str {
        "builtin-tar"
    }

    fn supports(&self, kind: ArchiveKind) -> bool {
        kind == ArchiveKind::TarGz
    }

    fn is_available(&self) -> bool {
        true
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file = fs::File::open(archive)
            .with_context(|| format!("failed to open {}", archive.display()))?;
        tar::Archive::new(GzDecoder::new(file))
            .unpack(dest)
            .with_context(|| format!("failed to unpack {}", archive.display()))
    }
}

pub struct BuiltinZip;

impl Unpacker for BuiltinZip {
    fn name(&self) -> &'static str {
        "builtin-zip"
    }

    fn supports(&self, kind: ArchiveKind) -> bool {
        kind == ArchiveKind::Zip
    }

    fn is_available(&self) -> bool {
        true
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file = fs::File::open(archive)
            .with_context(|| format!("failed to open {}", archive.display()))?;
        let mut zip = zip::ZipArchive::new(file)
            .with_context(|| format!("failed to read zip archive {}", archive.display()))?;
        zip.extract(dest)
            .with_context(|| format!("failed to unpack {}", archive.display()))
    }
}

pub fn default_unpackers() -> Vec<Box<dyn Unpacker>> {
    vec![
        Box::new(TarCommand),
        Box::new(BuiltinTarGz),
        Box::new(UnzipCommand),
        Box::new(ExpandArchive),
        Box::new(BuiltinZip),
    ]
}

pub struct ArchiveExtractor<'a> {
    unpackers: &'a [Box<dyn Unpacker>],
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(unpackers: &'a [Box<dyn Unpacker>]) -> Self {
        Self { unpackers }
    }

    /// Unpacks `archive` into `dest` and returns the path of `binary_name`
    /// inside it: directly under `dest` when present, otherwise the first
    /// match found in nested directories.
    ///
    /// Available unpackers are tried in rank order; a failing one falls
    /// through to the next.
    pub fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        kind: ArchiveKind,
        binary_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;

        let candidates = self
            .unpackers
            .iter()
            .filter(|unpacker| unpacker.supports(kind))
            .collect::<Vec<_>>();
        let available = candidates
            .iter()
            .filter(|unpacker| unpacker.is_available())
            .collect::<Vec<_>>();
        if available.is_empty() {
            return Err(ExtractionError::NoCapability {
                kind: kind.as_str(),
                tried: candidates
                    .iter()
                    .map(|unpacker| unpacker.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }
            .into());
        }

        let mut last_failure = None;
        for unpacker in available {
            match unpacker.unpack(archive, dest) {
                Ok(()) => {
                    tracing::debug!(unpacker = unpacker.name(), archive = %archive.display(), "extracted");
                    last_failure = None;
                    break;
                }
                Err(err) => {
                    tracing::debug!(unpacker = unpacker.name(), error = %format!("{err:#}"), "unpacker failed");
                    last_failure = Some(ExtractionError::Failed {
                        provider: unpacker.name(),
                        archive: archive.to_path_buf(),
                        reason: format!("{err:#}"),
                    });
                }
            }
        }
        if let Some(failure) = last_failure {
            return Err(failure.into());
        }

        locate_binary(dest, binary_name)
    }
}

fn locate_binary(dest: &Path, binary_name: &str) -> Result<PathBuf> {
    let direct = dest.join(binary_name);
    if direct.symlink_metadata().is_ok() {
        let regular = is_regular_file(&direct)
            .with_context(|| format!("failed to inspect {}", direct.display()))?;
        if regular {
            return Ok(direct);
        }
        return Err(ExtractionError::NotRegularFile { path: direct }.into());
    }

    let nested = find_file_named(dest, binary_name)
        .with_context(|| format!("failed to search {}", dest.display()))?;
    match nested {
        Some(path) => {
            tracing::debug!(path = %path.display(), "binary found in nested directory");
            Ok(path)
        }
        None => Err(ExtractionError::BinaryNotFound {
            binary: binary_name.to_string(),
        }
        .into()),
    }
}
